use thiserror::Error;

/// Failures while building the logger, its transports, or its reporter
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Invalid reporting endpoint '{dsn}': {reason}")]
    InvalidDsn { dsn: String, reason: String },

    #[error("Invalid log level '{level}': {source}")]
    InvalidLogLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to install global log subscriber: {0}")]
    SubscriberInit(#[from] tracing::dispatcher::SetGlobalDefaultError),

    #[error("Failed to build reporting client: {0}")]
    ReporterClient(#[from] reqwest::Error),
}
