use chrono::{DateTime, Utc};
use chrono_tz::{America::Chicago, Tz};
use std::fmt;
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

/// Zone every log timestamp is rendered in
pub const LOG_TIMEZONE: Tz = Chicago;

/// ISO-8601 with a numeric offset, e.g. `2024-03-01T09:15:02-06:00`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub fn now() -> DateTime<Tz> {
    Utc::now().with_timezone(&LOG_TIMEZONE)
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&LOG_TIMEZONE)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Current time, formatted for log lines and error reports
pub fn timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Timer for `tracing_subscriber::fmt` layers
#[derive(Debug, Clone, Copy, Default)]
pub struct ChicagoTime;

impl FormatTime for ChicagoTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", timestamp())
    }
}
