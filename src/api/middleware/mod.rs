pub mod error_logging;
pub mod request_logging;

pub use error_logging::{error_logging_middleware, install_panic_hook, panic_to_response, ErrorLogging, ErrorSink};
pub use request_logging::{request_logging_middleware, RequestId, RequestLogging, REQUEST_ID_HEADER};
