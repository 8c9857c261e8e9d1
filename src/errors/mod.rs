//! Error shapes, the fall-through normalizer, and setup errors

pub mod fall_through;
pub mod handler;
pub mod response;
pub mod setup;

pub use fall_through::{ErrorBody, FallThroughError};
pub use handler::{DefaultFallThrough, FallThroughHandler};
pub use response::{normalize, normalize_and_respond, ErrorDetailRecord, NormalizedErrorResponse};
pub use setup::LoggerError;
