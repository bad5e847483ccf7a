//! Result type alias for Dropsy operations

use crate::Error;

/// Result type alias for Dropsy operations
pub type Result<T> = std::result::Result<T, Error>;
