//! Convenience result type alias for the directory server.

use crate::error::AppError;

/// A specialized `Result` type for directory server operations.
pub type AppResult<T> = Result<T, AppError>;
