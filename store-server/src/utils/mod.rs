//! Utility Module

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{AppError, AppResponse, ok};

/// Result type for API handlers
pub type AppResult<T> = Result<T, AppError>;
