//! Error handling for the stream analysis service
//!
//! Re-exports the error types and the shared result alias used
//! throughout the application.

pub mod types;

pub use types::AnalysisError;

/// Convenient result type alias used throughout the application
pub type AppResult<T> = Result<T, AnalysisError>;
