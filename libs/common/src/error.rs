//! Custom error types for the common library
//!
//! This module defines the store-facing error type shared by every
//! collection backend.

use thiserror::Error;

/// Custom error type for document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document matched the given id or filter
    #[error("document not found")]
    NotFound,

    /// A unique field constraint was violated
    #[error("duplicate value for unique field `{0}`")]
    Conflict(String),

    /// The backend failed to execute the operation
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
