//! Common library for the Souq backend
//!
//! This crate provides the shared infrastructure used across the Souq
//! services: the document-store abstraction (traits plus the bundled
//! in-memory engine), the query feature pipeline that turns raw HTTP
//! query parameters into a fetch plan, and the store error type.

pub mod error;
pub mod query;
pub mod store;
