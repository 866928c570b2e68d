//! Centralized error handling for the M3U Aggregator
//!
//! This module unifies error types across the application layers. Failures
//! that are part of normal operation (a playlist source that cannot be
//! fetched, a malformed playlist entry, an inconclusive stream probe) are
//! recorded or swallowed where they occur; only the errors in this module
//! travel across layer boundaries.
//!
//! # Error Categories
//!
//! - **Source Errors**: fetching one remote playlist failed after retries
//! - **Transport Errors**: a single HTTP exchange failed
//! - **Validation Errors**: invalid input at the API or config boundary
//! - **Catalog Errors**: no catalog could be built or loaded at all

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

