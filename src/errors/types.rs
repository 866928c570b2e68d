//! Error type definitions for the M3U Aggregator
//!
//! This module defines the error types used throughout the application,
//! providing a small hierarchy that keeps per-source failures separate from
//! process-level failures.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// External service errors
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// Operation already in progress errors
    #[error("Operation already in progress: {operation_type} on {resource}")]
    OperationInProgress {
        operation_type: String,
        resource: String,
    },

    /// No catalog could be built from sources or loaded from a snapshot
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    /// Filesystem errors (snapshot and config I/O)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failure to fetch one playlist source after all retry attempts
///
/// A source error never carries partial playlist content; the source simply
/// contributes zero records to the aggregation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Connect or read timeout
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Connection-level failure (DNS, TLS, refused, reset)
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// HTTP errors from external sources
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The response body could not be read or decoded
    #[error("Body error: {message}")]
    Body { message: String },

    /// Invalid source configuration
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },
}

/// Failure of a single HTTP exchange at the transport seam
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("invalid request for {url}: {message}")]
    Request { url: String, message: String },
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an external service error
    pub fn external_service<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an operation in progress error
    pub fn operation_in_progress<O: Into<String>, R: Into<String>>(
        operation_type: O,
        resource: R,
    ) -> Self {
        Self::OperationInProgress {
            operation_type: operation_type.into(),
            resource: resource.into(),
        }
    }

    /// Create a catalog unavailable error
    pub fn catalog_unavailable<S: Into<String>>(message: S) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create an invalid config error
    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl TransportError {
    /// Whether repeating the same request has a reasonable chance of succeeding
    ///
    /// Client errors other than 408 and 429 are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            TransportError::Request { .. } => false,
            TransportError::Timeout { .. }
            | TransportError::Connect { .. }
            | TransportError::Body { .. } => true,
        }
    }
}

impl From<TransportError> for SourceError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout { url } => SourceError::Timeout { url },
            TransportError::Connect { message, .. } => SourceError::Connection { message },
            TransportError::Status { url, status } => SourceError::Http {
                status,
                message: format!("request to {url} was rejected"),
            },
            TransportError::Body { message, .. } => SourceError::Body { message },
            TransportError::Request { message, .. } => SourceError::InvalidConfig {
                field: "url".to_string(),
                message,
            },
        }
    }
}
