//! HTTP response types and error mapping
//!
//! Successful handlers return their payload as plain JSON. Errors are
//! rendered through [`handle_error`] into the [`ApiResponse`] envelope with a
//! status code chosen from the [`AppError`] variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, warn};

use crate::errors::{AppError, AppResult};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_with_details(message: String, details: HashMap<String, String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: Some(details),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Render a handler result: the payload as JSON, or the error envelope
pub fn handle_result<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(error) => handle_error(error),
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message, details) = match &error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone(), None),
        AppError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            format!("{} with id '{}' not found", resource, id),
            None,
        ),
        AppError::OperationInProgress {
            operation_type,
            resource,
        } => {
            let mut details = HashMap::new();
            details.insert("operation".to_string(), operation_type.clone());
            details.insert("resource".to_string(), resource.clone());
            (
                StatusCode::CONFLICT,
                format!("A {} is already running", operation_type),
                Some(details),
            )
        }
        AppError::CatalogUnavailable { message } => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Catalog unavailable: {}", message),
            None,
        ),
        AppError::ExternalService { service, message } => (
            StatusCode::BAD_GATEWAY,
            format!("External service error ({}): {}", service, message),
            None,
        ),
        AppError::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "External service communication failed".to_string(),
            None,
        ),
        AppError::Source(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Source operation failed: {}", e),
            None,
        ),
        AppError::Configuration { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Configuration error: {}", message),
            None,
        ),
        AppError::Io(_) | AppError::Json(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage operation failed".to_string(),
            None,
        ),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", message),
            None,
        ),
    };

    if status.is_server_error() {
        error!("Request failed: {}", error);
    } else {
        warn!("Request rejected: {}", error);
    }

    let response = match details {
        Some(details) => ApiResponse::<()>::error_with_details(message, details),
        None => ApiResponse::<()>::error(message),
    };
    (status, Json(response)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}
