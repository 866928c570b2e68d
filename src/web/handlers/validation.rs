//! Background stream validation endpoints

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::services::{StartOutcome, ValidationStatus};
use crate::web::{responses::handle_result, AppState};

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: StartOutcome,
}

/// `GET /api/validation-status`
pub async fn validation_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = match &state.validation {
        Some(validation) => validation.status(),
        None => ValidationStatus {
            validation_in_progress: false,
            validated_count: 0,
            checked_sources: 0,
            total_channels: state.store.current().len(),
            source_breakdown: BTreeMap::new(),
            last_run: None,
        },
    };
    Json(status)
}

/// `POST /api/validation/start`; idempotent
pub async fn start_validation(State(state): State<AppState>) -> Response {
    handle_result(state.require_validation().map(|validation| {
        let status = validation.start();
        info!("Validation start requested: {:?}", status);
        StartResponse { status }
    }))
}
