use axum::{extract::State, response::Response};

use crate::web::{responses::handle_result, AppState};

/// `POST /api/catalog/refresh`: rebuild from sources; 409 while one is running
pub async fn refresh_catalog(State(state): State<AppState>) -> Response {
    handle_result(state.catalog_service.rebuild().await)
}
