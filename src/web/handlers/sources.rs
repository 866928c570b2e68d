use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::models::{SourceStats, SourceType};
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct SourceEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub priority: Option<u32>,
    pub stats: SourceStats,
}

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<SourceEntry>,
}

/// `GET /api/sources`: latest fetch outcome per configured source
pub async fn list_sources(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.store.current();
    let sources = state
        .catalog_service
        .sources()
        .iter()
        .map(|source| SourceEntry {
            name: source.name.clone(),
            source_type: source.source_type,
            priority: source.priority,
            stats: catalog
                .source_stats()
                .get(&source.name)
                .cloned()
                .unwrap_or_else(SourceStats::pending),
        })
        .collect();
    Json(SourcesResponse { sources })
}
