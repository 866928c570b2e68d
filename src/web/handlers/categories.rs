use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;

use crate::catalog::CategoryListing;
use crate::errors::AppResult;
use crate::web::{responses::handle_result, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    #[serde(default)]
    pub validated: bool,
}

/// `GET /api/categories`: category and country tags in use
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoriesQuery>,
) -> Response {
    handle_result(categories(&state, params.validated))
}

fn categories(state: &AppState, validated: bool) -> AppResult<CategoryListing> {
    let catalog = state.store.current();
    if !validated {
        return Ok(catalog.categories_where(|_| true));
    }
    let validation = state.require_validation()?;
    Ok(catalog.categories_where(|channel| validation.is_channel_verified(&catalog, channel)))
}
