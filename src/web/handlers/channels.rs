//! Channel listing and alternatives

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;

use crate::catalog::{ChannelQuery, Page, QueryResult};
use crate::errors::{AppError, AppResult};
use crate::models::AlternativesResponse;
use crate::web::{responses::handle_result, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ChannelsQuery {
    pub category: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
    /// Only channels with a live stream according to the validation cache
    #[serde(default)]
    pub validated: bool,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl ChannelsQuery {
    fn filter(&self) -> ChannelQuery {
        ChannelQuery {
            category: self.category.clone(),
            country: self.country.clone(),
            search: self.search.clone(),
        }
    }

    fn page(&self, default_limit: usize, max_limit: usize) -> AppResult<Page> {
        let limit = match self.limit {
            Some(0) => return Err(AppError::validation("limit must be at least 1")),
            Some(limit) => limit.min(max_limit),
            None => default_limit,
        };
        Ok(Page {
            offset: self.offset,
            limit,
        })
    }
}

/// `GET /api/channels`
pub async fn list_channels(
    State(state): State<AppState>,
    Query(params): Query<ChannelsQuery>,
) -> Response {
    handle_result(query_channels(&state, &params))
}

fn query_channels(state: &AppState, params: &ChannelsQuery) -> AppResult<QueryResult> {
    let page = params.page(state.config.web.page_size, state.config.web.max_page_size)?;
    let catalog = state.store.current();
    let filter = params.filter();

    if !params.validated {
        return Ok(catalog.query(&filter, page));
    }
    let validation = state.require_validation()?;
    Ok(catalog.query_where(&filter, page, |channel| {
        validation.is_channel_verified(&catalog, channel)
    }))
}

/// `GET /api/channel/{id}/alternatives`
pub async fn get_alternatives(
    State(state): State<AppState>,
    Path(channel_id): Path<usize>,
) -> Response {
    let catalog = state.store.current();
    let result = match catalog.channel(channel_id) {
        Some(_) => Ok(AlternativesResponse::new(
            channel_id,
            catalog.alternatives_for(channel_id),
        )),
        None => Err(AppError::not_found("channel", channel_id.to_string())),
    };
    handle_result(result)
}
