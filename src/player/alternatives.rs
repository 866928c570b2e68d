//! Sources of a channel's alternative streams for the fallback controller

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::catalog::CatalogStore;
use crate::errors::{AppError, AppResult};
use crate::models::{AlternativesResponse, ChannelRecord};

#[async_trait]
pub trait AlternativesProvider: Send + Sync {
    /// Ordered alternatives of `channel_id`, fetched fresh on every call
    async fn alternatives(&self, channel_id: usize) -> AppResult<Vec<ChannelRecord>>;
}

/// In-process provider reading the current catalog
#[derive(Clone)]
pub struct CatalogAlternatives {
    store: CatalogStore,
}

impl CatalogAlternatives {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AlternativesProvider for CatalogAlternatives {
    async fn alternatives(&self, channel_id: usize) -> AppResult<Vec<ChannelRecord>> {
        let catalog = self.store.current();
        if catalog.channel(channel_id).is_none() {
            return Err(AppError::not_found("channel", channel_id.to_string()));
        }
        Ok(catalog.alternatives_for(channel_id).to_vec())
    }
}

/// Provider calling `GET /api/channel/{id}/alternatives` on a running server
#[derive(Clone)]
pub struct HttpAlternativesClient {
    client: Client,
    base_url: Url,
}

impl HttpAlternativesClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::configuration(format!("Invalid base url '{base_url}': {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, channel_id: usize) -> AppResult<Url> {
        self.base_url
            .join(&format!("/api/channel/{channel_id}/alternatives"))
            .map_err(|e| AppError::internal(format!("Failed to build alternatives url: {e}")))
    }
}

#[async_trait]
impl AlternativesProvider for HttpAlternativesClient {
    async fn alternatives(&self, channel_id: usize) -> AppResult<Vec<ChannelRecord>> {
        let response = self.client.get(self.endpoint(channel_id)?).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found("channel", channel_id.to_string()));
        }
        if !status.is_success() {
            return Err(AppError::external_service(
                "alternatives",
                format!("HTTP {status}"),
            ));
        }
        let body: AlternativesResponse = response.json().await?;
        Ok(body.into_records())
    }
}
