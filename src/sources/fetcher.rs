//! Playlist source fetcher with bounded retries

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::transport::{PlaylistTransport, RequestOptions};
use crate::config::FetchConfig;
use crate::errors::SourceError;
use crate::models::SourceConfig;
use crate::utils::retry::{with_retry, RetryConfig};
use crate::utils::url::UrlUtils;

/// Raw playlist text of one source
#[derive(Debug, Clone)]
pub struct FetchedPlaylist {
    pub body: String,
    pub attempts: u32,
}

/// A source that could not be fetched after all attempts
#[derive(Debug, Clone, Error)]
#[error("{error} (after {attempts} attempts)")]
pub struct FetchFailure {
    pub error: SourceError,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct SourceFetcher {
    transport: Arc<dyn PlaylistTransport>,
    retry: RetryConfig,
    options: RequestOptions,
}

impl SourceFetcher {
    pub fn new(transport: Arc<dyn PlaylistTransport>, config: &FetchConfig) -> Self {
        Self {
            transport,
            retry: RetryConfig::from(config),
            options: RequestOptions {
                timeout: config.request_timeout,
            },
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Download the playlist document of `source`
    pub async fn fetch(&self, source: &SourceConfig) -> Result<FetchedPlaylist, FetchFailure> {
        let display_url = UrlUtils::obfuscate_credentials(&source.url);
        debug!("Fetching source '{}' from {}", source.name, display_url);

        let operation_name = format!("fetch source '{}'", source.name);
        let result = with_retry(
            &self.retry,
            || self.transport.get_text(&source.url, &self.options),
            &operation_name,
        )
        .await;

        match result {
            Ok(outcome) => {
                info!(
                    "Fetched source '{}' ({} bytes, {} attempt(s))",
                    source.name,
                    outcome.value.len(),
                    outcome.attempts
                );
                Ok(FetchedPlaylist {
                    body: outcome.value,
                    attempts: outcome.attempts,
                })
            }
            Err(failure) => Err(FetchFailure {
                error: failure.error.into(),
                attempts: failure.attempts,
            }),
        }
    }
}
