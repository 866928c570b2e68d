//! Fixtures shared by the integration tests: in-memory transports and a
//! three-source configuration where one source is unreachable.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use m3u_aggregator::catalog::CatalogStore;
use m3u_aggregator::config::{CatalogConfig, FetchConfig, ValidationConfig};
use m3u_aggregator::errors::TransportError;
use m3u_aggregator::ingestor::Aggregator;
use m3u_aggregator::models::{SourceConfig, SourceType};
use m3u_aggregator::services::{CatalogService, StreamValidator, ValidationService};
use m3u_aggregator::sources::{
    PlaylistTransport, ProbeResponse, ProbeTransport, RequestOptions, SourceFetcher,
};
use m3u_aggregator::utils::retry::RetryConfig;

pub const ALPHA_PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-logo="http://logos.example.com/bbc.png" group-title="News;UK",BBC News HD
http://alpha.example.com/bbc-news
#EXTINF:-1 group-title="News",Euronews
http://alpha.example.com/euronews
"#;

pub const BETA_PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 group-title="News",bbc   news hd!!
http://beta.example.com/bbc
#EXTINF:-1 group-title="Music",Jazz FM
http://beta.example.com/jazz
"#;

/// Serves fixed playlist bodies by URL; unknown URLs refuse the connection
pub struct MapTransport {
    bodies: HashMap<String, String>,
}

impl MapTransport {
    pub fn new() -> Self {
        let mut bodies = HashMap::new();
        bodies.insert(
            "http://alpha.example.com/list.m3u".to_string(),
            ALPHA_PLAYLIST.to_string(),
        );
        bodies.insert(
            "http://beta.example.com/list.m3u".to_string(),
            BETA_PLAYLIST.to_string(),
        );
        Self { bodies }
    }
}

#[async_trait]
impl PlaylistTransport for MapTransport {
    async fn get_text(
        &self,
        url: &str,
        _options: &RequestOptions,
    ) -> Result<String, TransportError> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Connect {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

/// Streams on the beta host are live, everything else answers 404
pub struct BetaOnlyProbe;

impl BetaOnlyProbe {
    fn answer(url: &str) -> ProbeResponse {
        if url.starts_with("http://beta.example.com/") {
            ProbeResponse {
                status: 200,
                content_type: Some("video/mp2t".to_string()),
                content_length: None,
            }
        } else {
            ProbeResponse {
                status: 404,
                content_type: Some("text/html".to_string()),
                content_length: Some(9),
            }
        }
    }
}

#[async_trait]
impl ProbeTransport for BetaOnlyProbe {
    async fn head(&self, url: &str, _timeout: Duration) -> Result<ProbeResponse, TransportError> {
        Ok(Self::answer(url))
    }

    async fn get_range(
        &self,
        url: &str,
        _bytes: u64,
        _timeout: Duration,
    ) -> Result<ProbeResponse, TransportError> {
        Ok(Self::answer(url))
    }
}

pub fn sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("alpha", "http://alpha.example.com/list.m3u", SourceType::Iptv)
            .with_priority(1),
        SourceConfig::new("beta", "http://beta.example.com/list.m3u", SourceType::Iptv)
            .with_priority(2),
        SourceConfig::new("down", "http://down.example.com/list.m3u", SourceType::Radio),
    ]
}

pub fn catalog_service() -> Arc<CatalogService> {
    let fetcher = SourceFetcher::new(Arc::new(MapTransport::new()), &FetchConfig::default())
        .with_retry_config(RetryConfig::immediate(1));
    Arc::new(CatalogService::new(
        CatalogStore::default(),
        Aggregator::new(fetcher, 2),
        sources(),
        &CatalogConfig::default(),
    ))
}

pub fn validation_service(store: CatalogStore) -> Arc<ValidationService> {
    let config = ValidationConfig {
        batch_pause: Duration::ZERO,
        ..Default::default()
    };
    let validator = Arc::new(StreamValidator::new(Arc::new(BetaOnlyProbe), &config));
    Arc::new(ValidationService::new(validator, store, &config))
}
