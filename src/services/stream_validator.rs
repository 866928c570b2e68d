//! Best-effort stream validation
//!
//! [`StreamValidator`] probes a single URL: a metadata-only request first,
//! then a small ranged GET when the server rejects or does not support it.
//! Any failure is a negative result. Verdicts are cached per URL with a TTL.
//!
//! [`ValidationService`] walks the catalog in batches in the background and
//! records which channels have at least one live stream.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use lru::LruCache;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::RunGuard;
use crate::catalog::{Catalog, CatalogStore};
use crate::config::ValidationConfig;
use crate::errors::{AppError, AppResult, TransportError};
use crate::models::{Channel, SourceType};
use crate::sources::{ProbeResponse, ProbeTransport};
use crate::utils::url::UrlUtils;

/// Bytes requested by the ranged fallback probe
pub const RANGE_PROBE_BYTES: u64 = 1024;

/// Declared sizes below this are not a plausible media stream or playlist
pub const MIN_PLAUSIBLE_LENGTH: u64 = 16;

const AUDIO_CONTENT_TYPES: &[&str] = &[
    "audio/",
    "application/ogg",
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/x-scpls",
    "application/pls+xml",
    "application/octet-stream",
];

const VIDEO_CONTENT_TYPES: &[&str] = &[
    "video/",
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
    "application/dash+xml",
    "application/octet-stream",
    "binary/octet-stream",
];

/// Whether a probe response indicates a playable stream for `source_type`
pub fn is_positive(response: &ProbeResponse, source_type: SourceType) -> bool {
    if !response.is_success() {
        return false;
    }

    let allowed = if source_type.is_audio() {
        AUDIO_CONTENT_TYPES
    } else {
        VIDEO_CONTENT_TYPES
    };
    let type_matches = response.content_type.as_deref().is_some_and(|content_type| {
        allowed.iter().any(|prefix| content_type.starts_with(prefix))
    });
    let size_plausible = response
        .content_length
        .is_none_or(|length| length >= MIN_PLAUSIBLE_LENGTH);

    type_matches || size_plausible
}

#[derive(Debug, Clone, Copy)]
struct CachedVerdict {
    live: bool,
    checked_at: Instant,
}

pub struct StreamValidator {
    transport: Arc<dyn ProbeTransport>,
    timeout: Duration,
    ttl: Duration,
    cache: Mutex<LruCache<String, CachedVerdict>>,
}

impl StreamValidator {
    pub fn new(transport: Arc<dyn ProbeTransport>, config: &ValidationConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            transport,
            timeout: config.probe_timeout,
            ttl: config.cache_ttl,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Probe `url` without consulting the cache
    pub async fn validate(&self, url: &str, source_type: SourceType, timeout: Duration) -> bool {
        if !UrlUtils::is_http(url) {
            trace!("Skipping probe of non-HTTP stream {}", UrlUtils::obfuscate_credentials(url));
            return false;
        }

        match self.transport.head(url, timeout).await {
            Ok(response) if is_positive(&response, source_type) => return true,
            Ok(response) => {
                trace!(
                    "HEAD {} answered {}, trying ranged GET",
                    UrlUtils::obfuscate_credentials(url),
                    response.status
                );
            }
            // A timeout already used the whole budget for this stream.
            Err(TransportError::Timeout { .. }) => return false,
            Err(e) => trace!("HEAD failed, trying ranged GET: {}", e),
        }

        match self.transport.get_range(url, RANGE_PROBE_BYTES, timeout).await {
            Ok(response) => is_positive(&response, source_type),
            Err(e) => {
                trace!("Ranged GET failed: {}", e);
                false
            }
        }
    }

    /// Probe `url` unless a fresh verdict is cached
    pub async fn check(&self, url: &str, source_type: SourceType) -> bool {
        if let Some(live) = self.cached(url) {
            return live;
        }
        let live = self.validate(url, source_type, self.timeout).await;
        self.lock_cache().put(
            url.to_string(),
            CachedVerdict {
                live,
                checked_at: Instant::now(),
            },
        );
        live
    }

    /// Fresh cached verdict for `url`, without probing
    pub fn cached(&self, url: &str) -> Option<bool> {
        let mut cache = self.lock_cache();
        match cache.get(url) {
            Some(verdict) if verdict.checked_at.elapsed() < self.ttl => Some(verdict.live),
            Some(_) => {
                cache.pop(url);
                None
            }
            None => None,
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, CachedVerdict>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reply to a request to start a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    AlreadyRunning,
    AlreadyValidated,
    Started,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatus {
    pub validation_in_progress: bool,
    /// Channels with at least one live stream
    pub validated_count: usize,
    /// Channels probed so far in the latest run
    pub checked_sources: usize,
    pub total_channels: usize,
    /// Verified channels per source of the first live stream
    pub source_breakdown: BTreeMap<String, usize>,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RunState {
    generation: Option<u64>,
    completed: bool,
    checked: usize,
    verified: HashMap<usize, String>,
    last_run: Option<DateTime<Utc>>,
}

pub struct ValidationService {
    validator: Arc<StreamValidator>,
    store: CatalogStore,
    batch_size: usize,
    batch_pause: Duration,
    max_channels: usize,
    running: Arc<AtomicBool>,
    state: Mutex<RunState>,
}

impl ValidationService {
    pub fn new(
        validator: Arc<StreamValidator>,
        store: CatalogStore,
        config: &ValidationConfig,
    ) -> Self {
        Self {
            validator,
            store,
            batch_size: config.batch_size.max(1),
            batch_pause: config.batch_pause,
            max_channels: config.max_channels,
            running: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(RunState::default()),
        }
    }

    pub fn validator(&self) -> &Arc<StreamValidator> {
        &self.validator
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a background run over the current catalog
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        if self.is_completed_for(self.store.generation()) {
            return StartOutcome::AlreadyValidated;
        }
        let Some(guard) = RunGuard::acquire(&self.running) else {
            return StartOutcome::AlreadyRunning;
        };

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run_guarded(guard).await;
        });
        StartOutcome::Started
    }

    /// Run validation to completion on the calling task
    pub async fn run(&self) -> AppResult<ValidationStatus> {
        let guard = RunGuard::acquire(&self.running)
            .ok_or_else(|| AppError::operation_in_progress("validation", "catalog"))?;
        self.run_guarded(guard).await;
        Ok(self.status())
    }

    async fn run_guarded(&self, _guard: RunGuard) {
        let (catalog, generation) = self.store.current_with_generation();
        let started = Instant::now();
        let limit = catalog.len().min(self.max_channels);

        {
            let mut state = self.lock_state();
            *state = RunState {
                generation: Some(generation),
                last_run: Some(Utc::now()),
                ..Default::default()
            };
        }
        info!(
            "Validating {} of {} channels in batches of {}",
            limit,
            catalog.len(),
            self.batch_size
        );

        let batches: Vec<&[Channel]> = catalog.channels()[..limit].chunks(self.batch_size).collect();
        let batch_count = batches.len();
        for (index, batch) in batches.into_iter().enumerate() {
            let verdicts = join_all(
                batch
                    .iter()
                    .map(|channel| self.validate_channel(&catalog, channel)),
            )
            .await;

            {
                let mut state = self.lock_state();
                state.checked += batch.len();
                for (channel, winner) in batch.iter().zip(verdicts) {
                    if let Some(source_name) = winner {
                        state.verified.insert(channel.id, source_name);
                    }
                }
            }
            debug!("Validated batch {}/{}", index + 1, batch_count);

            if index + 1 < batch_count && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        let verified = {
            let mut state = self.lock_state();
            state.completed = true;
            state.verified.len()
        };
        info!(
            "Validation finished in {:?}: {}/{} channels verified",
            started.elapsed(),
            verified,
            limit
        );
    }

    /// Probe the primary, then alternatives in order, stopping at the first live one
    async fn validate_channel(&self, catalog: &Catalog, channel: &Channel) -> Option<String> {
        let candidates =
            std::iter::once(&channel.record).chain(catalog.alternatives_for(channel.id));
        for record in candidates {
            if self.validator.check(&record.stream_url, record.source_type).await {
                return Some(record.source_name.clone());
            }
        }
        None
    }

    /// Whether any stream of the channel has a fresh positive cached verdict
    pub fn is_channel_verified(&self, catalog: &Catalog, channel: &Channel) -> bool {
        std::iter::once(&channel.record)
            .chain(catalog.alternatives_for(channel.id))
            .any(|record| self.validator.cached(&record.stream_url) == Some(true))
    }

    pub fn status(&self) -> ValidationStatus {
        let catalog = self.store.current();
        let generation = self.store.generation();
        let state = self.lock_state();
        let current = state.generation == Some(generation);

        let mut source_breakdown = BTreeMap::new();
        if current {
            for source_name in state.verified.values() {
                *source_breakdown.entry(source_name.clone()).or_insert(0) += 1;
            }
        }

        ValidationStatus {
            validation_in_progress: self.is_running(),
            validated_count: if current { state.verified.len() } else { 0 },
            checked_sources: if current { state.checked } else { 0 },
            total_channels: catalog.len(),
            source_breakdown,
            last_run: state.last_run,
        }
    }

    fn is_completed_for(&self, generation: u64) -> bool {
        let state = self.lock_state();
        state.completed && state.generation == Some(generation)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{dedupe, DedupOptions};
    use crate::models::ChannelRecord;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;

    /// Answers by URL suffix: `/live` 200 video, `/nohead` 405 on HEAD but 206
    /// on range, `/slow` sleeps, anything else 404
    #[derive(Default)]
    struct ScriptedProbe {
        head_calls: AtomicUsize,
        range_calls: AtomicUsize,
    }

    fn response(status: u16, content_type: &str) -> ProbeResponse {
        ProbeResponse {
            status,
            content_type: Some(content_type.to_string()),
            content_length: None,
        }
    }

    #[async_trait]
    impl ProbeTransport for ScriptedProbe {
        async fn head(&self, url: &str, _timeout: Duration) -> Result<ProbeResponse, TransportError> {
            self.head_calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("/live") {
                Ok(response(200, "video/mp2t"))
            } else if url.ends_with("/nohead") {
                Ok(response(405, "text/html"))
            } else if url.ends_with("/slow") {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok(response(200, "video/mp2t"))
            } else {
                Ok(response(404, "text/html"))
            }
        }

        async fn get_range(
            &self,
            url: &str,
            _bytes: u64,
            _timeout: Duration,
        ) -> Result<ProbeResponse, TransportError> {
            self.range_calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("/nohead") {
                Ok(response(206, "application/vnd.apple.mpegurl"))
            } else {
                Err(TransportError::Connect {
                    url: url.to_string(),
                    message: "refused".to_string(),
                })
            }
        }
    }

    fn config() -> ValidationConfig {
        ValidationConfig {
            batch_size: 2,
            batch_pause: Duration::ZERO,
            ..Default::default()
        }
    }

    fn record(name: &str, source: &str, path: &str) -> ChannelRecord {
        ChannelRecord {
            name: name.to_string(),
            logo_url: None,
            category: "News".to_string(),
            source_name: source.to_string(),
            source_type: SourceType::Iptv,
            stream_url: format!("http://{source}.example.com/{name}{path}"),
            record_id: format!("{source}_{name}"),
            source_priority: None,
        }
    }

    fn service(records: Vec<ChannelRecord>, config: ValidationConfig) -> (Arc<ValidationService>, Arc<ScriptedProbe>) {
        let probe = Arc::new(ScriptedProbe::default());
        let validator = Arc::new(StreamValidator::new(probe.clone(), &config));
        let output = dedupe(records, DedupOptions::default());
        let store = CatalogStore::new(Catalog::from_parts(
            output.channels,
            output.alternatives,
            BTreeMap::new(),
        ));
        (
            Arc::new(ValidationService::new(validator, store, &config)),
            probe,
        )
    }

    #[rstest]
    #[case(response(200, "video/mp2t"), SourceType::Iptv, true)]
    #[case(response(206, "application/x-mpegurl"), SourceType::WebTv, true)]
    #[case(response(200, "audio/mpeg"), SourceType::Radio, true)]
    #[case(response(404, "video/mp2t"), SourceType::Iptv, false)]
    #[case(ProbeResponse { status: 200, content_type: Some("text/html".into()), content_length: Some(0) }, SourceType::Iptv, false)]
    #[case(ProbeResponse { status: 200, content_type: Some("text/html".into()), content_length: None }, SourceType::Iptv, true)]
    #[case(ProbeResponse { status: 200, content_type: Some("video/mp4".into()), content_length: Some(3) }, SourceType::Radio, false)]
    fn test_is_positive(
        #[case] probe: ProbeResponse,
        #[case] source_type: SourceType,
        #[case] expected: bool,
    ) {
        assert_eq!(is_positive(&probe, source_type), expected);
    }

    #[tokio::test]
    async fn test_validate_falls_back_to_range_request() {
        let probe = Arc::new(ScriptedProbe::default());
        let validator = StreamValidator::new(probe.clone(), &config());

        assert!(validator.validate("http://a.example.com/x/nohead", SourceType::Iptv, Duration::from_secs(1)).await);
        assert_eq!(probe.head_calls.load(Ordering::SeqCst), 1);
        assert_eq!(probe.range_calls.load(Ordering::SeqCst), 1);

        assert!(!validator.validate("http://a.example.com/x/dead", SourceType::Iptv, Duration::from_secs(1)).await);
        assert!(!validator.validate("rtmp://a.example.com/live", SourceType::Iptv, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_check_caches_verdicts() {
        let probe = Arc::new(ScriptedProbe::default());
        let validator = StreamValidator::new(probe.clone(), &config());

        assert_eq!(validator.cached("http://a.example.com/x/live"), None);
        assert!(validator.check("http://a.example.com/x/live", SourceType::Iptv).await);
        assert!(validator.check("http://a.example.com/x/live", SourceType::Iptv).await);
        assert_eq!(probe.head_calls.load(Ordering::SeqCst), 1);
        assert_eq!(validator.cached("http://a.example.com/x/live"), Some(true));
    }

    #[tokio::test]
    async fn test_expired_verdicts_are_dropped() {
        let probe = Arc::new(ScriptedProbe::default());
        let config = ValidationConfig {
            cache_ttl: Duration::ZERO,
            ..config()
        };
        let validator = StreamValidator::new(probe.clone(), &config);

        validator.check("http://a.example.com/x/live", SourceType::Iptv).await;
        assert_eq!(validator.cached("http://a.example.com/x/live"), None);
    }

    #[tokio::test]
    async fn test_run_verifies_via_alternatives_and_respects_cap() {
        let (service, _) = service(
            vec![
                record("one", "a", "/dead"),
                record("one", "b", "/live"),
                record("two", "a", "/live"),
                record("three", "a", "/dead"),
                record("four", "a", "/live"),
            ],
            ValidationConfig {
                max_channels: 3,
                ..config()
            },
        );

        let status = service.run().await.unwrap();
        assert!(!status.validation_in_progress);
        assert_eq!(status.total_channels, 4);
        assert_eq!(status.checked_sources, 3);
        assert_eq!(status.validated_count, 2);
        assert_eq!(status.source_breakdown.get("a"), Some(&1));
        assert_eq!(status.source_breakdown.get("b"), Some(&1));
        assert!(status.last_run.is_some());

        let catalog = service.store.current();
        let verified: Vec<_> = catalog
            .channels()
            .iter()
            .filter(|c| service.is_channel_verified(&catalog, c))
            .map(|c| c.record.name.as_str())
            .collect();
        // "four" is beyond the cap and stays unvalidated rather than failed.
        assert_eq!(verified, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_start_is_single_flight() {
        let (service, _) = service(
            vec![record("slow", "a", "/slow"), record("other", "a", "/slow")],
            config(),
        );

        assert_eq!(service.start(), StartOutcome::Started);
        assert_eq!(service.start(), StartOutcome::AlreadyRunning);
        assert!(matches!(
            service.run().await,
            Err(AppError::OperationInProgress { .. })
        ));

        while service.is_running() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(service.start(), StartOutcome::AlreadyValidated);
        assert_eq!(service.status().validated_count, 2);
    }
}
