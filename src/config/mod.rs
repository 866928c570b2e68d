use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::SourceConfig;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{duration, option_duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of client assets served for non-API routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_fetch_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff", with = "duration")]
    pub initial_backoff: Duration,
    #[serde(default = "default_max_backoff", with = "duration")]
    pub max_backoff: Duration,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_jitter_percent")]
    pub jitter_percent: u8,
    /// Number of sources fetched at once
    #[serde(default = "default_fetch_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_validation_enabled")]
    pub enabled: bool,
    #[serde(default = "default_validation_start_on_boot")]
    pub start_on_boot: bool,
    #[serde(default = "default_probe_timeout", with = "duration")]
    pub probe_timeout: Duration,
    #[serde(default = "default_validation_cache_ttl", with = "duration")]
    pub cache_ttl: Duration,
    #[serde(default = "default_validation_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_validation_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_validation_batch_pause", with = "duration")]
    pub batch_pause: Duration,
    /// Channels beyond this many in catalog order are left unvalidated
    #[serde(default = "default_validation_max_channels")]
    pub max_channels: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
    /// Snapshots older than this are ignored at startup
    #[serde(
        default,
        with = "option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub snapshot_max_age: Option<Duration>,
    /// Cluster every record whose name normalizes to an empty key together
    #[serde(default = "default_merge_unnamed")]
    pub merge_unnamed: bool,
    /// Keep non-ASCII letters and digits when normalizing names; by default
    /// only ASCII word characters survive, so "Télé-Québec" keys as "tlqubec"
    #[serde(default = "default_unicode_names")]
    pub unicode_names: bool,
    /// Cron expression for periodic rebuilds, e.g. "0 0 */6 * * *"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_schedule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_auto_switch")]
    pub auto_switch: bool,
    #[serde(default = "default_load_timeout", with = "duration")]
    pub load_timeout: Duration,
    #[serde(default = "default_alternative_delay", with = "duration")]
    pub alternative_delay: Duration,
    #[serde(default = "default_channel_delay", with = "duration")]
    pub channel_delay: Duration,
}

fn parse_default_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    DEFAULT_MAX_PAGE_SIZE
}
fn default_connect_timeout() -> Duration {
    parse_default_duration(DEFAULT_CONNECT_TIMEOUT)
}
fn default_request_timeout() -> Duration {
    parse_default_duration(DEFAULT_REQUEST_TIMEOUT)
}
fn default_fetch_max_attempts() -> u32 {
    DEFAULT_FETCH_MAX_ATTEMPTS
}
fn default_initial_backoff() -> Duration {
    parse_default_duration(DEFAULT_INITIAL_BACKOFF)
}
fn default_max_backoff() -> Duration {
    parse_default_duration(DEFAULT_MAX_BACKOFF)
}
fn default_backoff_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}
fn default_jitter_percent() -> u8 {
    DEFAULT_JITTER_PERCENT
}
fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_validation_enabled() -> bool {
    DEFAULT_VALIDATION_ENABLED
}
fn default_validation_start_on_boot() -> bool {
    DEFAULT_VALIDATION_START_ON_BOOT
}
fn default_probe_timeout() -> Duration {
    parse_default_duration(DEFAULT_PROBE_TIMEOUT)
}
fn default_validation_cache_ttl() -> Duration {
    parse_default_duration(DEFAULT_VALIDATION_CACHE_TTL)
}
fn default_validation_cache_capacity() -> usize {
    DEFAULT_VALIDATION_CACHE_CAPACITY
}
fn default_validation_batch_size() -> usize {
    DEFAULT_VALIDATION_BATCH_SIZE
}
fn default_validation_batch_pause() -> Duration {
    parse_default_duration(DEFAULT_VALIDATION_BATCH_PAUSE)
}
fn default_validation_max_channels() -> usize {
    DEFAULT_VALIDATION_MAX_CHANNELS
}
fn default_merge_unnamed() -> bool {
    DEFAULT_MERGE_UNNAMED
}
fn default_unicode_names() -> bool {
    DEFAULT_UNICODE_NAMES
}
fn default_auto_switch() -> bool {
    DEFAULT_AUTO_SWITCH
}
fn default_load_timeout() -> Duration {
    parse_default_duration(DEFAULT_LOAD_TIMEOUT)
}
fn default_alternative_delay() -> Duration {
    parse_default_duration(DEFAULT_ALTERNATIVE_DELAY)
}
fn default_channel_delay() -> Duration {
    parse_default_duration(DEFAULT_CHANNEL_DELAY)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_attempts: default_fetch_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_percent: default_jitter_percent(),
            concurrency: default_fetch_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: default_validation_enabled(),
            start_on_boot: default_validation_start_on_boot(),
            probe_timeout: default_probe_timeout(),
            cache_ttl: default_validation_cache_ttl(),
            cache_capacity: default_validation_cache_capacity(),
            batch_size: default_validation_batch_size(),
            batch_pause: default_validation_batch_pause(),
            max_channels: default_validation_max_channels(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            snapshot_max_age: None,
            merge_unnamed: default_merge_unnamed(),
            unicode_names: default_unicode_names(),
            refresh_schedule: None,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_switch: default_auto_switch(),
            load_timeout: default_load_timeout(),
            alternative_delay: default_alternative_delay(),
            channel_delay: default_channel_delay(),
        }
    }
}

impl Config {
    /// Load the configuration, writing a default file when none exists yet
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let path = config_file.as_ref();
        let config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents).map_err(|e| {
                AppError::configuration(format!("Failed to parse {}: {e}", path.display()))
            })?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config).map_err(|e| {
                AppError::configuration(format!("Failed to render default config: {e}"))
            })?;
            std::fs::write(path, contents)?;
            info!("Created default config file: {}", path.display());
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    /// Sources that take part in aggregation, in configuration order
    pub fn enabled_sources(&self) -> Vec<SourceConfig> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }

    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            let name = source.name.trim();
            if name.is_empty() {
                return Err(AppError::configuration(format!(
                    "Source with url '{}' has an empty name",
                    source.url
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(AppError::configuration(format!(
                    "Duplicate source name '{name}'"
                )));
            }
            match url::Url::parse(&source.url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => {
                    return Err(AppError::configuration(format!(
                        "Source '{name}' url must be an absolute http(s) URL"
                    )));
                }
            }
        }

        if self.fetch.concurrency == 0 {
            return Err(AppError::configuration("fetch.concurrency must be at least 1"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(AppError::configuration("fetch.max_attempts must be at least 1"));
        }
        if self.validation.batch_size == 0 {
            return Err(AppError::configuration(
                "validation.batch_size must be at least 1",
            ));
        }
        if self.validation.cache_capacity == 0 {
            return Err(AppError::configuration(
                "validation.cache_capacity must be at least 1",
            ));
        }
        if self.web.page_size == 0 || self.web.page_size > self.web.max_page_size {
            return Err(AppError::configuration(
                "web.page_size must be between 1 and web.max_page_size",
            ));
        }
        if let Some(schedule) = &self.catalog.refresh_schedule {
            crate::ingestor::scheduler::parse_schedule(schedule)?;
        }

        Ok(())
    }
}
