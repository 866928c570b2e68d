/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 5000;

// Fetch defaults
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: &str = "1s";
pub const DEFAULT_MAX_BACKOFF: &str = "10s";
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_JITTER_PERCENT: u8 = 25;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; m3u-aggregator/0.1; +https://github.com/jmylchreest/m3u-aggregator)";

// Validation defaults
pub const DEFAULT_VALIDATION_ENABLED: bool = true;
pub const DEFAULT_VALIDATION_START_ON_BOOT: bool = false;
pub const DEFAULT_PROBE_TIMEOUT: &str = "6s";
pub const DEFAULT_VALIDATION_CACHE_TTL: &str = "30m";
pub const DEFAULT_VALIDATION_CACHE_CAPACITY: usize = 20_000;
pub const DEFAULT_VALIDATION_BATCH_SIZE: usize = 10;
pub const DEFAULT_VALIDATION_BATCH_PAUSE: &str = "500ms";
pub const DEFAULT_VALIDATION_MAX_CHANNELS: usize = 800;

// Catalog defaults
pub const DEFAULT_MERGE_UNNAMED: bool = true;
pub const DEFAULT_UNICODE_NAMES: bool = false;

// Player defaults
pub const DEFAULT_AUTO_SWITCH: bool = true;
pub const DEFAULT_LOAD_TIMEOUT: &str = "10s";
pub const DEFAULT_ALTERNATIVE_DELAY: &str = "1500ms";
pub const DEFAULT_CHANNEL_DELAY: &str = "2s";
