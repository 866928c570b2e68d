use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse content kind of a playlist source
///
/// Selects the default category for entries without a `group-title` and the
/// content-type allow-list used when probing streams.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Iptv,
    #[serde(alias = "web", alias = "web_tv")]
    WebTv,
    Radio,
    Pluto,
    Tubi,
    Samsung,
    Plex,
    Other,
}

impl SourceType {
    /// Category assigned to entries that do not declare one
    pub fn default_category(&self) -> &'static str {
        match self {
            SourceType::Iptv => "TV",
            SourceType::Radio => "Radio",
            SourceType::WebTv => "Web TV",
            _ => "Live TV",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, SourceType::Radio)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Iptv => "iptv",
            SourceType::WebTv => "webtv",
            SourceType::Radio => "radio",
            SourceType::Pluto => "pluto",
            SourceType::Tubi => "tubi",
            SourceType::Samsung => "samsung",
            SourceType::Plex => "plex",
            SourceType::Other => "other",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured remote origin publishing one playlist document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default, alias = "type")]
    pub source_type: SourceType,
    /// Lower is preferred; absent sorts after every explicit priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            source_type,
            priority: None,
            enabled: true,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// One parsed playlist entry
///
/// Records are never mutated after parsing; the catalog copies them into
/// primary and alternative roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub category: String,
    pub source_name: String,
    pub source_type: SourceType,
    pub stream_url: String,
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_priority: Option<u32>,
}

impl ChannelRecord {
    /// Sort key for primary selection; missing priority is the least preferred
    pub fn priority_rank(&self) -> u32 {
        self.source_priority.unwrap_or(u32::MAX)
    }
}

/// The primary record of a dedup cluster with its catalog-assigned id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: usize,
    #[serde(flatten)]
    pub record: ChannelRecord,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Failed,
    #[default]
    Pending,
}

/// Outcome of the latest fetch of one source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub status: SourceStatus,
    pub record_count: usize,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl SourceStats {
    pub fn success(record_count: usize, attempts: u32) -> Self {
        Self {
            status: SourceStatus::Success,
            record_count,
            attempts,
            error: None,
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn failed<S: Into<String>>(error: S, attempts: u32) -> Self {
        Self {
            status: SourceStatus::Failed,
            record_count: 0,
            attempts,
            error: Some(error.into()),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Stats of a source that has not been fetched yet
    pub fn pending() -> Self {
        Self {
            status: SourceStatus::Pending,
            record_count: 0,
            attempts: 0,
            error: None,
            fetched_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SourceStatus::Success
    }
}

/// An alternative stream of a channel as exposed over HTTP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeRecord {
    #[serde(flatten)]
    pub record: ChannelRecord,
    /// Position in the channel's ordered alternatives list
    pub alternative_index: usize,
}

/// Body of `GET /api/channel/{id}/alternatives`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlternativesResponse {
    pub channel_id: usize,
    pub alternatives: Vec<AlternativeRecord>,
}

impl AlternativesResponse {
    pub fn new(channel_id: usize, records: &[ChannelRecord]) -> Self {
        Self {
            channel_id,
            alternatives: records
                .iter()
                .enumerate()
                .map(|(alternative_index, record)| AlternativeRecord {
                    record: record.clone(),
                    alternative_index,
                })
                .collect(),
        }
    }

    pub fn into_records(self) -> Vec<ChannelRecord> {
        let mut alternatives = self.alternatives;
        alternatives.sort_by_key(|a| a.alternative_index);
        alternatives.into_iter().map(|a| a.record).collect()
    }
}

/// Classification of one token of a channel's category field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Category,
    Country,
}
