//! Flat JSON snapshot of a catalog
//!
//! Alternatives are stored as `[id, [records...]]` pairs. Loading a snapshot
//! yields a catalog indistinguishable from a fresh build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::Catalog;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, ChannelRecord, SourceStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<Channel>,
    pub alternatives: Vec<(usize, Vec<ChannelRecord>)>,
    #[serde(default)]
    pub source_stats: BTreeMap<String, SourceStats>,
}

impl From<&Catalog> for CatalogSnapshot {
    fn from(catalog: &Catalog) -> Self {
        Self {
            timestamp: catalog.built_at(),
            channels: catalog.channels().to_vec(),
            alternatives: catalog
                .alternatives()
                .iter()
                .map(|(id, list)| (*id, list.clone()))
                .collect(),
            source_stats: catalog.source_stats().clone(),
        }
    }
}

impl TryFrom<CatalogSnapshot> for Catalog {
    type Error = AppError;

    fn try_from(snapshot: CatalogSnapshot) -> AppResult<Self> {
        let mut alternatives = BTreeMap::new();
        for (id, list) in snapshot.alternatives {
            if alternatives.insert(id, list).is_some() {
                return Err(AppError::validation(format!(
                    "snapshot lists alternatives for channel {id} twice"
                )));
            }
        }
        Catalog::try_from_parts(
            snapshot.channels,
            alternatives,
            snapshot.source_stats,
            snapshot.timestamp,
        )
    }
}

impl CatalogSnapshot {
    /// Age relative to `now`; timestamps in the future count as fresh
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }

    pub async fn load(path: &Path) -> AppResult<Self> {
        let contents = tokio::fs::read(path).await?;
        let snapshot: CatalogSnapshot = serde_json::from_slice(&contents)?;
        debug!(
            "Read snapshot {} ({} channels)",
            path.display(),
            snapshot.channels.len()
        );
        Ok(snapshot)
    }

    /// Write the snapshot through a temporary file so a crash never leaves a
    /// truncated snapshot behind
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec(self)?;
        let temp_path = temp_path_for(path);
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, path).await?;

        info!(
            "Saved catalog snapshot to {} ({} channels, {} bytes)",
            path.display(),
            self.channels.len(),
            contents.len()
        );
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "catalog".into());
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

/// Load a catalog from `path`, rejecting snapshots older than `max_age`
pub async fn load_catalog(path: &Path, max_age: Option<Duration>) -> AppResult<Catalog> {
    let snapshot = CatalogSnapshot::load(path).await?;
    if let Some(max_age) = max_age {
        let age = snapshot.age(Utc::now());
        if age > max_age {
            return Err(AppError::validation(format!(
                "snapshot is {} old (max {})",
                humantime::format_duration(Duration::from_secs(age.as_secs())),
                humantime::format_duration(max_age)
            )));
        }
    }
    Catalog::try_from(snapshot)
}
