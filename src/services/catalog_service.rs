//! Catalog lifecycle: bootstrap, rebuild and persistence
//!
//! The service owns the only path that replaces the catalog. A rebuild runs
//! the full aggregation and dedup pipeline off to the side and swaps the
//! result in only when at least one source succeeded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::RunGuard;
use crate::catalog::snapshot::{load_catalog, CatalogSnapshot};
use crate::catalog::{Catalog, CatalogStore, DedupOptions};
use crate::config::CatalogConfig;
use crate::errors::{AppError, AppResult};
use crate::ingestor::Aggregator;
use crate::models::SourceConfig;

/// Where the current catalog came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogOrigin {
    Snapshot,
    Aggregation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub channels: usize,
    pub channels_with_alternatives: usize,
    pub successful_sources: usize,
    pub failed_sources: usize,
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    #[serde(with = "crate::config::duration_serde::duration")]
    pub duration: Duration,
}

pub struct CatalogService {
    store: CatalogStore,
    aggregator: Aggregator,
    sources: Vec<SourceConfig>,
    snapshot_path: Option<PathBuf>,
    snapshot_max_age: Option<Duration>,
    dedup: DedupOptions,
    rebuilding: Arc<AtomicBool>,
}

impl CatalogService {
    /// `sources` should already be limited to enabled sources, in configuration order
    pub fn new(
        store: CatalogStore,
        aggregator: Aggregator,
        sources: Vec<SourceConfig>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            store,
            aggregator,
            sources,
            snapshot_path: config.snapshot_path.clone(),
            snapshot_max_age: config.snapshot_max_age,
            dedup: DedupOptions {
                merge_unnamed: config.merge_unnamed,
                unicode_names: config.unicode_names,
            },
            rebuilding: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Build the first catalog of the process
    ///
    /// Uses the snapshot when one is configured, readable, valid and fresh
    /// enough; otherwise runs the pipeline. Fails with
    /// [`AppError::CatalogUnavailable`] when neither yields a catalog.
    pub async fn bootstrap(&self) -> AppResult<CatalogOrigin> {
        if let Some(path) = &self.snapshot_path {
            match load_catalog(path, self.snapshot_max_age).await {
                Ok(catalog) => {
                    info!(
                        "Loaded catalog snapshot {} ({} channels, built {})",
                        path.display(),
                        catalog.len(),
                        catalog.built_at()
                    );
                    self.store.replace(catalog);
                    return Ok(CatalogOrigin::Snapshot);
                }
                Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("No catalog snapshot at {}, building from sources", path.display());
                }
                Err(e) => {
                    warn!(
                        "Ignoring catalog snapshot {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        self.rebuild().await.map_err(|e| {
            error!("Unable to build an initial catalog: {}", e);
            e
        })?;
        Ok(CatalogOrigin::Aggregation)
    }

    /// Run the pipeline and swap in the result
    ///
    /// The previous catalog stays in place when no source succeeded.
    pub async fn rebuild(&self) -> AppResult<RebuildSummary> {
        let _guard = RunGuard::acquire(&self.rebuilding)
            .ok_or_else(|| AppError::operation_in_progress("rebuild", "catalog"))?;

        let started = Instant::now();
        let result = self.aggregator.aggregate(&self.sources).await;
        let successful_sources = result.successful_sources();
        let failed_sources = result.failed_sources();

        if successful_sources == 0 {
            return Err(AppError::catalog_unavailable(format!(
                "none of the {} configured sources could be fetched",
                self.sources.len()
            )));
        }

        let catalog = Catalog::from_aggregation(result, self.dedup);
        let summary_channels = catalog.len();
        let channels_with_alternatives = catalog.alternatives().len();
        let built_at = catalog.built_at();

        if let Some(path) = &self.snapshot_path {
            if let Err(e) = CatalogSnapshot::from(&catalog).save(path).await {
                warn!("Failed to persist catalog snapshot {}: {}", path.display(), e);
            }
        }

        let generation = self.store.replace(catalog);
        let summary = RebuildSummary {
            channels: summary_channels,
            channels_with_alternatives,
            successful_sources,
            failed_sources,
            generation,
            built_at,
            duration: started.elapsed(),
        };
        info!(
            "Catalog rebuilt: {} channels, {} with alternatives, {}/{} sources ok in {:?}",
            summary.channels,
            summary.channels_with_alternatives,
            successful_sources,
            successful_sources + failed_sources,
            summary.duration
        );
        Ok(summary)
    }

    /// Convenience for callers that only hold an `Arc`
    pub fn current(&self) -> Arc<Catalog> {
        self.store.current()
    }
}
