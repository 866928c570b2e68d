//! Source aggregation
//!
//! Fetches and parses every enabled source under a bounded concurrency window.
//! Sources succeed or fail independently; the merged record list always
//! follows configuration order regardless of completion order.

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

use crate::models::{ChannelRecord, SourceConfig, SourceStats};
use crate::sources::{m3u, SourceFetcher};

/// Output of one aggregation run
#[derive(Debug, Clone, Default)]
pub struct AggregationResult {
    /// Records of all successful sources, concatenated in configuration order
    pub records: Vec<ChannelRecord>,
    /// One entry per source attempted in this run
    pub source_stats: BTreeMap<String, SourceStats>,
}

impl AggregationResult {
    pub fn successful_sources(&self) -> usize {
        self.source_stats.values().filter(|s| s.is_success()).count()
    }

    pub fn failed_sources(&self) -> usize {
        self.source_stats.len() - self.successful_sources()
    }
}

#[derive(Clone)]
pub struct Aggregator {
    fetcher: SourceFetcher,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(fetcher: SourceFetcher, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn aggregate(&self, sources: &[SourceConfig]) -> AggregationResult {
        let started = Instant::now();
        info!(
            "Aggregating {} sources ({} in flight)",
            sources.len(),
            self.concurrency
        );

        // Owned futures keep the returned future `Send` for spawned callers.
        let pending: Vec<_> = sources
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, source)| {
                let fetcher = self.fetcher.clone();
                async move { (index, process_source(&fetcher, source).await) }
            })
            .collect();

        // Completion order frees slots as soon as any source finishes.
        let mut outcomes: Vec<(usize, SourceOutcome)> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut result = AggregationResult::default();
        for (_, outcome) in outcomes {
            result.records.extend(outcome.records);
            result.source_stats.insert(outcome.source_name, outcome.stats);
        }

        info!(
            "Aggregation finished in {:?}: {} records from {}/{} sources",
            started.elapsed(),
            result.records.len(),
            result.successful_sources(),
            result.source_stats.len()
        );
        result
    }
}

struct SourceOutcome {
    source_name: String,
    records: Vec<ChannelRecord>,
    stats: SourceStats,
}

async fn process_source(fetcher: &SourceFetcher, source: SourceConfig) -> SourceOutcome {
    let (records, stats) = match fetcher.fetch(&source).await {
        Ok(fetched) => {
            let records = m3u::parse_source(&fetched.body, &source);
            info!("Source '{}': {} channels", source.name, records.len());
            let stats = SourceStats::success(records.len(), fetched.attempts);
            (records, stats)
        }
        Err(failure) => {
            warn!("Source '{}' failed: {}", source.name, failure);
            let stats = SourceStats::failed(failure.error.to_string(), failure.attempts);
            (Vec::new(), stats)
        }
    };
    SourceOutcome {
        source_name: source.name,
        records,
        stats,
    }
}
