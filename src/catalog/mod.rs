//! The deduplicated channel catalog
//!
//! A [`Catalog`] is an immutable value built wholesale, either from an
//! aggregation run or from a persisted snapshot. [`CatalogStore`] holds the
//! current one and swaps in replacements, so readers always see a complete
//! catalog.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;

pub mod countries;
pub mod dedup;
pub mod query;
pub mod snapshot;

pub use dedup::{dedupe, normalize_name, normalize_name_unicode, DedupOptions, DedupOutput};
pub use query::{CategoryListing, ChannelQuery, ChannelSummary, ChannelTags, Page, QueryResult};
pub use snapshot::CatalogSnapshot;

use crate::errors::{AppError, AppResult};
use crate::ingestor::AggregationResult;
use crate::models::{Channel, ChannelRecord, SourceStats};

#[derive(Debug, Clone)]
pub struct Catalog {
    channels: Vec<Channel>,
    alternatives: BTreeMap<usize, Vec<ChannelRecord>>,
    source_stats: BTreeMap<String, SourceStats>,
    built_at: DateTime<Utc>,
    tags: Vec<ChannelTags>,
    positions: HashMap<usize, usize>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), BTreeMap::new(), BTreeMap::new())
    }

    /// Deduplicate the records of an aggregation run into a new catalog
    pub fn from_aggregation(result: AggregationResult, options: DedupOptions) -> Self {
        let output = dedupe(result.records, options);
        Self::from_parts(output.channels, output.alternatives, result.source_stats)
    }

    /// Assemble a catalog from parts that already satisfy its invariants
    pub fn from_parts(
        channels: Vec<Channel>,
        alternatives: BTreeMap<usize, Vec<ChannelRecord>>,
        source_stats: BTreeMap<String, SourceStats>,
    ) -> Self {
        Self::assemble(channels, alternatives, source_stats, Utc::now())
    }

    /// Assemble a catalog from untrusted parts, checking that channel ids are
    /// unique and that every alternatives entry belongs to a known channel
    pub fn try_from_parts(
        channels: Vec<Channel>,
        alternatives: BTreeMap<usize, Vec<ChannelRecord>>,
        source_stats: BTreeMap<String, SourceStats>,
        built_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let mut ids = HashSet::with_capacity(channels.len());
        for channel in &channels {
            if !ids.insert(channel.id) {
                return Err(AppError::validation(format!(
                    "duplicate channel id {}",
                    channel.id
                )));
            }
        }
        if let Some(orphan) = alternatives.keys().find(|id| !ids.contains(id)) {
            return Err(AppError::validation(format!(
                "alternatives reference unknown channel id {orphan}"
            )));
        }

        Ok(Self::assemble(channels, alternatives, source_stats, built_at))
    }

    fn assemble(
        channels: Vec<Channel>,
        mut alternatives: BTreeMap<usize, Vec<ChannelRecord>>,
        source_stats: BTreeMap<String, SourceStats>,
        built_at: DateTime<Utc>,
    ) -> Self {
        alternatives.retain(|_, list| !list.is_empty());
        let tags = channels
            .iter()
            .map(|c| ChannelTags::classify(&c.record.category))
            .collect();
        let positions = channels
            .iter()
            .enumerate()
            .map(|(position, c)| (c.id, position))
            .collect();

        Self {
            channels,
            alternatives,
            source_stats,
            built_at,
            tags,
            positions,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, id: usize) -> Option<&Channel> {
        self.positions.get(&id).map(|&position| &self.channels[position])
    }

    /// Catalog-order position of a channel id
    pub fn position(&self, id: usize) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Ordered alternatives of a channel; empty for unknown ids and singletons
    pub fn alternatives_for(&self, id: usize) -> &[ChannelRecord] {
        self.alternatives.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn alternatives_count(&self, id: usize) -> usize {
        self.alternatives_for(id).len()
    }

    pub fn alternatives(&self) -> &BTreeMap<usize, Vec<ChannelRecord>> {
        &self.alternatives
    }

    pub fn source_stats(&self) -> &BTreeMap<String, SourceStats> {
        &self.source_stats
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Per-channel tag classification, parallel to [`Catalog::channels`]
    pub fn tags(&self) -> &[ChannelTags] {
        &self.tags
    }

    /// Whether at least one source contributed to this catalog
    pub fn has_successful_source(&self) -> bool {
        self.source_stats.values().any(SourceStats::is_success)
    }
}

/// Shared holder of the current catalog
///
/// `replace` swaps the whole catalog and bumps a generation counter that
/// consumers use to tell catalogs apart.
#[derive(Clone)]
pub struct CatalogStore {
    current: Arc<RwLock<Arc<Catalog>>>,
    generation: Arc<AtomicU64>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(Catalog::empty())
    }
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn current(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Current catalog together with its generation, read under one lock
    pub fn current_with_generation(&self) -> (Arc<Catalog>, u64) {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        (Arc::clone(&guard), self.generation.load(Ordering::SeqCst))
    }

    /// Swap in a new catalog and return its generation
    pub fn replace(&self, catalog: Catalog) -> u64 {
        let channels = catalog.len();
        // The generation moves with the catalog while the write lock is held.
        let generation = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            *guard = Arc::new(catalog);
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!(
            "Catalog replaced: {} channels (generation {})",
            channels, generation
        );
        generation
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    fn record(name: &str, seq: usize) -> ChannelRecord {
        ChannelRecord {
            name: name.to_string(),
            logo_url: None,
            category: "General".to_string(),
            source_name: "src".to_string(),
            source_type: SourceType::Iptv,
            stream_url: format!("http://example.com/{seq}"),
            record_id: format!("src_{seq}"),
            source_priority: None,
        }
    }

    #[test]
    fn test_from_aggregation() {
        let mut source_stats = BTreeMap::new();
        source_stats.insert("src".to_string(), SourceStats::success(3, 1));
        let catalog = Catalog::from_aggregation(
            AggregationResult {
                records: vec![record("One", 1), record("Two", 2), record("one", 3)],
                source_stats,
            },
            DedupOptions::default(),
        );

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.alternatives_count(0), 1);
        assert_eq!(catalog.alternatives_count(1), 0);
        assert!(catalog.alternatives_for(99).is_empty());
        assert!(catalog.has_successful_source());
        assert_eq!(catalog.channel(1).map(|c| c.record.name.as_str()), Some("Two"));
    }

    #[test]
    fn test_try_from_parts_rejects_broken_invariants() {
        let channel = |id| Channel {
            id,
            record: record("X", id),
        };

        let duplicate = Catalog::try_from_parts(
            vec![channel(1), channel(1)],
            BTreeMap::new(),
            BTreeMap::new(),
            Utc::now(),
        );
        assert!(duplicate.is_err());

        let mut alternatives = BTreeMap::new();
        alternatives.insert(5, vec![record("X", 9)]);
        let orphan =
            Catalog::try_from_parts(vec![channel(1)], alternatives, BTreeMap::new(), Utc::now());
        assert!(orphan.is_err());
    }

    #[test]
    fn test_store_swaps_wholesale() {
        let store = CatalogStore::default();
        let before = store.current();
        assert!(before.is_empty());
        assert_eq!(store.generation(), 0);

        let generation = store.replace(Catalog::from_parts(
            vec![Channel {
                id: 0,
                record: record("One", 1),
            }],
            BTreeMap::new(),
            BTreeMap::new(),
        ));

        assert_eq!(generation, 1);
        assert_eq!(store.current().len(), 1);
        // Readers holding the old snapshot keep seeing it unchanged.
        assert!(before.is_empty());
    }

    #[test]
    fn test_generation_matches_catalog_under_concurrent_replace() {
        // Catalog N has N channels, so a reader can tell whether the pair is torn.
        let catalog_of = |size: usize| {
            Catalog::from_parts(
                (0..size)
                    .map(|id| Channel {
                        id,
                        record: record("C", id),
                    })
                    .collect(),
                BTreeMap::new(),
                BTreeMap::new(),
            )
        };
        let store = CatalogStore::default();
        let writer_store = store.clone();
        let writer = std::thread::spawn(move || {
            for size in 1..=200 {
                writer_store.replace(catalog_of(size));
            }
        });

        for _ in 0..2000 {
            let (catalog, generation) = store.current_with_generation();
            assert_eq!(catalog.len() as u64, generation);
        }
        writer.join().unwrap();
        assert_eq!(store.current_with_generation().1, 200);
    }
}
