//! Channel deduplication
//!
//! Records whose names normalize to the same key form one cluster. Within a
//! cluster the record with the lowest source priority becomes the primary
//! (first-seen wins ties) and the rest become its alternatives in the same
//! order. Nothing is dropped or merged; every input record ends up either as a
//! primary or as an alternative.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::models::{Channel, ChannelRecord};

#[derive(Debug, Clone, Copy)]
pub struct DedupOptions {
    /// Put every record whose key normalizes to "" into a single cluster.
    /// When false each such record becomes a channel of its own.
    pub merge_unnamed: bool,
    /// Keep non-ASCII alphanumerics in cluster keys
    pub unicode_names: bool,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            merge_unnamed: true,
            unicode_names: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutput {
    pub channels: Vec<Channel>,
    /// Non-empty alternative lists keyed by primary channel id
    pub alternatives: BTreeMap<usize, Vec<ChannelRecord>>,
}

/// Normalize a channel name into its cluster key
///
/// Lower-cases, strips everything that is neither an ASCII word character
/// (`[a-z0-9_]`) nor whitespace, collapses whitespace runs and trims. Names in
/// non-Latin scripts therefore normalize to an empty key.
pub fn normalize_name(name: &str) -> String {
    normalize_with(name, |c| c.is_ascii_alphanumeric())
}

/// Like [`normalize_name`] but keeps letters and digits of any script
pub fn normalize_name_unicode(name: &str) -> String {
    normalize_with(name, char::is_alphanumeric)
}

fn normalize_with(name: &str, is_word: impl Fn(char) -> bool) -> String {
    let lowered = name.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|&c| is_word(c) || c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn dedupe(records: Vec<ChannelRecord>, options: DedupOptions) -> DedupOutput {
    let total = records.len();
    let mut cluster_index: HashMap<String, usize> = HashMap::new();
    let mut clusters: Vec<Vec<ChannelRecord>> = Vec::new();

    for record in records {
        let key = if options.unicode_names {
            normalize_name_unicode(&record.name)
        } else {
            normalize_name(&record.name)
        };
        let unnamed = key.is_empty();

        let slot = if unnamed && !options.merge_unnamed {
            None
        } else {
            cluster_index.get(&key).copied()
        };

        match slot {
            Some(index) => clusters[index].push(record),
            None => {
                if !unnamed || options.merge_unnamed {
                    cluster_index.insert(key, clusters.len());
                }
                clusters.push(vec![record]);
            }
        }
    }

    let mut output = DedupOutput::default();
    for (id, mut members) in clusters.into_iter().enumerate() {
        // Stable: equal priorities keep discovery order.
        members.sort_by_key(ChannelRecord::priority_rank);
        let mut members = members.into_iter();
        let Some(primary) = members.next() else {
            continue;
        };
        output.channels.push(Channel {
            id,
            record: primary,
        });
        let alternatives: Vec<ChannelRecord> = members.collect();
        if !alternatives.is_empty() {
            output.alternatives.insert(id, alternatives);
        }
    }

    debug!(
        "Deduplicated {} records into {} channels ({} with alternatives)",
        total,
        output.channels.len(),
        output.alternatives.len()
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use rstest::rstest;

    fn record(name: &str, source: &str, priority: Option<u32>, seq: usize) -> ChannelRecord {
        ChannelRecord {
            name: name.to_string(),
            logo_url: None,
            category: "News".to_string(),
            source_name: source.to_string(),
            source_type: SourceType::Iptv,
            stream_url: format!("http://{source}.example.com/{seq}.m3u8"),
            record_id: format!("{source}_{seq}"),
            source_priority: priority,
        }
    }

    #[rstest]
    #[case("BBC News HD", "bbc news hd")]
    #[case("bbc   news hd!!", "bbc news hd")]
    #[case("  BBC NEWS (UK) ", "bbc news uk")]
    #[case("Canal+ Sport", "canal sport")]
    #[case("Télé-Québec", "tlqubec")]
    #[case("中央电视台", "")]
    #[case("MTV_Hits 2", "mtv_hits 2")]
    #[case("!!!", "")]
    #[case("   ", "")]
    fn test_normalize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    #[rstest]
    #[case("Télé-Québec", "téléquébec")]
    #[case("中央电视台 HD", "中央电视台 hd")]
    #[case("bbc   news hd!!", "bbc news hd")]
    fn test_normalize_name_unicode(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name_unicode(input), expected);
    }

    #[test]
    fn test_non_latin_names_cluster_by_option() {
        let records = vec![
            record("中央电视台", "a", None, 1),
            record("台湾电视", "b", None, 1),
        ];

        // Both keys are empty under ASCII normalization.
        let ascii = dedupe(records.clone(), DedupOptions::default());
        assert_eq!(ascii.channels.len(), 1);
        assert_eq!(ascii.alternatives[&0].len(), 1);

        let unicode = dedupe(
            records,
            DedupOptions {
                unicode_names: true,
                ..Default::default()
            },
        );
        assert_eq!(unicode.channels.len(), 2);
        assert!(unicode.alternatives.is_empty());
    }

    #[test]
    fn test_clusters_equivalent_names() {
        let output = dedupe(
            vec![
                record("BBC News HD", "a", None, 1),
                record("CNN", "a", None, 2),
                record("bbc   news hd!!", "b", None, 1),
            ],
            DedupOptions::default(),
        );

        assert_eq!(output.channels.len(), 2);
        assert_eq!(output.channels[0].id, 0);
        assert_eq!(output.channels[0].record.record_id, "a_1");
        assert_eq!(output.channels[1].id, 1);
        assert_eq!(output.channels[1].record.name, "CNN");

        let alternatives = &output.alternatives[&0];
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].record_id, "b_1");
        assert!(!output.alternatives.contains_key(&1));
    }

    #[test]
    fn test_priority_selects_primary_regardless_of_order() {
        let low = record("Sky News", "low", Some(2), 1);
        let high = record("SKY NEWS", "high", Some(1), 1);

        for input in [vec![low.clone(), high.clone()], vec![high.clone(), low.clone()]] {
            let output = dedupe(input, DedupOptions::default());
            assert_eq!(output.channels.len(), 1);
            assert_eq!(output.channels[0].record.source_name, "high");
            assert_eq!(output.alternatives[&0][0].source_name, "low");
        }
    }

    #[test]
    fn test_missing_priority_sorts_last_and_ties_keep_order() {
        let output = dedupe(
            vec![
                record("France 24", "none", None, 1),
                record("france 24", "p5-first", Some(5), 1),
                record("FRANCE 24", "p5-second", Some(5), 1),
            ],
            DedupOptions::default(),
        );
        assert_eq!(output.channels[0].record.source_name, "p5-first");
        let order: Vec<_> = output.alternatives[&0]
            .iter()
            .map(|r| r.source_name.as_str())
            .collect();
        assert_eq!(order, vec!["p5-second", "none"]);
    }

    #[test]
    fn test_unnamed_records_merge_by_default() {
        let records = vec![
            record("***", "a", None, 1),
            record("", "a", None, 2),
            record("Real", "a", None, 3),
        ];

        let merged = dedupe(records.clone(), DedupOptions::default());
        assert_eq!(merged.channels.len(), 2);
        assert_eq!(merged.alternatives[&0].len(), 1);

        let separate = dedupe(
            records,
            DedupOptions {
                merge_unnamed: false,
                ..Default::default()
            },
        );
        assert_eq!(separate.channels.len(), 3);
        assert!(separate.alternatives.is_empty());
    }

    #[test]
    fn test_no_record_is_lost() {
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("Channel {}", i % 7), "s", Some((i % 3) as u32), i))
            .collect();
        let output = dedupe(records, DedupOptions::default());
        let alternatives: usize = output.alternatives.values().map(Vec::len).sum();
        assert_eq!(output.channels.len() + alternatives, 50);
        assert_eq!(output.channels.len(), 7);
    }
}
