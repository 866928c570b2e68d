//! M3U/M3U8 playlist parser
//!
//! Turns raw playlist text into [`ChannelRecord`]s. Parsing never fails:
//! malformed entries are dropped and the worst case is an empty result.
//!
//! An entry is an `#EXTINF:` metadata line followed by a URL line. The URL is
//! accepted only when it starts with a recognized stream scheme; a metadata
//! line without an accepted URL before the next metadata line (or the end of
//! the input) is discarded.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{ChannelRecord, SourceConfig, SourceType};
use crate::utils::url::UrlUtils;

const EXTINF_MARKER: &str = "#EXTINF:";
const UNKNOWN_CHANNEL: &str = "Unknown Channel";

static LOGO_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)tvg-logo\s*=\s*"([^"]*)""#).expect("logo attribute pattern is valid")
});

static GROUP_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)group-title\s*=\s*"([^"]*)""#).expect("group attribute pattern is valid")
});

/// Metadata collected from an `#EXTINF:` line while waiting for its URL
#[derive(Debug, Clone)]
struct PendingEntry {
    name: String,
    logo_url: Option<String>,
    category: String,
}

/// Parse playlist text produced by one source
///
/// Every call is independent; record ids restart at `{source_name}_1`.
pub fn parse(text: &str, source_name: &str, source_type: SourceType) -> Vec<ChannelRecord> {
    parse_with_priority(text, source_name, source_type, None)
}

/// Parse playlist text for a configured source, carrying its priority on every record
pub fn parse_source(text: &str, source: &SourceConfig) -> Vec<ChannelRecord> {
    parse_with_priority(text, &source.name, source.source_type, source.priority)
}

fn parse_with_priority(
    text: &str,
    source_name: &str,
    source_type: SourceType,
    priority: Option<u32>,
) -> Vec<ChannelRecord> {
    let mut records = Vec::new();
    let mut pending: Option<PendingEntry> = None;
    let mut discarded = 0usize;

    for line in text.split(['\n', '\r']).map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if is_extinf(line) {
            if pending.is_some() {
                discarded += 1;
            }
            pending = Some(parse_extinf(line, source_type));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if !UrlUtils::has_stream_scheme(line) {
            debug!(
                "Ignoring non-stream line in source '{}': {}",
                source_name, line
            );
            continue;
        }

        if let Some(entry) = pending.take() {
            records.push(ChannelRecord {
                name: entry.name,
                logo_url: entry.logo_url,
                category: entry.category,
                source_name: source_name.to_string(),
                source_type,
                stream_url: line.to_string(),
                record_id: format!("{}_{}", source_name, records.len() + 1),
                source_priority: priority,
            });
        }
    }

    if pending.is_some() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(
            "Discarded {} entries without a stream URL from source '{}'",
            discarded, source_name
        );
    }

    records
}

fn is_extinf(line: &str) -> bool {
    line.get(..EXTINF_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(EXTINF_MARKER))
}

fn parse_extinf(line: &str, source_type: SourceType) -> PendingEntry {
    let name = line
        .rfind(',')
        .map(|pos| line[pos + 1..].trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_CHANNEL)
        .to_string();

    let logo_url = capture(&LOGO_ATTRIBUTE, line);
    let category = capture(&GROUP_ATTRIBUTE, line)
        .unwrap_or_else(|| source_type.default_category().to_string());

    PendingEntry {
        name,
        logo_url,
        category,
    }
}

fn capture(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_single_entry() {
        let records = parse(
            "#EXTM3U\n#EXTINF:-1,Test Channel\nhttp://example.com/stream.m3u8\n",
            "test",
            SourceType::Iptv,
        );
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "Test Channel");
        assert_eq!(record.stream_url, "http://example.com/stream.m3u8");
        assert_eq!(record.record_id, "test_1");
        assert_eq!(record.category, "TV");
        assert_eq!(record.source_name, "test");
        assert_eq!(record.logo_url, None);
    }

    #[test]
    fn test_attributes_and_crlf() {
        let text = "#EXTM3U\r\n\
            #EXTINF:-1 tvg-id=\"bbc.uk\" tvg-logo=\"http://img/bbc.png\" group-title=\"News;United Kingdom\",BBC News HD\r\n\
            https://example.com/bbc.m3u8\r\n\
            #EXTINF:-1 group-title=\"\",Radio One\r\n\
            http://example.com/r1.aac\r\n";
        let records = parse(text, "mixed", SourceType::Radio);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "BBC News HD");
        assert_eq!(records[0].logo_url.as_deref(), Some("http://img/bbc.png"));
        assert_eq!(records[0].category, "News;United Kingdom");
        assert_eq!(records[1].category, "Radio");
        assert_eq!(records[1].record_id, "mixed_2");
    }

    #[test]
    fn test_incomplete_entries_are_dropped() {
        let text = "#EXTINF:-1,No Url\n\
            #EXTINF:-1,Bad Scheme\n\
            ftp://example.com/file.ts\n\
            http://example.com/orphan.m3u8\n\
            #EXTINF:-1,Trailing\n";
        let records = parse(text, "src", SourceType::Iptv);

        // The orphan URL belongs to the still-pending "Bad Scheme" entry.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Bad Scheme");
        assert_eq!(records[0].stream_url, "http://example.com/orphan.m3u8");
    }

    #[test]
    fn test_url_without_metadata_is_ignored() {
        let records = parse(
            "#EXTM3U\nhttp://example.com/a.m3u8\n#EXTINF:-1,A\nhttp://example.com/b.m3u8\nhttp://example.com/c.m3u8\n",
            "src",
            SourceType::Iptv,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream_url, "http://example.com/b.m3u8");
    }

    #[rstest]
    #[case("#EXTINF:-1,", "Unknown Channel")]
    #[case("#EXTINF:-1", "Unknown Channel")]
    #[case("#EXTINF:-1 group-title=\"Kids, Family\",Cartoon Net", "Cartoon Net")]
    #[case("#extinf:-1,  Spaced Name  ", "Spaced Name")]
    fn test_names(#[case] extinf: &str, #[case] expected: &str) {
        let text = format!("{extinf}\nrtmp://example.com/live\n");
        let records = parse(&text, "src", SourceType::WebTv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, expected);
    }

    #[test]
    fn test_default_category_by_source_type() {
        let text = "#EXTINF:-1,Channel\nhttp://example.com/s\n";
        assert_eq!(parse(text, "s", SourceType::WebTv)[0].category, "Web TV");
        assert_eq!(parse(text, "s", SourceType::Pluto)[0].category, "Live TV");
    }

    #[test]
    fn test_parse_is_repeatable() {
        let text = "#EXTINF:-1,A\nhttp://example.com/a\n#EXTINF:-1,B\nhttp://example.com/b\n";
        let first = parse(text, "src", SourceType::Iptv);
        let second = parse(text, "src", SourceType::Iptv);
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_ascii_host_is_kept() {
        let records = parse(
            "#EXTM3U\n#EXTINF:-1,Kanal\nhttp://ü.example/x\n",
            "src",
            SourceType::Iptv,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream_url, "http://ü.example/x");
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(parse("", "src", SourceType::Iptv).is_empty());
        assert!(parse("<html>not a playlist</html>", "src", SourceType::Iptv).is_empty());
    }

    #[test]
    fn test_parse_source_carries_priority() {
        let source = SourceConfig::new("prio", "http://example.com/p.m3u", SourceType::Iptv)
            .with_priority(2);
        let records = parse_source("#EXTINF:-1,A\nhttp://example.com/a\n", &source);
        assert_eq!(records[0].source_priority, Some(2));
        assert_eq!(records[0].record_id, "prio_1");
    }
}
