//! Catalog queries: category/country tagging, filtering and paging

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::countries::is_country;
use super::Catalog;
use crate::models::{Channel, TagKind};

/// Delimiter between tags inside a channel's category field
pub const TAG_DELIMITER: char = ';';

/// A channel's category field split into topical categories and countries
///
/// Tokens are trimmed and deduplicated case-insensitively, keeping the first
/// spelling seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelTags {
    pub categories: Vec<String>,
    pub countries: Vec<String>,
}

impl ChannelTags {
    pub fn classify(category: &str) -> Self {
        let mut tags = ChannelTags::default();
        for token in category.split(TAG_DELIMITER).map(str::trim) {
            if token.is_empty() {
                continue;
            }
            let bucket = if is_country(token) {
                &mut tags.countries
            } else {
                &mut tags.categories
            };
            let lowered = token.to_lowercase();
            if !bucket.iter().any(|existing| existing.to_lowercase() == lowered) {
                bucket.push(token.to_string());
            }
        }
        tags
    }

    pub fn matches(&self, kind: TagKind, value: &str) -> bool {
        let bucket = match kind {
            TagKind::Category => &self.categories,
            TagKind::Country => &self.countries,
        };
        let wanted = value.trim().to_lowercase();
        bucket.iter().any(|tag| tag.to_lowercase() == wanted)
    }
}

/// Channel filters; all present filters must match
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelQuery {
    pub category: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
}

impl ChannelQuery {
    pub fn category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn country<S: Into<String>>(mut self, country: S) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = Some(search.into());
        self
    }

    fn category_filter(&self) -> Option<&str> {
        active_filter(self.category.as_deref())
    }

    fn country_filter(&self) -> Option<&str> {
        active_filter(self.country.as_deref())
    }

    fn search_filter(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Empty values and "all" mean no filter
fn active_filter(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    #[serde(flatten)]
    pub channel: Channel,
    pub alternatives_count: usize,
}

/// One page of matches; `total` counts every match, not just this page
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub channels: Vec<ChannelSummary>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryListing {
    pub categories: Vec<String>,
    pub countries: Vec<String>,
}

impl Catalog {
    pub fn query(&self, filter: &ChannelQuery, page: Page) -> QueryResult {
        self.query_where(filter, page, |_| true)
    }

    /// Query restricted to channels accepted by `include`
    pub fn query_where<F>(&self, filter: &ChannelQuery, page: Page, include: F) -> QueryResult
    where
        F: Fn(&Channel) -> bool,
    {
        let category = filter.category_filter();
        let country = filter.country_filter();
        let search = filter.search_filter();

        let mut total = 0;
        let mut channels = Vec::new();

        for (channel, tags) in self.channels().iter().zip(self.tags()) {
            if let Some(category) = category {
                if !tags.matches(TagKind::Category, category) {
                    continue;
                }
            }
            if let Some(country) = country {
                if !tags.matches(TagKind::Country, country) {
                    continue;
                }
            }
            if let Some(search) = &search {
                if !channel.record.name.to_lowercase().contains(search.as_str()) {
                    continue;
                }
            }
            if !include(channel) {
                continue;
            }

            if total >= page.offset && channels.len() < page.limit {
                channels.push(ChannelSummary {
                    channel: channel.clone(),
                    alternatives_count: self.alternatives_count(channel.id),
                });
            }
            total += 1;
        }

        QueryResult {
            channels,
            total,
            offset: page.offset,
            limit: page.limit,
        }
    }

    /// Distinct categories and countries over channels accepted by `include`
    pub fn categories_where<F>(&self, include: F) -> CategoryListing
    where
        F: Fn(&Channel) -> bool,
    {
        let mut categories: BTreeMap<String, String> = BTreeMap::new();
        let mut countries: BTreeMap<String, String> = BTreeMap::new();

        for (channel, tags) in self.channels().iter().zip(self.tags()) {
            if !include(channel) {
                continue;
            }
            for category in &tags.categories {
                categories
                    .entry(category.to_lowercase())
                    .or_insert_with(|| category.clone());
            }
            for country in &tags.countries {
                countries
                    .entry(country.to_lowercase())
                    .or_insert_with(|| country.clone());
            }
        }

        CategoryListing {
            categories: categories.into_values().collect(),
            countries: countries.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dedup::{dedupe, DedupOptions};
    use crate::models::{ChannelRecord, SourceType};
    use std::collections::BTreeMap;

    fn record(name: &str, category: &str, source: &str) -> ChannelRecord {
        ChannelRecord {
            name: name.to_string(),
            logo_url: None,
            category: category.to_string(),
            source_name: source.to_string(),
            source_type: SourceType::Iptv,
            stream_url: format!("http://{source}.example.com/{}", name.len()),
            record_id: format!("{source}_{name}"),
            source_priority: None,
        }
    }

    fn catalog() -> Catalog {
        let output = dedupe(
            vec![
                record("BBC News", "News;United Kingdom", "a"),
                record("CNN", "news;USA;News", "a"),
                record("Cartoon Network", "Kids", "a"),
                record("bbc news", "News", "b"),
                record("BBC NEWS", "News", "c"),
                record("France 24", "News;France", "b"),
            ],
            DedupOptions::default(),
        );
        Catalog::from_parts(output.channels, output.alternatives, BTreeMap::new())
    }

    #[test]
    fn test_classify_splits_and_dedupes() {
        let tags = ChannelTags::classify(" news ; USA;News;;United Kingdom ");
        assert_eq!(tags.categories, vec!["news"]);
        assert_eq!(tags.countries, vec!["USA", "United Kingdom"]);
    }

    #[test]
    fn test_category_filter_is_case_insensitive() {
        let result = catalog().query(&ChannelQuery::default().category("NEWS"), Page::first(100));
        let names: Vec<_> = result
            .channels
            .iter()
            .map(|c| c.channel.record.name.as_str())
            .collect();
        assert_eq!(names, vec!["BBC News", "CNN", "France 24"]);
        assert_eq!(result.total, 3);
    }

    #[test]
    fn test_unmatched_category_is_empty_not_error() {
        let result = catalog().query(&ChannelQuery::default().category("Cooking"), Page::first(100));
        assert!(result.channels.is_empty());
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_filters_combine() {
        let query = ChannelQuery::default().category("news").country("usa");
        let result = catalog().query(&query, Page::first(100));
        assert_eq!(result.total, 1);
        assert_eq!(result.channels[0].channel.record.name, "CNN");

        let result = catalog().query(&ChannelQuery::default().search("bbc"), Page::first(100));
        assert_eq!(result.total, 1);

        let result = catalog().query(&ChannelQuery::default().category("all"), Page::first(100));
        assert_eq!(result.total, 4);
    }

    #[test]
    fn test_alternatives_count() {
        let result = catalog().query(&ChannelQuery::default(), Page::first(100));
        let counts: Vec<_> = result
            .channels
            .iter()
            .map(|c| c.alternatives_count)
            .collect();
        assert_eq!(counts, vec![2, 0, 0, 0]);
    }

    #[test]
    fn test_paging_reports_true_total() {
        let result = catalog().query(&ChannelQuery::default(), Page { offset: 1, limit: 2 });
        assert_eq!(result.total, 4);
        assert_eq!(result.channels.len(), 2);
        assert_eq!(result.channels[0].channel.record.name, "CNN");
    }

    #[test]
    fn test_category_listing() {
        let listing = catalog().categories_where(|_| true);
        assert_eq!(listing.categories, vec!["Kids", "News"]);
        assert_eq!(listing.countries, vec!["France", "United Kingdom", "USA"]);
    }
}
