//! Dashboard search mini-grammar.
//!
//! - `title:<substr>`: case-insensitive title match
//! - `tags:<a,b>[ AND title:<substr>]`: every listed tag present, then optional title match
//! - `tags!:<substr>`: tag frequency histogram instead of dashboards
//! - anything else: every dashboard

use std::collections::HashMap;

use super::{DashboardRecord, SearchHits, TagTerm};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    All,
    Title(String),
    Tags { tags: Vec<String>, title: Option<String> },
    TagHistogram(String),
}

impl SearchQuery {
    pub fn parse(query: &str) -> Self {
        if let Some(title) = query.strip_prefix("title:") {
            return SearchQuery::Title(title.trim().to_string());
        }
        if let Some(needle) = query.strip_prefix("tags!:") {
            return SearchQuery::TagHistogram(needle.trim().to_string());
        }
        if query.starts_with("tags:") {
            let mut tags = Vec::new();
            let mut title = None;

            for part in query.split("AND").map(str::trim) {
                if let Some(list) = part.strip_prefix("tags:") {
                    tags = list
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from)
                        .collect();
                } else if let Some(t) = part.strip_prefix("title:") {
                    title = Some(t.trim().to_string());
                }
            }

            return SearchQuery::Tags { tags, title };
        }
        SearchQuery::All
    }
}

/// Apply a query to a bucket of dashboards.
pub fn search(dashboards: Vec<DashboardRecord>, query: &SearchQuery) -> SearchHits {
    match query {
        SearchQuery::All => SearchHits {
            dashboards,
            ..Default::default()
        },
        SearchQuery::Title(needle) => SearchHits {
            dashboards: filter_title(dashboards, needle),
            ..Default::default()
        },
        SearchQuery::Tags { tags, title } => {
            let tagged: Vec<DashboardRecord> = dashboards
                .into_iter()
                .filter(|d| !tags.is_empty() && tags.iter().all(|t| d.tags.contains(t)))
                .collect();
            let dashboards = match title {
                Some(needle) => filter_title(tagged, needle),
                None => tagged,
            };
            SearchHits {
                dashboards,
                ..Default::default()
            }
        }
        SearchQuery::TagHistogram(needle) => SearchHits {
            dashboards: Vec::new(),
            tags: tag_histogram(&dashboards, needle),
            tags_only: true,
        },
    }
}

fn filter_title(dashboards: Vec<DashboardRecord>, needle: &str) -> Vec<DashboardRecord> {
    let needle = needle.trim().to_lowercase();
    dashboards
        .into_iter()
        .filter(|d| d.title.to_lowercase().contains(&needle))
        .collect()
}

/// Count tags containing `needle` (case-insensitive), in first-seen order.
fn tag_histogram(dashboards: &[DashboardRecord], needle: &str) -> Vec<TagTerm> {
    let needle = needle.trim().to_lowercase();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut terms: Vec<TagTerm> = Vec::new();

    for tag in dashboards.iter().flat_map(|d| d.tags.iter()) {
        if !tag.to_lowercase().contains(&needle) {
            continue;
        }
        match index.get(tag.as_str()) {
            Some(&i) => terms[i].count += 1,
            None => {
                index.insert(tag, terms.len());
                terms.push(TagTerm {
                    term: tag.clone(),
                    count: 1,
                });
            }
        }
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> Vec<DashboardRecord> {
        vec![
            DashboardRecord::new("Foo Overview", &["a", "b"]),
            DashboardRecord::new("foobar", &["a"]),
            DashboardRecord::new("Other FOO", &["b", "a", "c"]),
            DashboardRecord::new("Bar", &["a", "b"]),
        ]
    }

    fn titles(hits: &SearchHits) -> Vec<&str> {
        hits.dashboards.iter().map(|d| d.title.as_str()).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(SearchQuery::parse("title: Foo "), SearchQuery::Title("Foo".to_string()));
        assert_eq!(SearchQuery::parse("tags!:ops"), SearchQuery::TagHistogram("ops".to_string()));
        assert_eq!(
            SearchQuery::parse("tags:a, b AND title:foo"),
            SearchQuery::Tags {
                tags: vec!["a".to_string(), "b".to_string()],
                title: Some("foo".to_string()),
            }
        );
        assert_eq!(SearchQuery::parse("whatever"), SearchQuery::All);
    }

    #[test]
    fn test_title_search_case_insensitive() {
        let hits = search(fixtures(), &SearchQuery::parse("title:FOO"));
        assert_eq!(titles(&hits), vec!["Foo Overview", "foobar", "Other FOO"]);
        assert!(!hits.tags_only);
    }

    #[test]
    fn test_tags_and_title() {
        let hits = search(fixtures(), &SearchQuery::parse("tags:a,b AND title:foo"));
        assert_eq!(titles(&hits), vec!["Foo Overview", "Other FOO"]);
    }

    #[test]
    fn test_tags_only() {
        let hits = search(fixtures(), &SearchQuery::parse("tags:c"));
        assert_eq!(titles(&hits), vec!["Other FOO"]);
    }

    #[test]
    fn test_empty_tag_list_matches_nothing() {
        let mut dashboards = fixtures();
        dashboards.push(DashboardRecord::new("Untagged", &[]));
        assert!(search(dashboards, &SearchQuery::parse("tags:")).dashboards.is_empty());
    }

    #[test]
    fn test_tag_histogram() {
        let hits = search(fixtures(), &SearchQuery::parse("tags!:"));
        assert!(hits.tags_only);
        assert!(hits.dashboards.is_empty());
        assert_eq!(
            hits.tags,
            vec![
                TagTerm { term: "a".to_string(), count: 4 },
                TagTerm { term: "b".to_string(), count: 3 },
                TagTerm { term: "c".to_string(), count: 1 },
            ]
        );

        let hits = search(fixtures(), &SearchQuery::parse("tags!:C"));
        assert_eq!(hits.tags, vec![TagTerm { term: "c".to_string(), count: 1 }]);
    }

    #[test]
    fn test_unmatched_returns_all() {
        assert_eq!(search(fixtures(), &SearchQuery::parse("")).dashboards.len(), 4);
    }
}
