//! Dashboard record types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored dashboard. Fields other than id, title and tags are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl DashboardRecord {
    pub fn new(title: &str, tags: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }
}

/// Result of saving a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveResult {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Tag frequency entry from a `tags!:` search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagTerm {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHits {
    pub dashboards: Vec<DashboardRecord>,
    pub tags: Vec<TagTerm>,
    pub tags_only: bool,
}

/// Fresh 32 hex digit dashboard id.
pub fn generate_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let id = generate_id();
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn test_payload_round_trips_unknown_fields() {
        let json = r#"{"id":"x","title":"Ops","rows":[1,2],"refresh":"5s"}"#;
        let record: DashboardRecord = serde_json::from_str(json).unwrap();
        assert!(record.tags.is_empty());
        assert_eq!(record.payload["refresh"], "5s");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["rows"], serde_json::json!([1, 2]));
    }
}
