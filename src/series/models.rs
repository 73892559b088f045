//! Response and normalized output types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named result set returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub points: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Index of the timestamp column, `0` when none is named `time`.
    pub fn time_index(&self) -> usize {
        self.column_index("time").unwrap_or(0)
    }
}

/// A labeled series of `[value, timestamp_ms]` points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub target: String,
    pub datapoints: Vec<(Option<f64>, i64)>,
}

/// Annotation definition configured on a dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationSpec {
    pub name: String,
    pub query: String,
    pub title_column: Option<String>,
    pub text_column: Option<String>,
    pub tags_column: Option<String>,
}

/// One annotation event, derived from one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEvent {
    pub annotation: String,
    /// Milliseconds since the epoch.
    pub time: i64,
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Vec<String>,
}
