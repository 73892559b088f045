//! Row-set normalization into time series and annotations.
//!
//! Backend timestamps are in seconds (`time_precision=s`); output uses
//! milliseconds.

mod annotations;
mod models;

pub use annotations::*;
pub use models::*;

use std::collections::HashMap;

use serde_json::Value;

/// Convert row-sets into labeled time series.
///
/// Every column other than the time column and the group-by column becomes
/// its own series. With a group-by field, each distinct value of that
/// column (in order of first appearance) gets its own set of series.
pub fn to_time_series(row_sets: &[RowSet], alias: Option<&str>, group_by_field: Option<&str>) -> Vec<TimeSeries> {
    let mut output = Vec::new();

    for row_set in row_sets {
        if row_set.points.is_empty() {
            continue;
        }

        let time_col = row_set.time_index();
        let group_col = group_by_field.and_then(|f| row_set.column_index(f));
        let value_cols: Vec<usize> = (0..row_set.columns.len())
            .filter(|i| *i != time_col && Some(*i) != group_col)
            .collect();
        let multi_column = value_cols.len() > 1;

        let groups = match group_col {
            Some(col) => group_points(&row_set.points, col),
            None => vec![(None, row_set.points.iter().collect())],
        };

        for (group, points) in &groups {
            for &col in &value_cols {
                let column = &row_set.columns[col];
                let target = match alias {
                    Some(alias) => expand_alias(alias, &row_set.name, column, group.as_deref()),
                    None => default_label(&row_set.name, column, group.as_deref(), multi_column),
                };

                let mut datapoints: Vec<(Option<f64>, i64)> = points
                    .iter()
                    .map(|p| (p.get(col).and_then(numeric), timestamp_millis(p.get(time_col))))
                    .collect();
                datapoints.sort_by_key(|(_, ts)| *ts);

                output.push(TimeSeries { target, datapoints });
            }
        }
    }

    output
}

/// Split points by the value of `col`, keeping first-appearance order.
fn group_points(points: &[Vec<Value>], col: usize) -> Vec<(Option<String>, Vec<&Vec<Value>>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Option<String>, Vec<&Vec<Value>>)> = Vec::new();

    for point in points {
        let key = point.get(col).map(value_text).unwrap_or_else(|| "null".to_string());
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((Some(key), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(point);
    }

    groups
}

fn default_label(name: &str, column: &str, group: Option<&str>, multi_column: bool) -> String {
    let mut label = name.to_string();
    if let Some(group) = group {
        label.push('.');
        label.push_str(group);
    }
    if multi_column {
        label.push('.');
        label.push_str(column);
    }
    label
}

/// Expand `$col`, `$s`, `$g` and `$0`..`$9` in an alias.
fn expand_alias(alias: &str, name: &str, column: &str, group: Option<&str>) -> String {
    let mut label = alias.replace("$col", column).replace("$s", name);

    for (i, segment) in name.split('.').enumerate().take(10) {
        if !segment.is_empty() {
            label = label.replace(&format!("${}", i), segment);
        }
    }

    if let Some(group) = group {
        label = label.replace("$g", group);
    }

    label
}

pub(crate) fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn timestamp_millis(v: Option<&Value>) -> i64 {
    v.and_then(numeric).map(|secs| (secs * 1000.0) as i64).unwrap_or(0)
}

/// Text form of a cell, as used for labels and list values.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_set(value: Value) -> Vec<RowSet> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_one_series_per_data_column() {
        let rs = row_set(json!([{
            "name": "test",
            "columns": ["time", "sequence_nr", "value"],
            "points": [[10, 1, 1]]
        }]));

        let series = to_time_series(&rs, None, None);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].target, "test.sequence_nr");
        assert_eq!(series[0].datapoints, vec![(Some(1.0), 10_000)]);
        assert_eq!(series[1].target, "test.value");
        assert_eq!(series[1].datapoints, vec![(Some(1.0), 10_000)]);
    }

    #[test]
    fn test_single_column_uses_name_and_sorts() {
        let rs = row_set(json!([{
            "name": "cpu",
            "columns": ["time", "mean"],
            "points": [[30, 3.5], [10, 1.5], [20, "bad"]]
        }]));

        let series = to_time_series(&rs, None, None);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].target, "cpu");
        assert_eq!(
            series[0].datapoints,
            vec![(Some(1.5), 10_000), (None, 20_000), (Some(3.5), 30_000)]
        );
    }

    #[test]
    fn test_group_by_fans_out() {
        let rs = row_set(json!([{
            "name": "cpu",
            "columns": ["time", "mean", "host"],
            "points": [[1, 1, "b"], [1, 2, "a"], [2, 3, "b"]]
        }]));

        let series = to_time_series(&rs, None, Some("host"));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].target, "cpu.b");
        assert_eq!(series[0].datapoints, vec![(Some(1.0), 1000), (Some(3.0), 2000)]);
        assert_eq!(series[1].target, "cpu.a");
        assert_eq!(series[1].datapoints, vec![(Some(2.0), 1000)]);
    }

    #[test]
    fn test_group_by_multiple_columns_labels() {
        let rs = row_set(json!([{
            "name": "net",
            "columns": ["host", "time", "rx", "tx"],
            "points": [["a", 5, 1, 2]]
        }]));

        let labels: Vec<String> = to_time_series(&rs, None, Some("host"))
            .into_iter()
            .map(|s| s.target)
            .collect();
        assert_eq!(labels, vec!["net.a.rx", "net.a.tx"]);
    }

    #[test]
    fn test_alias_expansion() {
        let rs = row_set(json!([{
            "name": "prod.web.cpu",
            "columns": ["time", "mean", "host"],
            "points": [[1, 1, "h1"]]
        }]));

        let series = to_time_series(&rs, Some("$1 $2 $col on $g ($s)"), Some("host"));
        assert_eq!(series[0].target, "web cpu mean on h1 (prod.web.cpu)");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(to_time_series(&[], None, None).is_empty());

        let rs = row_set(json!([{"name": "cpu", "columns": ["time", "value"], "points": []}]));
        assert!(to_time_series(&rs, None, Some("host")).is_empty());
        assert!(to_time_series(&rs, None, None).is_empty());
    }
}
