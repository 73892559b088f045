//! Annotation event extraction.

use serde_json::Value;

use super::{timestamp_millis, value_text, AnnotationEvent, AnnotationSpec, RowSet};

/// Map every point of every row-set to an event, in row order.
pub fn to_annotations(row_sets: &[RowSet], spec: &AnnotationSpec) -> Vec<AnnotationEvent> {
    let mut events = Vec::new();

    for row_set in row_sets {
        let time_col = row_set.time_index();
        let lookup = |configured: &Option<String>, fallbacks: &[&str]| {
            configured
                .as_deref()
                .and_then(|c| row_set.column_index(c))
                .or_else(|| fallbacks.iter().find_map(|f| row_set.column_index(f)))
        };

        let title_col = lookup(&spec.title_column, &["title"]).or_else(|| {
            row_set
                .columns
                .iter()
                .enumerate()
                .position(|(i, c)| i != time_col && c != "sequence_number")
        });
        let text_col = lookup(&spec.text_column, &["text", "description"]);
        let tags_col = lookup(&spec.tags_column, &["tags"]);

        for point in &row_set.points {
            let cell = |col: Option<usize>| col.and_then(|c| point.get(c));

            events.push(AnnotationEvent {
                annotation: spec.name.clone(),
                time: timestamp_millis(point.get(time_col)),
                title: cell(title_col).and_then(optional_text),
                text: cell(text_col).and_then(optional_text),
                tags: cell(tags_col).map(parse_tags).unwrap_or_default(),
            });
        }
    }

    events
}

fn optional_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        other => Some(value_text(other)),
    }
}

/// Tags arrive as a comma-delimited string or a JSON array.
fn parse_tags(v: &Value) -> Vec<String> {
    match v {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter_map(optional_text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        other => value_text(other)
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
    }
}
