//! Structured target rendering.

use std::fmt::Write;

use super::{INTERVAL_PLACEHOLDER, TIME_FILTER_PLACEHOLDER};

/// An equality-style filter appended to the where clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key: String,
    pub op: String,
    pub value: String,
}

/// A query described by series, column and aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredTarget {
    pub series: String,
    pub column: String,
    pub function: String,
    pub interval: Option<String>,
    pub condition: Option<Condition>,
    pub group_by: Option<String>,
}

impl StructuredTarget {
    /// Render the query with time filter and interval placeholders.
    pub fn render(&self) -> String {
        let mut q = String::from("select ");

        if let Some(group) = &self.group_by {
            let _ = write!(q, "{}, ", group);
        }

        let _ = write!(
            q,
            "{}({}) from {} where {}",
            self.function,
            self.column,
            quote_series(&self.series),
            TIME_FILTER_PLACEHOLDER
        );

        if let Some(c) = &self.condition {
            let _ = write!(q, " and {} {} {}", c.key, c.op, c.value);
        }

        let _ = write!(q, " group by time({})", INTERVAL_PLACEHOLDER);

        if let Some(group) = &self.group_by {
            let _ = write!(q, ", {}", group);
        }

        q.push_str(" order asc");
        q
    }
}

/// Quote a series name unless it is a `/regex/`.
fn quote_series(series: &str) -> String {
    if series.len() >= 2 && series.starts_with('/') && series.ends_with('/') {
        series.to_string()
    } else {
        format!("\"{}\"", series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> StructuredTarget {
        StructuredTarget {
            series: "cpu.load".to_string(),
            column: "value".to_string(),
            function: "mean".to_string(),
            interval: None,
            condition: None,
            group_by: None,
        }
    }

    #[test]
    fn test_render_plain() {
        assert_eq!(
            target().render(),
            "select mean(value) from \"cpu.load\" where [[timeFilter]] \
             group by time([[interval]]) order asc"
        );
    }

    #[test]
    fn test_render_condition_and_group() {
        let t = StructuredTarget {
            condition: Some(Condition {
                key: "host".to_string(),
                op: "=".to_string(),
                value: "'web-1'".to_string(),
            }),
            group_by: Some("dc".to_string()),
            ..target()
        };
        assert_eq!(
            t.render(),
            "select dc, mean(value) from \"cpu.load\" where [[timeFilter]] and host = 'web-1' \
             group by time([[interval]]), dc order asc"
        );
    }

    #[test]
    fn test_regex_series_not_quoted() {
        assert_eq!(quote_series("/cpu.*/"), "/cpu.*/");
        assert_eq!(quote_series("/"), "\"/\"");
        assert_eq!(quote_series("cpu"), "\"cpu\"");
    }
}
