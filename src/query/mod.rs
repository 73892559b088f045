//! Panel target to backend query translation.
//!
//! A target is either a raw query augmented with the dashboard time filter,
//! or a structured selection rendered from fixed fields.

mod raw;
mod structured;

pub use raw::*;
pub use structured::*;

use serde::Deserialize;
use serde_json::Value;

use crate::interpolate::{TemplateError, VariableInterpolator};

pub const TIME_FILTER_PLACEHOLDER: &str = "[[timeFilter]]";
pub const INTERVAL_PLACEHOLDER: &str = "[[interval]]";

/// Group-by interval used when neither the target nor the request sets one.
pub const DEFAULT_INTERVAL: &str = "1m";

/// How a target produces its query text.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetKind {
    Raw { query: String },
    Structured(StructuredTarget),
}

/// A panel query that will be sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub kind: TargetKind,
    pub alias: Option<String>,
}

/// Target as sent by the dashboard front-end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    #[serde(rename = "rawQuery")]
    pub raw_query: bool,
    pub query: Option<String>,
    pub series: Option<String>,
    pub column: Option<String>,
    pub function: Option<String>,
    pub interval: Option<String>,
    pub condition_filter: bool,
    pub condition_key: Option<String>,
    pub condition_op: Option<String>,
    pub condition_value: Option<Value>,
    pub groupby_field: Option<String>,
    pub groupby_field_add: bool,
    pub alias: Option<String>,
    pub hide: bool,
}

impl TargetSpec {
    /// Convert to a runnable target.
    ///
    /// Returns `None` for hidden targets and for targets missing the fields
    /// their mode needs; those contribute nothing to a query.
    pub fn into_target(self) -> Option<Target> {
        if self.hide {
            return None;
        }

        let alias = non_empty(self.alias);

        let kind = if self.raw_query {
            TargetKind::Raw {
                query: non_empty(self.query)?,
            }
        } else {
            let condition = if self.condition_filter {
                match (non_empty(self.condition_key), non_empty(self.condition_op)) {
                    (Some(key), Some(op)) => Some(Condition {
                        key,
                        op,
                        value: self.condition_value.map(render_value).unwrap_or_default(),
                    }),
                    _ => None,
                }
            } else {
                None
            };

            TargetKind::Structured(StructuredTarget {
                series: non_empty(self.series)?,
                column: non_empty(self.column)?,
                function: non_empty(self.function).unwrap_or_else(|| "mean".to_string()),
                interval: non_empty(self.interval),
                condition,
                group_by: if self.groupby_field_add {
                    non_empty(self.groupby_field)
                } else {
                    None
                },
            })
        };

        Some(Target { kind, alias })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn render_value(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// A fully assembled query and what the response normalizer needs with it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub query: String,
    pub group_by_field: Option<String>,
    pub alias: Option<String>,
}

/// Substitute the time filter and interval placeholders.
pub fn fill_placeholders(text: &str, time_filter: &str, interval: &str) -> String {
    text.replace(TIME_FILTER_PLACEHOLDER, time_filter)
        .replace(INTERVAL_PLACEHOLDER, interval)
}

/// Build the query for one target.
///
/// `default_interval` is the request-level interval, used when the target
/// carries none.
pub fn build_query(
    target: &Target,
    time_filter: &str,
    default_interval: Option<&str>,
    interpolator: &dyn VariableInterpolator,
) -> Result<BuiltQuery, TemplateError> {
    let (text, group_by_field, interval) = match &target.kind {
        TargetKind::Raw { query } => {
            let (text, group_by) = augment_raw_query(query);
            (text, group_by, None)
        }
        TargetKind::Structured(s) => (s.render(), s.group_by.clone(), s.interval.as_deref()),
    };

    let interval = interval.or(default_interval).unwrap_or(DEFAULT_INTERVAL);
    let query = interpolator.replace(&fill_placeholders(&text, time_filter, interval))?;
    let alias = target
        .alias
        .as_deref()
        .map(|a| interpolator.replace(a))
        .transpose()?;

    tracing::debug!("Built query: {}", query);

    Ok(BuiltQuery {
        query,
        group_by_field,
        alias,
    })
}
