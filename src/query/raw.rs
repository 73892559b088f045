//! Raw query augmentation.
//!
//! This is a token-level rewrite, not a parser. Only the first `where`,
//! `group` and `order` keywords are considered; keywords inside quoted
//! strings or repeated clauses are not handled.

use super::TIME_FILTER_PLACEHOLDER;

/// Insert the time filter placeholder into a raw query.
///
/// Returns the rewritten query and the implicit group-by field, which is
/// the text before the comma when the second token contains one
/// (`select host, value from ...`).
pub fn augment_raw_query(query: &str) -> (String, Option<String>) {
    let query = query.trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    let mut tokens: Vec<String> = query.split_whitespace().map(String::from).collect();
    let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let position = |keyword: &str| lower.iter().position(|t| t == keyword);

    let group_by_field = tokens
        .get(1)
        .and_then(|t| t.split_once(','))
        .map(|(field, _)| field.to_string())
        .filter(|field| !field.is_empty());

    let filter = TIME_FILTER_PLACEHOLDER.to_string();

    if let Some(where_idx) = position("where") {
        tokens.splice(where_idx + 1..where_idx + 1, [filter, "and".to_string()]);
    } else if let Some(idx) = position("group").or_else(|| position("order")) {
        tokens.splice(idx..idx, ["where".to_string(), filter]);
    } else {
        tokens.push("where".to_string());
        tokens.push(filter);
    }

    (tokens.join(" "), group_by_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn augment(q: &str) -> String {
        augment_raw_query(q).0.replace(TIME_FILTER_PLACEHOLDER, "TF")
    }

    #[test]
    fn test_existing_where() {
        assert_eq!(
            augment("select value from series where time > 1"),
            "select value from series where TF and time > 1"
        );
        assert_eq!(
            augment("SELECT value FROM series WHERE host = 'a';"),
            "SELECT value FROM series WHERE TF and host = 'a'"
        );
    }

    #[test]
    fn test_insert_before_group_or_order() {
        assert_eq!(
            augment("select mean(v) from s group by time(1m) order asc"),
            "select mean(v) from s where TF group by time(1m) order asc"
        );
        assert_eq!(
            augment("select v from s order asc"),
            "select v from s where TF order asc"
        );
    }

    #[test]
    fn test_append_when_no_clause() {
        assert_eq!(augment("select   v  from s;;"), "select v from s where TF");
    }

    #[test]
    fn test_implicit_group_by_field() {
        let (_, group) = augment_raw_query("select host, value from cpu");
        assert_eq!(group.as_deref(), Some("host"));

        let (_, group) = augment_raw_query("select value from cpu");
        assert!(group.is_none());
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(augment(""), "where TF");
        assert_eq!(augment(";"), "where TF");
        assert_eq!(augment("where"), "where TF and");
    }
}
