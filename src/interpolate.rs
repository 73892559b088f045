//! Template variable substitution for query and alias text.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated variable reference at offset {0}")]
    Unterminated(usize),
    #[error("empty variable reference at offset {0}")]
    Empty(usize),
}

/// Substitutes template variables into query and alias strings.
pub trait VariableInterpolator: Send + Sync {
    fn replace(&self, text: &str) -> Result<String, TemplateError>;
}

/// Variable map supporting `[[name]]` and `$name` references.
///
/// Unknown names are left in place so that backend syntax using `$`
/// survives interpolation.
#[derive(Debug, Clone, Default)]
pub struct TemplateVariables {
    values: HashMap<String, String>,
}

impl TemplateVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    fn replace_brackets(&self, text: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find("[[") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("]]")
                .ok_or(TemplateError::Unterminated(offset + start))?;
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(TemplateError::Empty(offset + start));
            }

            match self.values.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 2]),
            }

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl VariableInterpolator for TemplateVariables {
    fn replace(&self, text: &str) -> Result<String, TemplateError> {
        static DOLLAR_REF: OnceLock<Regex> = OnceLock::new();
        let dollar_ref = DOLLAR_REF.get_or_init(|| Regex::new(r"\$(\w+)").unwrap());

        let bracketed = self.replace_brackets(text)?;
        let replaced = dollar_ref.replace_all(&bracketed, |caps: &Captures| {
            match self.values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        });
        Ok(replaced.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_known_variables() {
        let vars = TemplateVariables::new().with("host", "web-1").with("dc", "eu");
        let out = vars.replace("select * from [[host]] where dc = '$dc'").unwrap();
        assert_eq!(out, "select * from web-1 where dc = 'eu'");
    }

    #[test]
    fn test_unknown_variables_kept() {
        let vars = TemplateVariables::new();
        assert_eq!(vars.replace("[[missing]] $other").unwrap(), "[[missing]] $other");
    }

    #[test]
    fn test_unterminated_reference() {
        let vars = TemplateVariables::new().with("a", "b");
        assert_eq!(vars.replace("x [[a]] [[b"), Err(TemplateError::Unterminated(8)));
        assert_eq!(vars.replace("[[ ]]"), Err(TemplateError::Empty(0)));
    }
}
