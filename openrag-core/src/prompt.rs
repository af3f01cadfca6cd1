use crate::{OpenRagError, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// Regex pattern to match template placeholders like {variable} or {variable?}
/// Matches {+[^{}]*}+ so that doubled braces are seen as a single match
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{+[^{}]*\}+").expect("Invalid regex pattern"))
}

/// Checks if a string is a valid identifier.
/// Must start with letter or underscore, followed by letters, digits, or underscores
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Splits a raw match into `(name, optional)` when it is a single-brace
/// placeholder over a valid identifier.
fn parse_placeholder(match_str: &str) -> Option<(&str, bool)> {
    let inner = match_str.strip_prefix('{')?.strip_suffix('}')?;
    if inner.starts_with('{') || inner.ends_with('}') {
        // {{literal}} escapes a placeholder
        return None;
    }
    let inner = inner.trim();
    let (name, optional) = match inner.strip_suffix('?') {
        Some(name) => (name, true),
        None => (inner, false),
    };
    is_identifier(name).then_some((name, optional))
}

/// A prompt with `{name}` placeholders.
///
/// - `{name}` - required variable, rendering fails if it is missing
/// - `{name?}` - optional variable, renders as an empty string if missing
/// - `{{name}}` - literal `{name}`
///
/// Anything else in braces (JSON examples, for instance) is kept verbatim.
/// Substituted values are never rescanned, so a value may itself contain braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// Builds a template and checks that every name in `required` appears
    /// as a placeholder.
    pub fn with_required(template: impl Into<String>, required: &[&str]) -> Result<Self> {
        let template = Self::new(template);
        let variables = template.variables();
        let missing: Vec<&str> =
            required.iter().copied().filter(|name| !variables.contains(*name)).collect();
        if !missing.is_empty() {
            return Err(OpenRagError::Template(format!(
                "template is missing placeholder(s): {}",
                missing.iter().map(|m| format!("{{{m}}}")).collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(template)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Names of all placeholders in the template.
    pub fn variables(&self) -> BTreeSet<String> {
        placeholder_regex()
            .find_iter(&self.template)
            .filter_map(|m| parse_placeholder(m.as_str()))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Renders the template with the given values.
    ///
    /// # Errors
    ///
    /// Returns [`OpenRagError::Template`] if a required placeholder has no value.
    pub fn render(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let mut result = String::with_capacity(self.template.len());
        let mut last_end = 0;

        for found in placeholder_regex().find_iter(&self.template) {
            let range = found.range();
            result.push_str(&self.template[last_end..range.start]);

            let match_str = found.as_str();
            match parse_placeholder(match_str) {
                Some((name, optional)) => match values.get(name) {
                    Some(value) => result.push_str(value),
                    None if optional => {}
                    None => {
                        return Err(OpenRagError::Template(format!(
                            "no value provided for placeholder '{name}'"
                        )));
                    }
                },
                None => result.push_str(&unescape(match_str)),
            }

            last_end = range.end;
        }

        result.push_str(&self.template[last_end..]);
        Ok(result)
    }
}

/// `{{name}}` renders as `{name}`; other literals pass through.
fn unescape(match_str: &str) -> String {
    match match_str.strip_prefix("{{").and_then(|s| s.strip_suffix("}}")) {
        Some(inner) if is_identifier(inner.trim()) => format!("{{{inner}}}"),
        _ => match_str.to_string(),
    }
}

impl From<&str> for PromptTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for PromptTemplate {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("valid_name"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("name123"));
        assert!(!is_identifier("123invalid"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("with-dash"));
    }

    #[test]
    fn test_parse_placeholder() {
        assert_eq!(parse_placeholder("{query}"), Some(("query", false)));
        assert_eq!(parse_placeholder("{ query? }"), Some(("query", true)));
        assert_eq!(parse_placeholder("{{query}}"), None);
        assert_eq!(parse_placeholder("{\"a\": 1}"), None);
    }
}
