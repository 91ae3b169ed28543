//! Context and reading-order preflight.
//!
//! Runs before normalization: the vocabulary context decides whether the
//! document is processable at all and carries the global language and
//! direction, and profile guessing needs reading-order URLs before the rest
//! of the document is touched.

use serde_json::{json, Map, Value};

use crate::error::Diagnostics;
use crate::formats::is_valid_language_tag;
use crate::terms::{CONTEXT_PUB, CONTEXT_SCHEMA_ORG};

/// Check the declared vocabulary context.
///
/// `@context` must be an array of length two or more whose first two entries
/// are exactly the schema.org and publication-context URIs. The returned
/// error message becomes a fatal diagnostic.
pub fn check_context(json: &Map<String, Value>) -> Result<(), String> {
    match json.get("@context") {
        None => Err("Missing property \"@context\"".to_string()),
        Some(Value::Array(entries)) => {
            if entries.len() < 2
                || entries[0].as_str() != Some(CONTEXT_SCHEMA_ORG)
                || entries[1].as_str() != Some(CONTEXT_PUB)
            {
                Err("Property \"@context\" does not contain the required values".to_string())
            } else {
                Ok(())
            }
        }
        Some(_) => Err("Property \"@context\" is not an Array".to_string()),
    }
}

/// Build the preliminary reading order: string entries are promoted to
/// `{url}` objects, everything else is kept for full normalization later.
///
/// A missing `readingOrder` is an empty list, not an error.
pub fn preliminary_reading_order(json: &Map<String, Value>) -> Vec<Value> {
    let raw: Vec<Value> = match json.get("readingOrder") {
        None => Vec::new(),
        Some(Value::String(s)) => vec![Value::String(s.clone())],
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    };
    raw.into_iter()
        .map(|item| match item {
            Value::String(s) => json!({ "url": s }),
            other => other,
        })
        .collect()
}

/// Extract the global language and direction from object entries of the
/// context array, validating and defaulting them.
///
/// Later entries win. A nonempty invalid value is reset to empty with a
/// validation diagnostic; empty values fall back to the supplied defaults.
pub fn global_lang_and_dir(
    json: &Map<String, Value>,
    default_lang: &str,
    default_dir: &str,
    diagnostics: &mut Diagnostics,
) -> (String, String) {
    let mut lang = String::new();
    let mut dir = String::new();
    if let Some(Value::Array(entries)) = json.get("@context") {
        for context in entries.iter().filter_map(Value::as_object) {
            if let Some(value) = context.get("language") {
                lang = stringify(value);
            }
            if let Some(value) = context.get("direction") {
                dir = stringify(value);
            }
        }
    }
    if !lang.is_empty() && !is_valid_language_tag(&lang) {
        diagnostics.push_validation(format!("Invalid language tag *{lang}*"));
        lang.clear();
    }
    if !dir.is_empty() && dir != "ltr" && dir != "rtl" {
        diagnostics.push_validation(format!("Invalid direction value *{dir}*"));
        dir.clear();
    }
    if lang.is_empty() {
        lang = default_lang.to_string();
    }
    if dir.is_empty() {
        dir = default_dir.to_string();
    }
    (lang, dir)
}

// Non-string declarations fail validation anyway; serialize them so the
// diagnostic can name the offending value.
fn stringify(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn missing_context_is_fatal() {
        let json = object(json!({}));
        assert_eq!(
            check_context(&json).unwrap_err(),
            "Missing property \"@context\""
        );
    }

    #[test]
    fn non_array_context_is_fatal() {
        let json = object(json!({"@context": "https://schema.org"}));
        assert_eq!(
            check_context(&json).unwrap_err(),
            "Property \"@context\" is not an Array"
        );
    }

    #[test]
    fn short_or_wrong_context_is_fatal() {
        let json = object(json!({"@context": ["https://schema.org"]}));
        assert!(check_context(&json).is_err());
        let json = object(json!({"@context": ["https://schema.org", "https://example.com"]}));
        assert!(check_context(&json).is_err());
    }

    #[test]
    fn conforming_context_passes() {
        let json = object(json!({
            "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context", {"language": "en"}]
        }));
        assert!(check_context(&json).is_ok());
    }

    #[test]
    fn reading_order_promotes_strings() {
        let json = object(json!({"readingOrder": "c1.mp3"}));
        assert_eq!(preliminary_reading_order(&json), vec![json!({"url": "c1.mp3"})]);

        let json = object(json!({"readingOrder": ["c1.mp3", {"url": "c2.mp3"}]}));
        assert_eq!(
            preliminary_reading_order(&json),
            vec![json!({"url": "c1.mp3"}), json!({"url": "c2.mp3"})]
        );
    }

    #[test]
    fn missing_reading_order_is_empty() {
        let json = object(json!({}));
        assert!(preliminary_reading_order(&json).is_empty());
    }

    #[test]
    fn lang_and_dir_come_from_context_objects() {
        let json = object(json!({
            "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context",
                         {"language": "fr", "direction": "rtl"}]
        }));
        let mut diagnostics = Diagnostics::new();
        let (lang, dir) = global_lang_and_dir(&json, "", "", &mut diagnostics);
        assert_eq!((lang.as_str(), dir.as_str()), ("fr", "rtl"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn invalid_lang_and_dir_are_reset_and_flagged() {
        let json = object(json!({
            "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context",
                         {"language": "not-a-tag", "direction": "sideways"}]
        }));
        let mut diagnostics = Diagnostics::new();
        let (lang, dir) = global_lang_and_dir(&json, "en", "ltr", &mut diagnostics);
        assert_eq!((lang.as_str(), dir.as_str()), ("en", "ltr"));
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn defaults_fill_missing_globals() {
        let json = object(json!({
            "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context"]
        }));
        let mut diagnostics = Diagnostics::new();
        let (lang, dir) = global_lang_and_dir(&json, "en", "ltr", &mut diagnostics);
        assert_eq!((lang.as_str(), dir.as_str()), ("en", "ltr"));
        assert!(diagnostics.is_empty());
    }
}
