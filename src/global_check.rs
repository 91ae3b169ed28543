//! Post-normalization container re-check.
//!
//! Re-verifies that every term still has the top-level container its shape
//! demands after normalization has run, recursing into array-of-object
//! shapes. A term that fails is deleted from the document, not nulled.

use serde_json::{Map, Value};

use crate::error::Diagnostics;
use crate::terms::{classify, Shape};

/// Re-check every term of the tree, dropping anything malformed.
pub fn check_tree(tree: Map<String, Value>, diagnostics: &mut Diagnostics) -> Map<String, Value> {
    check_object(tree, diagnostics)
}

fn check_object(object: Map<String, Value>, diagnostics: &mut Diagnostics) -> Map<String, Value> {
    let mut out = Map::new();
    for (term, value) in object {
        match check_term(&term, value, diagnostics) {
            Some(checked) => {
                out.insert(term, checked);
            }
            None => {
                log::debug!("dropping term '{}': failed global data check", term);
                diagnostics.push_validation(format!(
                    "Term {term} failed global data check and has been removed"
                ));
            }
        }
    }
    out
}

fn check_term(term: &str, value: Value, diagnostics: &mut Diagnostics) -> Option<Value> {
    match classify(term) {
        Shape::EntityArray | Shape::L10nStringArray | Shape::LinkedResourceArray => match value {
            Value::Array(items) => {
                let kept: Vec<Value> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(nested) => {
                            let checked = check_object(nested, diagnostics);
                            if checked.is_empty() {
                                None
                            } else {
                                Some(Value::Object(checked))
                            }
                        }
                        other => Some(other),
                    })
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(Value::Array(kept))
                }
            }
            _ => {
                diagnostics.push_validation(format!("Array expected for {term}"));
                None
            }
        },
        Shape::LiteralArray => match value {
            Value::Array(items) => {
                let strings: Vec<Value> =
                    items.iter().filter(|v| v.is_string()).cloned().collect();
                if strings.len() != items.len() {
                    diagnostics.push_validation(format!("Array of literals expected for {term}"));
                }
                Some(Value::Array(strings))
            }
            _ => {
                diagnostics.push_validation(format!("Array expected for {term}"));
                None
            }
        },
        Shape::Boolean => match value {
            Value::Bool(_) => Some(value),
            _ => {
                diagnostics.push_validation(format!("Boolean expected for {term}"));
                None
            }
        },
        Shape::Identifier | Shape::Literal | Shape::Url => match value {
            // URLs allow arrays for the top-level `url` property
            Value::String(_) | Value::Array(_) => Some(value),
            _ => {
                diagnostics.push_validation(format!("String or Array expected for {term}"));
                None
            }
        },
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(tree: Value) -> (Map<String, Value>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let out = check_tree(tree.as_object().unwrap().clone(), &mut diagnostics);
        (out, diagnostics)
    }

    #[test]
    fn scalar_where_array_expected_is_dropped() {
        let (out, diagnostics) = run(json!({"author": "not normalized"}));
        assert!(!out.contains_key("author"));
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.entries()[0].message, "Array expected for author");
    }

    #[test]
    fn literal_array_keeps_only_strings() {
        let (out, diagnostics) = run(json!({"inLanguage": ["en", 7, "fr"]}));
        assert_eq!(out["inLanguage"], json!(["en", "fr"]));
        assert_eq!(
            diagnostics.entries()[0].message,
            "Array of literals expected for inLanguage"
        );
    }

    #[test]
    fn non_boolean_abridged_is_dropped() {
        let (out, diagnostics) = run(json!({"abridged": "yes"}));
        assert!(!out.contains_key("abridged"));
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.message == "Boolean expected for abridged"));
    }

    #[test]
    fn object_identifier_is_dropped() {
        let (out, _) = run(json!({"id": {"value": "x"}}));
        assert!(!out.contains_key("id"));
    }

    #[test]
    fn string_and_array_identifiers_survive() {
        let (out, diagnostics) = run(json!({"id": "urn:isbn:123", "url": ["https://example.com/a"]}));
        assert_eq!(out["id"], json!("urn:isbn:123"));
        assert_eq!(out["url"], json!(["https://example.com/a"]));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn recursion_reaches_nested_objects() {
        let (out, diagnostics) = run(json!({
            "readingOrder": [{"url": "a.mp3", "rel": "cover"}]
        }));
        // nested `rel` was never coerced to an array, so it is dropped
        assert!(!out["readingOrder"][0]
            .as_object()
            .unwrap()
            .contains_key("rel"));
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.message == "Array expected for rel"));
    }

    #[test]
    fn emptied_array_term_is_removed() {
        // the lone entity loses its only key, the element becomes unusable,
        // and the term itself goes with it
        let (out, diagnostics) = run(json!({"author": [{"type": 7}]}));
        assert!(!out.contains_key("author"));
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.message == "Term author failed global data check and has been removed"));
    }

    #[test]
    fn unknown_terms_are_untouched() {
        let (out, diagnostics) = run(json!({"custom": {"anything": [1, 2]}}));
        assert_eq!(out["custom"], json!({"anything": [1, 2]}));
        assert!(diagnostics.is_empty());
    }
}
