//! Shape normalization: expand every term into its canonical shape.
//!
//! Each term's raw value may be authored as a bare string, a bare object,
//! or an array of either; normalization expands all of them into the one
//! canonical shape the registry assigns to the term. URLs are left alone
//! here; resolution is a separate pass so that it also reaches the URL
//! properties of nested linked resources.

use serde_json::{json, Map, Value};

use crate::error::Diagnostics;
use crate::terms::{self, Shape};

/// Outcome of normalizing a single term.
pub(crate) enum Normalized {
    /// Canonical value to store.
    Value(Value),
    /// Dropped without comment; `@context` is preflight's business.
    Skip,
    /// The raw type cannot be coerced into the term's shape.
    Invalid,
}

/// Normalize every term of `manifest` into a new tree.
///
/// Terms whose raw type cannot be coerced into their registered shape are
/// omitted, each with a validation diagnostic naming the term.
pub fn normalize_tree(
    manifest: &Map<String, Value>,
    lang: &str,
    dir: &str,
    diagnostics: &mut Diagnostics,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (term, value) in manifest {
        match normalize_term(term, value, lang, dir, diagnostics) {
            Normalized::Value(v) => {
                out.insert(term.clone(), v);
            }
            Normalized::Skip => {}
            Normalized::Invalid => {
                log::debug!("dropping term '{}': raw type does not fit its shape", term);
                diagnostics.push_validation(format!(
                    "Term \"{term}\" could not be normalized and has been removed"
                ));
            }
        }
    }
    out
}

pub(crate) fn normalize_term(
    term: &str,
    value: &Value,
    lang: &str,
    dir: &str,
    diagnostics: &mut Diagnostics,
) -> Normalized {
    if term == "@context" {
        return Normalized::Skip;
    }
    match terms::classify(term) {
        Shape::LiteralArray => Normalized::Value(match value {
            Value::String(s) => json!([s]),
            other => other.clone(),
        }),
        Shape::EntityArray => normalize_entities(value, lang, dir, diagnostics),
        Shape::L10nStringArray => normalize_l10n_strings(value, lang, dir),
        Shape::LinkedResourceArray => normalize_linked_resources(value, lang, dir, diagnostics),
        // URLs, identifiers, literals, booleans, plain-object arrays, and
        // unknown terms pass through unchanged.
        _ => Normalized::Value(value.clone()),
    }
}

fn normalize_entities(
    value: &Value,
    lang: &str,
    dir: &str,
    diagnostics: &mut Diagnostics,
) -> Normalized {
    let raw: Vec<Value> = match value {
        Value::String(s) => vec![json!({ "name": s })],
        Value::Array(items) => items.clone(),
        _ => return Normalized::Invalid,
    };

    let total = raw.len();
    let mut entities = Vec::new();
    for item in raw {
        let mut entity = match item {
            Value::String(s) => {
                let mut m = Map::new();
                m.insert("name".to_string(), Value::String(s));
                m
            }
            Value::Object(m) => m,
            _ => continue,
        };
        force_type_member(&mut entity, "Person");
        if !entity.contains_key("name") {
            continue;
        }
        if let Some(name) = entity.get("name").cloned() {
            if let Normalized::Value(v) = normalize_term("name", &name, lang, dir, diagnostics) {
                entity.insert("name".to_string(), v);
            }
        }
        entities.push(Value::Object(entity));
    }
    if entities.len() != total {
        diagnostics.push_validation("Entity missing required property 'name'.");
    }
    Normalized::Value(Value::Array(entities))
}

fn normalize_l10n_strings(value: &Value, lang: &str, dir: &str) -> Normalized {
    let raw: Vec<Value> = match value {
        Value::String(s) => vec![json!({ "value": s })],
        Value::Array(items) => items.clone(),
        _ => return Normalized::Invalid,
    };

    let mut strings = Vec::new();
    for item in raw {
        let mut string = match item {
            Value::String(s) => {
                let mut m = Map::new();
                m.insert("value".to_string(), Value::String(s));
                m
            }
            Value::Object(m) => m,
            _ => continue,
        };
        fill_or_strip(&mut string, "language", lang);
        fill_or_strip(&mut string, "direction", dir);
        strings.push(Value::Object(string));
    }
    Normalized::Value(Value::Array(strings))
}

// Default-fill `key` from the document global, then strip it again when the
// result is the empty string.
fn fill_or_strip(string: &mut Map<String, Value>, key: &str, global: &str) {
    if !string.contains_key(key) {
        string.insert(key.to_string(), Value::String(global.to_string()));
    }
    if string.get(key).and_then(Value::as_str) == Some("") {
        string.remove(key);
    }
}

fn normalize_linked_resources(
    value: &Value,
    lang: &str,
    dir: &str,
    diagnostics: &mut Diagnostics,
) -> Normalized {
    let raw: Vec<Value> = match value {
        Value::String(s) => vec![json!({ "url": s })],
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![value.clone()],
        _ => return Normalized::Invalid,
    };

    let mut resources = Vec::new();
    for item in raw {
        let mut resource = match item {
            Value::String(s) => {
                let mut m = Map::new();
                m.insert("url".to_string(), Value::String(s));
                m
            }
            Value::Object(m) => m,
            _ => continue,
        };
        force_type_member(&mut resource, "LinkedResource");
        // snapshot the authored URL in case a relative value is wanted later
        if !resource.contains_key("originalUrl") {
            if let Some(url) = resource.get("url").cloned() {
                resource.insert("originalUrl".to_string(), url);
            }
        }
        let keys: Vec<String> = resource.keys().cloned().collect();
        for key in keys {
            let sub = resource.get(&key).cloned().unwrap_or(Value::Null);
            if let Normalized::Value(v) = normalize_term(&key, &sub, lang, dir, diagnostics) {
                resource.insert(key, v);
            }
        }
        resources.push(Value::Object(resource));
    }
    Normalized::Value(Value::Array(resources))
}

// Coerce `type` to an array that contains `member`.
fn force_type_member(object: &mut Map<String, Value>, member: &str) {
    let types = match object.get("type") {
        None => vec![Value::String(member.to_string())],
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            if !items.iter().any(|t| t.as_str() == Some(member)) {
                items.push(Value::String(member.to_string()));
            }
            items
        }
        Some(scalar) => {
            let mut items = vec![scalar.clone()];
            if scalar.as_str() != Some(member) {
                items.push(Value::String(member.to_string()));
            }
            items
        }
    };
    object.insert("type".to_string(), Value::Array(types));
}
