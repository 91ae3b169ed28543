//! Cross-field validation over the normalized, URL-resolved tree.
//!
//! Sixteen ordered checks: none of them is fatal of itself, and all of their
//! diagnostics accumulate. Profile-specific extended validation is dispatched
//! from here so that a thrown extended check becomes a fatal diagnostic
//! without aborting the remaining independent checks.

use serde_json::{json, Map, Value};
use url::Url;

use crate::audiobook;
use crate::error::Diagnostics;
use crate::formats::{is_valid_date, is_valid_duration, is_valid_language_tag};
use crate::terms::{is_image_format, AUDIOBOOKS_PROFILE};
use crate::urls::origin_and_path;

/// Whether a linked-resource value's `rel` array contains `token`.
pub(crate) fn has_rel(item: &Value, token: &str) -> bool {
    item.get("rel")
        .and_then(Value::as_array)
        .map(|rels| rels.iter().any(|rel| rel.as_str() == Some(token)))
        .unwrap_or(false)
}

/// Run every cross-field check over the tree, in order.
pub fn data_validation(
    mut tree: Map<String, Value>,
    diagnostics: &mut Diagnostics,
) -> Map<String, Value> {
    // 1. rel tokens are matched lowercase everywhere
    for key in ["links", "readingOrder", "resources"] {
        lower_case_rel(tree.get_mut(key));
    }

    // 2. profile-specific extended validation
    if tree.get("profile").and_then(Value::as_str) == Some(AUDIOBOOKS_PROFILE) {
        match audiobook::data_validation(tree, diagnostics) {
            Ok(validated) => tree = validated,
            Err((partial, message)) => {
                tree = partial;
                diagnostics.push_fatal(message);
            }
        }
    }

    // 3. default type
    let needs_type = match tree.get("type") {
        None => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if needs_type {
        diagnostics.push_validation("No type");
        tree.insert("type".to_string(), json!(["CreativeWork"]));
    }

    // 4. accessModeSufficient must be an array of ItemList objects
    if let Some(value) = tree.get("accessModeSufficient") {
        match value {
            Value::Array(items) => {
                let kept: Vec<Value> = items
                    .iter()
                    .filter(|item| {
                        let is_item_list =
                            item.get("type").and_then(Value::as_str) == Some("ItemList");
                        if !is_item_list {
                            diagnostics.push_validation(
                                "accessModeSufficient requires an array of ItemList objects",
                            );
                        }
                        is_item_list
                    })
                    .cloned()
                    .collect();
                tree.insert("accessModeSufficient".to_string(), Value::Array(kept));
            }
            _ => {
                diagnostics.push_validation("Array expected for accessModeSufficient");
                tree.remove("accessModeSufficient");
            }
        }
    }

    // 5. id is flagged when absent or empty, never removed
    let id_missing = match tree.get("id") {
        None => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if id_missing {
        diagnostics.push_validation("ID not set");
    }

    // 6. duration and date literals
    if let Some(value) = tree.get("duration") {
        if !value.as_str().map(is_valid_duration).unwrap_or(false) {
            diagnostics.push_validation("Invalid value for property \"duration\"");
            tree.remove("duration");
        }
    }
    for term in ["dateModified", "datePublished"] {
        if let Some(value) = tree.get(term) {
            if !value.as_str().map(is_valid_date).unwrap_or(false) {
                diagnostics.push_validation(format!("Invalid value for property \"{term}\""));
                tree.remove(term);
            }
        }
    }

    // 7. inLanguage keeps only well-formed tags
    if let Some(Value::Array(tags)) = tree.get("inLanguage") {
        let mut kept = Vec::new();
        for tag in tags {
            let valid = tag.as_str().map(is_valid_language_tag).unwrap_or(false);
            if valid {
                kept.push(tag.clone());
            } else {
                diagnostics
                    .push_validation(format!("Invalid language tag *{}*", render_scalar(tag)));
            }
        }
        tree.insert("inLanguage".to_string(), Value::Array(kept));
    }

    // 8. readingProgression defaults to ltr
    match tree.get("readingProgression") {
        None => {
            tree.insert("readingProgression".to_string(), json!("ltr"));
        }
        Some(value) => {
            if !matches!(value.as_str(), Some("ltr") | Some("rtl")) {
                diagnostics.push_validation(format!(
                    "Invalid value for property \"readingProgression\" *{}*",
                    render_scalar(value)
                ));
                tree.insert("readingProgression".to_string(), json!("ltr"));
            }
        }
    }

    let base_url = tree
        .get("base")
        .and_then(Value::as_str)
        .and_then(|base| Url::parse(base).ok());

    // 9. uniqueResources: deduplicated origin+path over readingOrder ∪ resources
    let mut unique: Vec<String> = Vec::new();
    for key in ["readingOrder", "resources"] {
        for url in item_urls(tree.get(key), base_url.as_ref()) {
            if !unique.contains(&url) {
                unique.push(url);
            }
        }
    }
    tree.insert("uniqueResources".to_string(), json!(unique));

    // 10. links must not duplicate bound resources or carry reserved rels
    if let Some(Value::Array(items)) = tree.get("links") {
        let mut kept = Vec::new();
        for item in items.clone() {
            let url = item.get("url").and_then(Value::as_str).unwrap_or_default();
            let rel_missing = item
                .get("rel")
                .and_then(Value::as_array)
                .map(|rels| rels.is_empty())
                .unwrap_or(true);
            if rel_missing {
                diagnostics.push_validation(format!("Link missing property \"rel\" *{url}*"));
            }
            if let Some(resolved) = origin_and_path(url, base_url.as_ref()) {
                if unique.contains(&resolved) {
                    diagnostics.push_validation(format!(
                        "URL {url} appears in bounds; removed from \"links\"."
                    ));
                    continue;
                }
            }
            if has_rel(&item, "contents") || has_rel(&item, "pagelist") || has_rel(&item, "cover") {
                diagnostics.push_validation(
                    "Invalid value for property \"rel\" in \"links\" (cannot be \"cover\", \"contents\", or \"pagelist\").",
                );
                continue;
            }
            kept.push(item);
        }
        tree.insert("links".to_string(), Value::Array(kept));
    }

    // 11. duplicate URLs within readingOrder and within resources
    for (key, message) in [
        ("readingOrder", "Reading order contains duplicate URLs"),
        ("resources", "Resources contain duplicate URLs"),
    ] {
        let urls = item_urls(tree.get(key), base_url.as_ref());
        let mut deduplicated = urls.clone();
        deduplicated.sort();
        deduplicated.dedup();
        if deduplicated.len() != urls.len() {
            diagnostics.push_validation(message);
        }
    }

    // 12/13. at most one contents/pagelist/cover resource; image covers are named
    {
        let empty = Vec::new();
        let combined: Vec<&Value> = tree
            .get("readingOrder")
            .and_then(Value::as_array)
            .unwrap_or(&empty)
            .iter()
            .chain(
                tree.get("resources")
                    .and_then(Value::as_array)
                    .unwrap_or(&empty)
                    .iter(),
            )
            .collect();
        for (token, message) in [
            ("contents", "Multiple resources with rel=contents"),
            ("pagelist", "Multiple resources with rel=pagelist"),
            ("cover", "Multiple resources with rel=cover"),
        ] {
            if combined.iter().filter(|item| has_rel(item, token)).count() > 1 {
                diagnostics.push_validation(message);
            }
        }
        for item in &combined {
            let is_image = item
                .get("encodingFormat")
                .and_then(Value::as_str)
                .map(is_image_format)
                .unwrap_or(false);
            if has_rel(item, "cover") && is_image && item.get("name").is_none() {
                diagnostics.push_validation("All image covers must have a \"name\" property");
            }
        }
    }

    // 14. entry-scoped duration re-validation
    for key in ["readingOrder", "links", "resources"] {
        if let Some(Value::Array(items)) = tree.get_mut(key) {
            for item in items.iter_mut() {
                let Some(duration) = item.get("duration") else {
                    continue;
                };
                if duration.as_str().map(is_valid_duration).unwrap_or(false) {
                    continue;
                }
                let rendered = render_scalar(duration);
                let url = item.get("url").and_then(Value::as_str).unwrap_or_default();
                diagnostics.push_validation(format!(
                    "Linked resource item {url} has invalid value for property \"duration\" *{rendered}*"
                ));
                if let Some(object) = item.as_object_mut() {
                    object.remove("duration");
                }
            }
        }
    }

    // 15. an array that normalized to nothing is removed, not kept as []
    tree.retain(|_, value| remove_empty_arrays(value));

    // 16. final consistency pass
    crate::global_check::check_tree(tree, diagnostics)
}

fn lower_case_rel(value: Option<&mut Value>) {
    let Some(Value::Array(items)) = value else {
        return;
    };
    for item in items {
        if let Some(Value::Array(rels)) = item.get_mut("rel") {
            for rel in rels {
                if let Value::String(token) = rel {
                    *token = token.to_lowercase();
                }
            }
        }
    }
}

fn item_urls(value: Option<&Value>, base: Option<&Url>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("url").and_then(Value::as_str))
                .filter_map(|url| origin_and_path(url, base))
                .collect()
        })
        .unwrap_or_default()
}

// Recursively drop empty arrays; returns false when `value` itself is one
// and should be removed by its parent.
fn remove_empty_arrays(value: &mut Value) -> bool {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return false;
            }
            items.retain_mut(remove_empty_arrays);
            !items.is_empty()
        }
        Value::Object(object) => {
            object.retain(|_, nested| remove_empty_arrays(nested));
            true
        }
        _ => true,
    }
}

fn render_scalar(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
