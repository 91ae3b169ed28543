//! URL resolution and re-normalization.
//!
//! Walks the whole normalized tree, resolving every URL-term string against
//! the document base. A value that fails to resolve is deleted rather than
//! defaulted, and linked resources that end up with no URL at all are
//! removed from their containing arrays.

use serde_json::{Map, Value};
use url::Url;

use crate::error::Diagnostics;
use crate::terms;

/// Resolve `value` against `base`, keeping any fragment intact.
///
/// Absolute values are taken as-is; relative values need a parseable base.
pub fn resolve(value: &str, base: Option<&Url>) -> Option<String> {
    if let Ok(absolute) = Url::parse(value) {
        return Some(absolute.into());
    }
    base.and_then(|b| b.join(value).ok()).map(Into::into)
}

/// Origin plus path of a resolved URL, with fragment and query stripped.
pub(crate) fn origin_and_path(value: &str, base: Option<&Url>) -> Option<String> {
    let url = match Url::parse(value) {
        Ok(url) => url,
        Err(_) => base?.join(value).ok()?,
    };
    Some(format!("{}{}", url.origin().ascii_serialization(), url.path()))
}

/// Resolve every URL-typed field of the tree against `base` and drop linked
/// resources whose URL did not survive.
pub fn validate_and_renormalize(
    tree: Map<String, Value>,
    base: &str,
    diagnostics: &mut Diagnostics,
) -> Map<String, Value> {
    let base_url = Url::parse(base).ok();
    let mut tree = scan_object(tree, base_url.as_ref(), diagnostics);

    for key in ["links", "readingOrder", "resources"] {
        if let Some(Value::Array(items)) = tree.get_mut(key) {
            let before = items.len();
            items.retain(|item| item.get("url").is_some());
            if items.len() != before {
                diagnostics.push_validation("LinkedResource removed");
            }
        }
    }
    tree
}

fn scan_object(
    object: Map<String, Value>,
    base: Option<&Url>,
    diagnostics: &mut Diagnostics,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in object {
        match value {
            Value::String(s) if terms::is_url_term(&key) => match resolve(&s, base) {
                Some(resolved) => {
                    out.insert(key, Value::String(resolved));
                }
                None => diagnostics.push_validation(format!("Invalid URL {s}")),
            },
            Value::Array(items) => {
                let mapped: Vec<Value> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) if terms::is_url_term(&key) => match resolve(&s, base) {
                            Some(resolved) => Some(Value::String(resolved)),
                            None => {
                                diagnostics.push_validation(format!("Invalid URL {s}"));
                                None
                            }
                        },
                        Value::Object(nested) => {
                            Some(Value::Object(scan_object(nested, base, diagnostics)))
                        }
                        other => Some(other),
                    })
                    .collect();
                out.insert(key, Value::Array(mapped));
            }
            Value::Object(nested) => {
                out.insert(key, Value::Object(scan_object(nested, base, diagnostics)));
            }
            other => {
                out.insert(key, other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://example.com/book/manifest.json";

    fn run(tree: Value) -> (Map<String, Value>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let out = validate_and_renormalize(
            tree.as_object().unwrap().clone(),
            BASE,
            &mut diagnostics,
        );
        (out, diagnostics)
    }

    #[test]
    fn relative_urls_resolve_against_base() {
        let (out, diagnostics) = run(json!({
            "readingOrder": [{"url": "c1.mp3", "originalUrl": "c1.mp3"}]
        }));
        assert_eq!(
            out["readingOrder"][0]["url"],
            json!("https://example.com/book/c1.mp3")
        );
        // the authored URL is not a URL term, so it stays put
        assert_eq!(out["readingOrder"][0]["originalUrl"], json!("c1.mp3"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fragments_are_preserved() {
        let (out, _) = run(json!({"resources": [{"url": "toc.html#part2"}]}));
        assert_eq!(
            out["resources"][0]["url"],
            json!("https://example.com/book/toc.html#part2")
        );
    }

    #[test]
    fn top_level_url_arrays_resolve_element_wise() {
        let (out, _) = run(json!({"url": ["a.html", "https://other.example/b.html"]}));
        assert_eq!(
            out["url"],
            json!(["https://example.com/book/a.html", "https://other.example/b.html"])
        );
    }

    #[test]
    fn entries_losing_their_url_are_removed() {
        let mut diagnostics = Diagnostics::new();
        let tree = json!({
            "readingOrder": [{"url": "c1.mp3"}, {"name": [{"value": "no url"}]}]
        });
        let out = validate_and_renormalize(
            tree.as_object().unwrap().clone(),
            BASE,
            &mut diagnostics,
        );
        assert_eq!(out["readingOrder"].as_array().unwrap().len(), 1);
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.message == "LinkedResource removed"));
    }

    #[test]
    fn unresolvable_url_is_dropped_with_diagnostic() {
        let mut diagnostics = Diagnostics::new();
        let tree = json!({"readingOrder": [{"url": "c1.mp3"}]});
        // an empty base cannot resolve a relative reference
        let out = validate_and_renormalize(
            tree.as_object().unwrap().clone(),
            "",
            &mut diagnostics,
        );
        assert!(out["readingOrder"].as_array().unwrap().is_empty());
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| d.message == "Invalid URL c1.mp3"));
    }

    #[test]
    fn origin_and_path_strips_fragment() {
        let base = Url::parse(BASE).ok();
        assert_eq!(
            origin_and_path("c1.mp3#t=30", base.as_ref()).unwrap(),
            "https://example.com/book/c1.mp3"
        );
    }
}
