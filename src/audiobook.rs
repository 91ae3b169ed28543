//! Extended processing for the audiobooks profile.
//!
//! Layers additional required-property and structural checks on top of the
//! generic rules, and detects whether the publication carries an HTML table
//! of contents.

use serde_json::{json, Map, Value};

use crate::error::Diagnostics;
use crate::fetch::{Fetcher, HtmlDocument, HtmlParser};
use crate::formats::parse_duration_seconds;
use crate::terms::{is_audio_format, AUDIO_REQUIRED_PROPERTIES};
use crate::validate::has_rel;

/// Audiobook data validation.
///
/// On a fatal condition the partially mutated tree is handed back together
/// with the message, so that earlier mutations (such as the non-audio
/// filter) survive exactly as far as they got.
pub fn data_validation(
    mut tree: Map<String, Value>,
    diagnostics: &mut Diagnostics,
) -> Result<Map<String, Value>, (Map<String, Value>, String)> {
    if !tree.contains_key("readingOrder") {
        return Err((tree, "Missing property \"readingOrder\"".to_string()));
    }

    // only audio items belong to an audiobook reading order
    if let Some(Value::Array(items)) = tree.get("readingOrder") {
        let audio: Vec<Value> = items
            .iter()
            .filter(|item| {
                item.get("encodingFormat")
                    .and_then(Value::as_str)
                    .map(is_audio_format)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if audio.len() != items.len() {
            diagnostics.push_validation("Non-audio reading order items encountered");
            tree.insert("readingOrder".to_string(), Value::Array(audio));
        }
    }
    let no_audio_items = tree
        .get("readingOrder")
        .and_then(Value::as_array)
        .map(|items| items.is_empty())
        .unwrap_or(true);
    if no_audio_items {
        return Err((tree, "No audio reading order items available.".to_string()));
    }

    let needs_type = match tree.get("type") {
        None => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if needs_type {
        diagnostics.push_validation("Missing property \"type\"");
        tree.insert("type".to_string(), json!(["Audiobook"]));
    }

    for property in AUDIO_REQUIRED_PROPERTIES {
        if !tree.contains_key(*property) {
            diagnostics.push_validation(format!("Missing property \"{property}\""));
        }
    }

    let has_cover = tree
        .get("resources")
        .and_then(Value::as_array)
        .map(|resources| resources.iter().any(|r| has_rel(r, "cover")))
        .unwrap_or(false);
    if !has_cover {
        diagnostics.push_validation("Missing \"cover\" resource");
    }

    if let Some(Value::Array(items)) = tree.get("readingOrder") {
        for item in items {
            if item.get("duration").is_none() {
                let url = item.get("url").and_then(Value::as_str).unwrap_or_default();
                diagnostics
                    .push_validation(format!("Reading order item {url} missing property \"duration\""));
            }
        }
    }

    match tree.get("duration") {
        None => diagnostics.push_validation("Missing property \"duration\""),
        Some(declared) => {
            let declared_seconds = declared
                .as_str()
                .and_then(parse_duration_seconds)
                .unwrap_or(0.0);
            let total_seconds: f64 = tree
                .get("readingOrder")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("duration"))
                        .map(|d| d.as_str().and_then(parse_duration_seconds).unwrap_or(0.0))
                        .sum()
                })
                .unwrap_or(0.0);
            if total_seconds != declared_seconds {
                diagnostics.push_validation("Incorrect value for top-level property \"duration\"");
            }
        }
    }

    Ok(tree)
}

/// Detect an HTML table of contents.
///
/// When a `resources` entry carries `rel=contents`, the document is fetched
/// and asked whether it contains an element marked `role=doc-toc`. The
/// outcome is recorded as the `toc` flag; a missing TOC is flagged unless
/// the caller's defaults permit treating the primary document as the TOC.
/// The returned error message becomes a fatal diagnostic.
pub async fn process_toc<F: Fetcher, H: HtmlParser>(
    tree: &mut Map<String, Value>,
    default_toc: bool,
    fetcher: &F,
    html: &H,
    diagnostics: &mut Diagnostics,
) -> Result<(), String> {
    tree.insert("toc".to_string(), Value::Bool(false));

    let contents_url = tree
        .get("resources")
        .and_then(Value::as_array)
        .and_then(|resources| resources.iter().find(|r| has_rel(r, "contents")))
        .and_then(|r| r.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(url) = contents_url {
        let bytes = fetcher
            .fetch(&url)
            .await
            .map_err(|err| format!("Could not fetch {url}: {err}"))?;
        let document = html.parse(&bytes);
        tree.insert("toc".to_string(), Value::Bool(document.has_doc_toc()));
    }

    let detected = tree.get("toc").and_then(Value::as_bool).unwrap_or(false);
    if !detected {
        if default_toc {
            tree.insert("toc".to_string(), Value::Bool(true));
        } else {
            diagnostics.push_validation("No HTML table of contents found");
        }
    }
    Ok(())
}
