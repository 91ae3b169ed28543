//! One-shot manifest processing pipeline.
//!
//! Drives the stages in order for a single load: preflight, profile
//! resolution, normalization, the global data re-check, URL resolution,
//! cross-field validation, document-URL reconciliation, and extended TOC
//! detection. No stage is re-entered; each takes the previous stage's tree.

use serde_json::{json, Map, Value};

use crate::audiobook;
use crate::error::Diagnostics;
use crate::fetch::{Fetcher, HtmlParser};
use crate::global_check;
use crate::manifest::Defaults;
use crate::normalize;
use crate::preflight;
use crate::profile::{self, ProfileDescriptor};
use crate::terms::AUDIOBOOKS_PROFILE;
use crate::urls;
use crate::validate;

/// Pipeline driver for a single manifest load.
pub struct ManifestProcessor<'a, F, H> {
    fetcher: &'a F,
    html: &'a H,
    supported_profiles: &'a [ProfileDescriptor],
    defaults: &'a Defaults,
}

impl<'a, F: Fetcher, H: HtmlParser> ManifestProcessor<'a, F, H> {
    /// Create a processor over the caller's collaborators and configuration.
    pub fn new(
        fetcher: &'a F,
        html: &'a H,
        supported_profiles: &'a [ProfileDescriptor],
        defaults: &'a Defaults,
    ) -> Self {
        Self {
            fetcher,
            html,
            supported_profiles,
            defaults,
        }
    }

    /// Run the full pipeline over `json`.
    ///
    /// `html_url` is the URL of the HTML document the manifest was reached
    /// through, or empty when it was loaded directly. Returns the canonical
    /// tree together with every diagnostic of this load; fatal conditions
    /// leave the tree in its last-known-good partial state.
    pub async fn run(
        &self,
        json: Value,
        base: &str,
        guess_profile: bool,
        html_url: &str,
    ) -> (Map<String, Value>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut processed = Map::new();
        processed.insert("base".to_string(), Value::String(base.to_string()));

        let json = match json {
            Value::Object(map) => map,
            _ => {
                diagnostics.push_fatal("Manifest is not a JSON object");
                return (processed, diagnostics);
            }
        };

        if let Err(message) = preflight::check_context(&json) {
            diagnostics.push_fatal(message);
            return (processed, diagnostics);
        }
        let mut reading_order = preflight::preliminary_reading_order(&json);

        match profile::resolve_profile(
            &json,
            &mut reading_order,
            self.supported_profiles,
            guess_profile,
            self.defaults.profile.as_deref(),
            base,
            self.fetcher,
            &mut diagnostics,
        )
        .await
        {
            Ok(id) => {
                processed.insert("profile".to_string(), Value::String(id));
            }
            Err(message) => {
                diagnostics.push_fatal(message);
                return (processed, diagnostics);
            }
        }

        let (lang, dir) = preflight::global_lang_and_dir(
            &json,
            &self.defaults.lang,
            &self.defaults.dir,
            &mut diagnostics,
        );
        processed.insert("lang".to_string(), Value::String(lang.clone()));
        processed.insert("dir".to_string(), Value::String(dir.clone()));

        // the reading order is partially normalized already; pick up from there
        let mut merged = json;
        merged.insert("readingOrder".to_string(), Value::Array(reading_order));
        if !merged.contains_key("name") {
            merged.insert("name".to_string(), Value::String(String::new()));
        }

        let normalized = normalize::normalize_tree(&merged, &lang, &dir, &mut diagnostics);
        for (term, value) in normalized {
            processed.insert(term, value);
        }

        self.apply_default_title(&mut processed, &mut diagnostics);

        let mut tree = global_check::check_tree(processed, &mut diagnostics);
        tree = urls::validate_and_renormalize(tree, base, &mut diagnostics);
        tree = validate::data_validation(tree, &mut diagnostics);

        self.check_document_url(&mut tree, html_url, &mut diagnostics);

        if tree.get("profile").and_then(Value::as_str) == Some(AUDIOBOOKS_PROFILE) {
            if let Err(message) = audiobook::process_toc(
                &mut tree,
                self.defaults.toc,
                self.fetcher,
                self.html,
                &mut diagnostics,
            )
            .await
            {
                diagnostics.push_fatal(message);
            }
        }

        (tree, diagnostics)
    }

    // A manifest without a usable title gets the caller default, else a
    // placeholder plus a diagnostic.
    fn apply_default_title(&self, processed: &mut Map<String, Value>, diagnostics: &mut Diagnostics) {
        let title_empty = processed
            .get("name")
            .and_then(Value::as_array)
            .and_then(|names| names.first())
            .and_then(|name| name.get("value"))
            .and_then(Value::as_str)
            .map(str::is_empty)
            .unwrap_or(false);
        if !title_empty {
            return;
        }
        let replacement = if !self.defaults.title.is_empty() {
            self.defaults.title.clone()
        } else {
            diagnostics.push_validation("No default title found");
            "Publication".to_string()
        };
        if let Some(first) = processed
            .get_mut("name")
            .and_then(Value::as_array_mut)
            .and_then(|names| names.first_mut())
            .and_then(Value::as_object_mut)
        {
            first.insert("value".to_string(), Value::String(replacement));
        }
    }

    // An empty reading order falls back to the HTML document the manifest
    // came from; without one the publication has nothing to present.
    fn check_document_url(
        &self,
        tree: &mut Map<String, Value>,
        html_url: &str,
        diagnostics: &mut Diagnostics,
    ) {
        if !tree.contains_key("readingOrder") {
            tree.insert("readingOrder".to_string(), json!([]));
        }
        let is_empty = tree
            .get("readingOrder")
            .and_then(Value::as_array)
            .map(|items| items.is_empty())
            .unwrap_or(true);

        if is_empty {
            if html_url.is_empty() {
                diagnostics.push_fatal("No reading order items available.");
                return;
            }
            let mut entry = Map::new();
            entry.insert("url".to_string(), Value::String(html_url.to_string()));
            entry.insert("originalUrl".to_string(), Value::String(html_url.to_string()));
            entry.insert("type".to_string(), json!(["LinkedResource"]));
            if self.defaults.toc {
                entry.insert("rel".to_string(), json!(["contents"]));
            }
            if let Some(Value::Array(items)) = tree.get_mut("readingOrder") {
                items.push(Value::Object(entry));
            }
            let resolved = urls::origin_and_path(html_url, None)
                .unwrap_or_else(|| html_url.to_string());
            match tree.get_mut("uniqueResources") {
                Some(Value::Array(unique)) => unique.push(Value::String(resolved)),
                _ => {
                    tree.insert("uniqueResources".to_string(), json!([resolved]));
                }
            }
        } else if !html_url.is_empty() {
            let listed = tree
                .get("uniqueResources")
                .and_then(Value::as_array)
                .map(|unique| {
                    let resolved = urls::origin_and_path(html_url, None)
                        .unwrap_or_else(|| html_url.to_string());
                    unique.iter().any(|u| u.as_str() == Some(resolved.as_str()))
                })
                .unwrap_or(false);
            if !listed {
                diagnostics.push_validation(
                    "Document URL must be included as a reading order entry or resource entry.",
                );
            }
        }
    }
}
