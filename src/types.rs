//! Typed manifest data model.
//!
//! The pipeline stages operate on a `serde_json` tree; once processing has
//! finished, [`ProcessedManifest`] extracts typed views over the canonical
//! document while keeping the full tree available for serialization.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A string value paired with language/direction metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizableString {
    /// The display text.
    pub value: String,
    /// BCP-47 language tag, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Base text direction, `"ltr"` or `"rtl"`, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl LocalizableString {
    /// Create a plain localizable string with no language metadata.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            direction: None,
        }
    }
}

/// A contributor entity (author, narrator, publisher, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    /// Entity name; nonempty after normalization.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<LocalizableString>,
    /// Entity types; always contains `"Person"`.
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    /// Pass-through properties outside the modeled set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A URL-bearing entry of `readingOrder`, `resources`, or `links`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkedResource {
    /// Resolved absolute URL.
    pub url: String,
    /// URL as authored, before resolution against the base.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    /// Resource types; always contains `"LinkedResource"`.
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    /// Link relations, lowercased.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rel: Vec<String>,
    /// MIME type, declared or sniffed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    /// ISO-8601 duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<LocalizableString>,
    /// Pass-through properties outside the modeled set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LinkedResource {
    /// Whether `rel` contains the given token.
    pub fn has_rel(&self, token: &str) -> bool {
        self.rel.iter().any(|r| r == token)
    }
}

/// A flat table-of-contents entry synthesized from the reading order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// Display name, when the reading-order item carries one.
    pub name: Option<String>,
    /// Resolved absolute URL.
    pub url: String,
}

/// Table of contents returned by `Manifest::get_toc`.
#[derive(Clone, Debug, PartialEq)]
pub enum Toc {
    /// The detected HTML TOC resource.
    Html(LinkedResource),
    /// A flat list synthesized from the reading order.
    Flat(Vec<TocEntry>),
}

/// The canonical processed document plus typed views over it.
///
/// Constructed once per load; immutable afterwards. The full JSON tree is
/// retained so the document can be serialized back out in canonical shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessedManifest {
    base: String,
    lang: String,
    dir: String,
    profile: String,
    reading_order: Vec<LinkedResource>,
    resources: Vec<LinkedResource>,
    links: Vec<LinkedResource>,
    unique_resources: Vec<String>,
    name: Vec<LocalizableString>,
    toc: bool,
    tree: Map<String, Value>,
}

impl ProcessedManifest {
    /// Build the typed views over a finished canonical tree.
    ///
    /// Extraction is lenient: an entry that does not fit its modeled type is
    /// skipped rather than failing the whole document. The pipeline only
    /// hands over trees that already passed the global data re-check, so in
    /// practice nothing is skipped.
    pub(crate) fn from_tree(tree: Map<String, Value>) -> Self {
        Self {
            base: string_term(&tree, "base"),
            lang: string_term(&tree, "lang"),
            dir: string_term(&tree, "dir"),
            profile: string_term(&tree, "profile"),
            reading_order: list_term(&tree, "readingOrder"),
            resources: list_term(&tree, "resources"),
            links: list_term(&tree, "links"),
            unique_resources: list_term(&tree, "uniqueResources"),
            name: list_term(&tree, "name"),
            toc: tree.get("toc").and_then(Value::as_bool).unwrap_or(false),
            tree,
        }
    }

    /// Base URL every relative reference was resolved against.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Global document language; empty when none was declared or defaulted.
    pub fn language(&self) -> &str {
        &self.lang
    }

    /// Global base direction; empty when none was declared or defaulted.
    pub fn direction(&self) -> &str {
        &self.dir
    }

    /// URI of the resolved profile.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Primary content resources, in reading order.
    pub fn reading_order(&self) -> &[LinkedResource] {
        &self.reading_order
    }

    /// Secondary resources bound to the publication.
    pub fn resources(&self) -> &[LinkedResource] {
        &self.resources
    }

    /// Outbound links that are not bound resources.
    pub fn links(&self) -> &[LinkedResource] {
        &self.links
    }

    /// Deduplicated origin+path of every reading-order and resource URL.
    pub fn unique_resources(&self) -> &[String] {
        &self.unique_resources
    }

    /// Publication title.
    pub fn name(&self) -> &[LocalizableString] {
        &self.name
    }

    /// Whether extended processing detected an HTML table of contents.
    pub fn toc_detected(&self) -> bool {
        self.toc
    }

    /// Raw value of any term in the canonical document.
    pub fn term(&self, term: &str) -> Option<&Value> {
        self.tree.get(term)
    }

    /// Entities under an entity-shaped term such as `author` or `readBy`.
    pub fn entities(&self, term: &str) -> Vec<Entity> {
        list_term(&self.tree, term)
    }

    /// The full canonical document as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.tree.clone())
    }

    /// Whether the document holds nothing beyond the base.
    pub fn is_empty(&self) -> bool {
        self.tree.keys().all(|k| k == "base")
    }
}

fn string_term(tree: &Map<String, Value>, term: &str) -> String {
    tree.get(term)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn list_term<T: DeserializeOwned>(tree: &Map<String, Value>, term: &str) -> Vec<T> {
    tree.get(term)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
