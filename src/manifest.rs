//! Read-only manifest façade and load entry points.
//!
//! [`Manifest`] wraps the pipeline behind the two entry points the original
//! vocabulary defines, `load_url` and `load_json`, and offers cursor-based
//! navigation over the finished reading order. Nothing here ever fails past
//! the boundary: both entry points record every problem as a diagnostic and
//! leave whatever partial data was assembled available for inspection.
//!
//! ```rust,no_run
//! use pubmanifest::{Manifest, ProfileDescriptor, AUDIOBOOKS_PROFILE};
//! use pubmanifest::fetch::{FetchError, Fetcher, HtmlDocument, HtmlParser};
//!
//! # struct MyFetcher;
//! # #[async_trait::async_trait]
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> { Ok(Vec::new()) }
//! #     async fn content_type(&self, _url: &str) -> String { String::new() }
//! # }
//! # struct MyDoc;
//! # impl HtmlDocument for MyDoc {
//! #     fn title(&self) -> Option<String> { None }
//! #     fn language(&self) -> Option<String> { None }
//! #     fn direction(&self) -> Option<String> { None }
//! #     fn has_doc_toc(&self) -> bool { false }
//! #     fn publication_link(&self) -> Option<String> { None }
//! #     fn base_href(&self) -> Option<String> { None }
//! #     fn element_text(&self, _id: &str) -> Option<String> { None }
//! # }
//! # struct MyParser;
//! # impl HtmlParser for MyParser {
//! #     type Document = MyDoc;
//! #     fn parse(&self, _bytes: &[u8]) -> MyDoc { MyDoc }
//! # }
//! # async fn example() {
//! let mut manifest = Manifest::new(MyFetcher, MyParser);
//! manifest.set_supported_profiles(vec![ProfileDescriptor::new(
//!     AUDIOBOOKS_PROFILE,
//!     vec!["audio/mpeg".to_string()],
//! )]);
//! manifest.load_url("https://example.com/manifest.json", true).await;
//! if manifest.fatal_errors().is_empty() {
//!     println!("{:?}", manifest.get_title(""));
//! }
//! # }
//! ```

use serde_json::Value;
use url::Url;

use crate::error::{Diagnostic, Diagnostics};
use crate::fetch::{Fetcher, HtmlDocument, HtmlParser};
use crate::processor::ManifestProcessor;
use crate::profile::ProfileDescriptor;
use crate::types::{LinkedResource, LocalizableString, ProcessedManifest, Toc, TocEntry};
use crate::urls;

/// Caller-supplied default values applied when the document leaves gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Defaults {
    /// Fallback global language (BCP-47).
    pub lang: String,
    /// Fallback global base direction.
    pub dir: String,
    /// Fallback title when the document has none.
    pub title: String,
    /// Whether the primary document may stand in for a missing TOC.
    pub toc: bool,
    /// Profile to assume when no conformance statement matches.
    pub profile: Option<String>,
}

/// Processed publication manifest with cursor-based navigation.
pub struct Manifest<F, H> {
    fetcher: F,
    html: H,
    supported_profiles: Vec<ProfileDescriptor>,
    defaults: Defaults,
    data: ProcessedManifest,
    diagnostics: Diagnostics,
    reading_order_index: usize,
}

impl<F: Fetcher, H: HtmlParser> Manifest<F, H> {
    /// Create an empty manifest handle over the given collaborators.
    pub fn new(fetcher: F, html: H) -> Self {
        Self {
            fetcher,
            html,
            supported_profiles: Vec::new(),
            defaults: Defaults::default(),
            data: ProcessedManifest::default(),
            diagnostics: Diagnostics::new(),
            reading_order_index: 0,
        }
    }

    /// Set the profiles this consumer supports.
    pub fn set_supported_profiles(&mut self, profiles: Vec<ProfileDescriptor>) {
        self.supported_profiles = profiles;
    }

    /// Set default values applied when the document leaves gaps.
    pub fn set_defaults(&mut self, defaults: Defaults) {
        self.defaults = defaults;
    }

    /// The processed canonical document.
    pub fn data(&self) -> &ProcessedManifest {
        &self.data
    }

    /// Every diagnostic accumulated so far, in order.
    pub fn errors(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    /// Fatal diagnostics only. Check this before trusting any field.
    pub fn fatal_errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics.fatal_entries().collect()
    }

    /// Load a manifest from a URL, following the HTML path when the target
    /// turns out to be an HTML document with a publication link.
    pub async fn load_url(&mut self, url: &str, guess_profile: bool) {
        log::debug!("loading manifest {}", url);
        let content_type = self.fetcher.content_type(url).await;
        let mut base = url.to_string();
        let mut html_url = String::new();

        let json: Value = if content_type == "text/html" {
            html_url = url.to_string();
            let bytes = match self.fetcher.fetch(url).await {
                Ok(bytes) => bytes,
                Err(_) => return self.fail(format!("Could not fetch {url}")),
            };
            let document = self.html.parse(&bytes);
            self.harvest_document_defaults(&document);

            let Some(href) = document.publication_link() else {
                return self.fail("Publication link not found");
            };
            let mut json = if let Some(id) = href.strip_prefix('#') {
                let Some(text) = document.element_text(id) else {
                    return self.fail(format!("Manifest at {href} does not exist"));
                };
                if let Some(declared_base) = document.base_href() {
                    base = declared_base;
                }
                match serde_json::from_str(&text) {
                    Ok(json) => json,
                    Err(err) => return self.fail(err.to_string()),
                }
            } else {
                let resolved = urls::resolve(&href, Url::parse(url).ok().as_ref());
                let Some(manifest_url) = resolved else {
                    return self.fail(format!("Invalid URL {href}"));
                };
                let bytes = match self.fetcher.fetch(&manifest_url).await {
                    Ok(bytes) => bytes,
                    Err(_) => return self.fail(format!("Could not fetch {manifest_url}")),
                };
                base = manifest_url;
                match serde_json::from_slice(&bytes) {
                    Ok(json) => json,
                    Err(err) => return self.fail(err.to_string()),
                }
            };
            // a manifest reached through HTML reads the document itself when
            // it declares no reading order
            if let Value::Object(map) = &mut json {
                if !map.contains_key("readingOrder") {
                    map.insert("readingOrder".to_string(), Value::String(url.to_string()));
                }
            }
            json
        } else if content_type == "application/ld+json" || content_type == "application/json" {
            let bytes = match self.fetcher.fetch(url).await {
                Ok(bytes) => bytes,
                Err(_) => return self.fail(format!("Could not fetch {url}")),
            };
            match serde_json::from_slice(&bytes) {
                Ok(json) => json,
                Err(err) => return self.fail(err.to_string()),
            }
        } else {
            return self.fail(format!("Content type *{content_type}* not recognized"));
        };

        self.load_json_from_document(json, &base, guess_profile, &html_url)
            .await;
    }

    /// Process an in-memory manifest against `base`.
    pub async fn load_json(&mut self, json: Value, base: &str, guess_profile: bool) {
        self.load_json_from_document(json, base, guess_profile, "")
            .await;
    }

    /// Process an in-memory manifest that was reached through the HTML
    /// document at `html_url` (empty when it was not).
    pub async fn load_json_from_document(
        &mut self,
        json: Value,
        base: &str,
        guess_profile: bool,
        html_url: &str,
    ) {
        let processor = ManifestProcessor::new(
            &self.fetcher,
            &self.html,
            &self.supported_profiles,
            &self.defaults,
        );
        let (tree, diagnostics) = processor.run(json, base, guess_profile, html_url).await;
        self.data = ProcessedManifest::from_tree(tree);
        self.diagnostics.append(diagnostics);
        self.reading_order_index = 0;
    }

    fn harvest_document_defaults(&mut self, document: &H::Document) {
        if let Some(title) = document.title() {
            if !title.is_empty() {
                self.defaults.title = title;
            }
        }
        self.defaults.lang = document
            .language()
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| "en".to_string());
        self.defaults.dir = document
            .direction()
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| "ltr".to_string());
        if document.has_doc_toc() {
            self.defaults.toc = true;
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("manifest load failed: {}", message);
        self.diagnostics.push_fatal(message);
    }

    /// First title value matching `lang`, the document language, or the
    /// first entry; empty `lang` means "no preference".
    pub fn get_title(&self, lang: &str) -> Option<&str> {
        self.get_l10n_string_value(self.data.name(), lang)
    }

    /// The cover resource, when one exists.
    pub fn get_cover(&self) -> Option<&LinkedResource> {
        self.get_resource("cover")
    }

    /// The page-list resource, when one exists.
    pub fn get_page_list(&self) -> Option<&LinkedResource> {
        self.get_resource("pagelist")
    }

    /// First `resources` entry whose `rel` includes `rel`.
    pub fn get_resource(&self, rel: &str) -> Option<&LinkedResource> {
        self.data.resources().iter().find(|r| r.has_rel(rel))
    }

    /// Whether an HTML table-of-contents resource is available.
    pub fn has_html_toc(&self) -> bool {
        self.get_resource("contents")
            .map(|r| r.encoding_format.as_deref() == Some("text/html"))
            .unwrap_or(false)
    }

    /// The HTML TOC resource, or a flat list synthesized from the reading
    /// order when no HTML TOC exists.
    pub fn get_toc(&self) -> Toc {
        if self.has_html_toc() {
            if let Some(resource) = self.get_resource("contents") {
                return Toc::Html(resource.clone());
            }
        }
        Toc::Flat(
            self.data
                .reading_order()
                .iter()
                .map(|item| TocEntry {
                    name: self
                        .get_l10n_string_value(&item.name, "")
                        .map(str::to_string),
                    url: item.url.clone(),
                })
                .collect(),
        )
    }

    /// Reading-order entry under the cursor.
    pub fn current_reading_order_item(&self) -> Option<&LinkedResource> {
        self.data.reading_order().get(self.reading_order_index)
    }

    /// Advance the cursor. Returns the new entry, or `None` at the end; the
    /// cursor never wraps.
    pub fn next_reading_order_item(&mut self) -> Option<&LinkedResource> {
        if self.reading_order_index + 1 < self.data.reading_order().len() {
            self.reading_order_index += 1;
            self.current_reading_order_item()
        } else {
            None
        }
    }

    /// Step the cursor back. Returns the new entry, or `None` at the start.
    pub fn previous_reading_order_item(&mut self) -> Option<&LinkedResource> {
        if self.reading_order_index > 0 {
            self.reading_order_index -= 1;
            self.current_reading_order_item()
        } else {
            None
        }
    }

    /// Point the cursor at the entry matching `url`; absolute and relative
    /// URLs both work. The cursor is left unchanged when nothing matches.
    pub fn update_current_reading_order_index(&mut self, url: &str) -> Option<&LinkedResource> {
        let base = Url::parse(self.data.base()).ok();
        let resolved = urls::resolve(url, base.as_ref())?;
        let index = self
            .data
            .reading_order()
            .iter()
            .position(|item| item.url == resolved)?;
        self.reading_order_index = index;
        self.current_reading_order_item()
    }

    /// Resolve a localizable-string list for display: the entry matching
    /// `lang`, else the document language, else the first entry.
    pub fn get_l10n_string_value<'s>(
        &self,
        list: &'s [LocalizableString],
        lang: &str,
    ) -> Option<&'s str> {
        if !lang.is_empty() {
            if let Some(entry) = list.iter().find(|e| e.language.as_deref() == Some(lang)) {
                return Some(&entry.value);
            }
        } else if !self.data.language().is_empty() {
            let global = self.data.language();
            if let Some(entry) = list.iter().find(|e| e.language.as_deref() == Some(global)) {
                return Some(&entry.value);
            }
        }
        list.first().map(|e| e.value.as_str())
    }
}
