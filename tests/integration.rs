//! Integration tests for pubmanifest
//!
//! Exercises the full pipeline through the `Manifest` facade with a stub
//! fetcher and HTML parser standing in for the network and the DOM.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use pubmanifest::fetch::{FetchError, Fetcher, HtmlDocument, HtmlParser};
use pubmanifest::{Defaults, Manifest, ProfileDescriptor, Toc, AUDIOBOOKS_PROFILE};

// -- stub collaborators -------------------------------------------------------

#[derive(Default)]
struct StubFetcher {
    types: HashMap<String, String>,
    bodies: HashMap<String, Vec<u8>>,
}

impl StubFetcher {
    fn with(mut self, url: &str, content_type: &str, body: &[u8]) -> Self {
        self.types.insert(url.to_string(), content_type.to_string());
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("no fixture for {url}")))
    }

    async fn content_type(&self, url: &str) -> String {
        self.types.get(url).cloned().unwrap_or_default()
    }
}

// The stub parser reads a JSON description of the document instead of real
// HTML; only the queries the pipeline asks for are modeled.
#[derive(Default, Deserialize)]
#[serde(default)]
struct StubDocument {
    title: Option<String>,
    lang: Option<String>,
    dir: Option<String>,
    doc_toc: bool,
    publication_link: Option<String>,
    base_href: Option<String>,
    embedded: HashMap<String, String>,
}

impl HtmlDocument for StubDocument {
    fn title(&self) -> Option<String> {
        self.title.clone()
    }
    fn language(&self) -> Option<String> {
        self.lang.clone()
    }
    fn direction(&self) -> Option<String> {
        self.dir.clone()
    }
    fn has_doc_toc(&self) -> bool {
        self.doc_toc
    }
    fn publication_link(&self) -> Option<String> {
        self.publication_link.clone()
    }
    fn base_href(&self) -> Option<String> {
        self.base_href.clone()
    }
    fn element_text(&self, id: &str) -> Option<String> {
        self.embedded.get(id).cloned()
    }
}

struct StubHtml;

impl HtmlParser for StubHtml {
    type Document = StubDocument;

    fn parse(&self, bytes: &[u8]) -> StubDocument {
        serde_json::from_slice(bytes).unwrap_or_default()
    }
}

fn audiobook_profile() -> ProfileDescriptor {
    ProfileDescriptor::new(
        AUDIOBOOKS_PROFILE,
        vec!["audio/mpeg".to_string(), "audio/mp4".to_string()],
    )
}

fn generic_profile() -> ProfileDescriptor {
    ProfileDescriptor::new("https://example.com/profile", Vec::new())
}

const BASE: &str = "https://example.com/book/manifest.json";

fn complete_audiobook() -> Value {
    json!({
        "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context",
                     {"language": "en", "direction": "ltr"}],
        "conformsTo": "https://www.w3.org/TR/audiobooks/",
        "type": "Audiobook",
        "id": "urn:isbn:9780000000001",
        "name": "Midnight Run",
        "author": "Ann Author",
        "readBy": "Nat Narrator",
        "duration": "PT120S",
        "readingProgression": "ltr",
        "inLanguage": "en",
        "dateModified": "2020-01-01",
        "datePublished": "2019-10-01",
        "abridged": false,
        "accessMode": "auditory",
        "accessModeSufficient": [{"type": "ItemList", "itemListElement": ["auditory"]}],
        "accessibilityFeature": "synchronizedAudioText",
        "accessibilityHazard": "none",
        "accessibilitySummary": "Audio with synchronized text.",
        "url": "https://example.com/book/",
        "readingOrder": [
            {"url": "c1.mp3", "encodingFormat": "audio/mpeg", "duration": "PT30S", "name": "Part one"},
            {"url": "c2.mp3", "encodingFormat": "audio/mpeg", "duration": "PT90S", "name": "Part two"}
        ],
        "resources": [
            {"url": "cover.jpg", "rel": "cover", "encodingFormat": "image/jpeg", "name": "Cover"},
            {"url": "toc.html", "rel": "contents", "encodingFormat": "text/html"}
        ]
    })
}

// -- load_json ----------------------------------------------------------------

#[tokio::test]
async fn complete_audiobook_processes_cleanly() {
    let fetcher = StubFetcher::default().with(
        "https://example.com/book/toc.html",
        "text/html",
        br#"{"doc_toc": true}"#,
    );
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.set_supported_profiles(vec![audiobook_profile()]);
    manifest.load_json(complete_audiobook(), BASE, false).await;

    assert!(
        manifest.errors().is_empty(),
        "unexpected diagnostics: {:?}",
        manifest.errors()
    );
    let data = manifest.data();
    assert_eq!(data.profile(), AUDIOBOOKS_PROFILE);
    assert_eq!(data.language(), "en");
    assert_eq!(data.reading_order().len(), 2);
    assert_eq!(
        data.reading_order()[0].url,
        "https://example.com/book/c1.mp3"
    );
    assert_eq!(
        data.unique_resources(),
        [
            "https://example.com/book/c1.mp3",
            "https://example.com/book/c2.mp3",
            "https://example.com/book/cover.jpg",
            "https://example.com/book/toc.html",
        ]
    );
    assert!(data.toc_detected());
    assert_eq!(manifest.get_title(""), Some("Midnight Run"));
    assert!(manifest.has_html_toc());
    assert_eq!(
        manifest.get_cover().map(|c| c.url.as_str()),
        Some("https://example.com/book/cover.jpg")
    );

    let authors = data.entities("author");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name[0].value, "Ann Author");
    assert!(authors[0].types.iter().any(|t| t == "Person"));
}

#[tokio::test]
async fn profile_is_guessed_from_sniffed_content_types() {
    let fetcher = StubFetcher::default()
        .with("https://example.com/book/c1.mp3", "audio/mpeg", b"")
        .with("https://example.com/book/c2.mp3", "audio/mpeg", b"");
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.set_supported_profiles(vec![audiobook_profile()]);
    manifest
        .load_json(
            json!({
                "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context"],
                "name": "Untitled audio",
                "readingOrder": ["c1.mp3", "c2.mp3"]
            }),
            BASE,
            true,
        )
        .await;

    assert!(manifest.fatal_errors().is_empty());
    assert_eq!(manifest.data().profile(), AUDIOBOOKS_PROFILE);
    // sniffing records the content type on each item for later stages
    assert_eq!(
        manifest.data().reading_order()[0].encoding_format.as_deref(),
        Some("audio/mpeg")
    );
    assert!(manifest
        .errors()
        .iter()
        .any(|d| d.message == "Had to guess what profile to use"));
}

#[tokio::test]
async fn missing_toc_is_flagged_for_audiobooks() {
    let mut manifest = Manifest::new(StubFetcher::default(), StubHtml);
    manifest.set_supported_profiles(vec![audiobook_profile()]);
    let mut input = complete_audiobook();
    input["resources"] = json!([
        {"url": "cover.jpg", "rel": "cover", "encodingFormat": "image/jpeg", "name": "Cover"}
    ]);
    manifest.load_json(input, BASE, false).await;

    assert!(!manifest.data().toc_detected());
    assert!(manifest
        .errors()
        .iter()
        .any(|d| d.message == "No HTML table of contents found"));
}

// -- load_url -----------------------------------------------------------------

#[tokio::test]
async fn load_url_follows_the_json_path() {
    let body = serde_json::to_vec(&complete_audiobook()).unwrap();
    let fetcher = StubFetcher::default()
        .with(BASE, "application/json", &body)
        .with(
            "https://example.com/book/toc.html",
            "text/html",
            br#"{"doc_toc": true}"#,
        );
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.set_supported_profiles(vec![audiobook_profile()]);
    manifest.load_url(BASE, false).await;

    assert!(manifest.errors().is_empty());
    assert_eq!(manifest.data().base(), BASE);
    assert_eq!(manifest.get_title(""), Some("Midnight Run"));
}

#[tokio::test]
async fn load_url_reads_an_embedded_manifest() {
    let page_url = "https://example.com/book.html";
    let embedded = json!({
        "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context"],
        "conformsTo": "https://example.com/profile"
    });
    let page = json!({
        "title": "Page Title",
        "lang": "en",
        "dir": "ltr",
        "doc_toc": true,
        "publication_link": "#manifest",
        "embedded": {"manifest": embedded.to_string()}
    });
    let fetcher =
        StubFetcher::default().with(page_url, "text/html", page.to_string().as_bytes());
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.set_supported_profiles(vec![generic_profile()]);
    manifest.load_url(page_url, false).await;

    assert!(
        manifest.fatal_errors().is_empty(),
        "unexpected fatal: {:?}",
        manifest.fatal_errors()
    );
    // the document harvested its own title and became the reading order
    assert_eq!(manifest.get_title(""), Some("Page Title"));
    assert_eq!(manifest.data().reading_order()[0].url, page_url);
    assert_eq!(manifest.data().language(), "en");
}

#[tokio::test]
async fn load_url_follows_a_linked_manifest() {
    let page_url = "https://example.com/book.html";
    let manifest_url = "https://example.com/manifest.json";
    let page = json!({
        "title": "Linked Book",
        "publication_link": "manifest.json"
    });
    let linked = json!({
        "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context"],
        "conformsTo": "https://example.com/profile",
        "name": "Linked Book",
        "readingOrder": ["c1.html"]
    });
    let fetcher = StubFetcher::default()
        .with(page_url, "text/html", page.to_string().as_bytes())
        .with(
            manifest_url,
            "application/json",
            linked.to_string().as_bytes(),
        );
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.set_supported_profiles(vec![generic_profile()]);
    manifest.load_url(page_url, false).await;

    assert!(manifest.fatal_errors().is_empty());
    // the linked manifest becomes the base
    assert_eq!(manifest.data().base(), manifest_url);
    assert_eq!(
        manifest.data().reading_order()[0].url,
        "https://example.com/c1.html"
    );
}

#[tokio::test]
async fn load_url_rejects_unknown_content_types() {
    let fetcher = StubFetcher::default().with(BASE, "text/plain", b"not a manifest");
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.load_url(BASE, false).await;

    let fatal = manifest.fatal_errors();
    assert_eq!(fatal.len(), 1);
    assert_eq!(fatal[0].message, "Content type *text/plain* not recognized");
}

#[tokio::test]
async fn load_url_requires_a_publication_link() {
    let page_url = "https://example.com/book.html";
    let fetcher = StubFetcher::default().with(page_url, "text/html", br#"{"title": "No link"}"#);
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.load_url(page_url, false).await;

    assert!(manifest
        .fatal_errors()
        .iter()
        .any(|d| d.message == "Publication link not found"));
}

// -- facade -------------------------------------------------------------------

#[tokio::test]
async fn cursor_is_bounds_checked_and_never_wraps() {
    let fetcher = StubFetcher::default().with(
        "https://example.com/book/toc.html",
        "text/html",
        br#"{"doc_toc": true}"#,
    );
    let mut manifest = Manifest::new(fetcher, StubHtml);
    manifest.set_supported_profiles(vec![audiobook_profile()]);
    manifest.load_json(complete_audiobook(), BASE, false).await;

    assert_eq!(
        manifest.current_reading_order_item().unwrap().url,
        "https://example.com/book/c1.mp3"
    );
    assert_eq!(
        manifest.next_reading_order_item().unwrap().url,
        "https://example.com/book/c2.mp3"
    );
    assert!(manifest.next_reading_order_item().is_none());
    assert_eq!(
        manifest.previous_reading_order_item().unwrap().url,
        "https://example.com/book/c1.mp3"
    );
    assert!(manifest.previous_reading_order_item().is_none());

    // relative URLs reposition the cursor too
    assert_eq!(
        manifest
            .update_current_reading_order_index("c2.mp3")
            .unwrap()
            .url,
        "https://example.com/book/c2.mp3"
    );
    // a miss leaves the cursor unchanged
    assert!(manifest
        .update_current_reading_order_index("missing.mp3")
        .is_none());
    assert_eq!(
        manifest.current_reading_order_item().unwrap().url,
        "https://example.com/book/c2.mp3"
    );
}

#[tokio::test]
async fn toc_falls_back_to_a_flat_reading_order_list() {
    let mut manifest = Manifest::new(StubFetcher::default(), StubHtml);
    manifest.set_supported_profiles(vec![generic_profile()]);
    manifest
        .load_json(
            json!({
                "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context"],
                "conformsTo": "https://example.com/profile",
                "name": "Plain book",
                "readingOrder": [
                    {"url": "c1.html", "name": "One"},
                    {"url": "c2.html", "name": "Two"}
                ]
            }),
            BASE,
            false,
        )
        .await;

    assert!(!manifest.has_html_toc());
    match manifest.get_toc() {
        Toc::Flat(entries) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name.as_deref(), Some("One"));
            assert_eq!(entries[0].url, "https://example.com/book/c1.html");
        }
        Toc::Html(resource) => panic!("expected flat TOC, got {:?}", resource),
    }
}

#[tokio::test]
async fn titles_resolve_by_language() {
    let mut manifest = Manifest::new(StubFetcher::default(), StubHtml);
    manifest.set_supported_profiles(vec![generic_profile()]);
    manifest.set_defaults(Defaults {
        lang: "fr".to_string(),
        ..Defaults::default()
    });
    manifest
        .load_json(
            json!({
                "@context": ["https://schema.org", "https://www.w3.org/ns/pub-context"],
                "conformsTo": "https://example.com/profile",
                "name": [
                    {"value": "Course de minuit", "language": "fr"},
                    {"value": "Midnight Run", "language": "en"}
                ],
                "readingOrder": ["c1.html"]
            }),
            BASE,
            false,
        )
        .await;

    assert_eq!(manifest.get_title("en"), Some("Midnight Run"));
    // no explicit language falls back to the document language
    assert_eq!(manifest.get_title(""), Some("Course de minuit"));
    // an unknown language falls back to the first entry
    assert_eq!(manifest.get_title("de"), Some("Course de minuit"));
}
