//! Collaborator interfaces for retrieval and HTML inspection.
//!
//! The pipeline never touches the network or a DOM itself. Callers supply a
//! [`Fetcher`] for bytes and content types and an [`HtmlParser`] for the few
//! HTML queries the pipeline needs (publication link discovery and table-of-
//! contents detection).

use core::fmt;

use async_trait::async_trait;

/// Error returned by a [`Fetcher`] when a resource cannot be retrieved.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// Network-level failure (DNS, connect, timeout, protocol).
    Network(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Retrieval collaborator.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the raw bytes at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Retrieve the MIME type at `url`, stripped of parameters.
    ///
    /// Returns an empty string when the resource cannot be reached; this
    /// call never fails.
    async fn content_type(&self, url: &str) -> String;
}

/// Parsed-HTML handle exposing the queries the pipeline needs.
pub trait HtmlDocument {
    /// Text content of the document `<title>`, when nonempty.
    fn title(&self) -> Option<String>;

    /// `lang` attribute of the root element, when nonempty.
    fn language(&self) -> Option<String>;

    /// `dir` attribute of the root element, when nonempty.
    fn direction(&self) -> Option<String>;

    /// Whether the document contains an element with `role=doc-toc`.
    fn has_doc_toc(&self) -> bool;

    /// `href` of the first `link[rel=publication]` element.
    fn publication_link(&self) -> Option<String>;

    /// `href` of the `<base>` element, when present.
    fn base_href(&self) -> Option<String>;

    /// Text content of the element with the given `id`, used to read an
    /// embedded manifest.
    fn element_text(&self, id: &str) -> Option<String>;
}

/// HTML parsing collaborator.
///
/// HTML parsing is error-tolerant; `parse` always yields a document.
pub trait HtmlParser: Send + Sync {
    /// The parsed-document handle type.
    type Document: HtmlDocument;

    /// Parse `bytes` as HTML.
    fn parse(&self, bytes: &[u8]) -> Self::Document;
}
