//! pubmanifest -- Publication manifest processing pipeline
//!
//! Ingests a publication manifest (the JSON description of a readable or
//! listenable work, e.g. an audiobook), expands every shorthand term into
//! its canonical shape, validates the result against structural and
//! profile-specific rules, resolves URLs against the document base, and
//! exposes a read-only navigation facade over the canonical document.
//!
//! # Collaborators
//!
//! The pipeline performs no I/O of its own. Callers supply a
//! [`fetch::Fetcher`] for bytes and content types and a
//! [`fetch::HtmlParser`] for the few HTML queries the pipeline needs
//! (publication-link discovery and table-of-contents detection).
//!
//! # Error model
//!
//! Nothing fails past the [`manifest::Manifest`] boundary. Every problem is
//! recorded as a [`error::Diagnostic`] -- fatal ones leave the document in
//! its last-known-good partial state, validation ones record a documented
//! default substitution or omission. Check `fatal_errors()` before trusting
//! any field.

#![warn(missing_docs)]
#![deny(clippy::large_enum_variant, clippy::redundant_clone)]
#![warn(
    clippy::needless_collect,
    clippy::map_clone,
    clippy::implicit_clone,
    clippy::inefficient_to_string
)]

pub mod audiobook;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod global_check;
pub mod manifest;
pub mod normalize;
pub mod preflight;
pub mod processor;
pub mod profile;
pub mod terms;
pub mod types;
pub mod urls;
pub mod validate;

// Re-export key types for convenience
pub use error::{Diagnostic, Diagnostics, Severity};
pub use fetch::{FetchError, Fetcher, HtmlDocument, HtmlParser};
pub use manifest::{Defaults, Manifest};
pub use profile::ProfileDescriptor;
pub use terms::{classify, Shape, AUDIOBOOKS_PROFILE};
pub use types::{Entity, LinkedResource, LocalizableString, ProcessedManifest, Toc, TocEntry};
