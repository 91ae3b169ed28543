//! Term schema registry and fixed manifest vocabulary.
//!
//! Every recognized manifest term owns exactly one [`Shape`] that decides
//! its canonical form. The registry is data, not code, so a profile
//! extension could add terms without touching pipeline logic.

/// Canonical shape of a manifest term's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Array of literal strings.
    LiteralArray,
    /// Array of entities (authors, narrators, publishers, ...).
    EntityArray,
    /// Array of localizable strings.
    L10nStringArray,
    /// Array of linked resources.
    LinkedResourceArray,
    /// Array of plain objects.
    ObjectArray,
    /// Single identifier.
    Identifier,
    /// URL string; arrays of URL strings are allowed at the top level.
    Url,
    /// Literal scalar.
    Literal,
    /// Boolean.
    Boolean,
    /// Not part of the registry; passes through untouched.
    Unknown,
}

const ARRAY_OF_LITERALS: &[&str] = &[
    "accessMode",
    "accessibilityFeature",
    "accessibilityHazard",
    "inLanguage",
    "uniqueResources",
    "rel",
    "type",
    "conformsTo",
];

const ARRAY_OF_LINKED_RESOURCES: &[&str] = &["readingOrder", "resources", "links", "alternate"];

const ARRAY_OF_L10N_STRINGS: &[&str] = &["accessibilitySummary", "name", "description"];

const ARRAY_OF_ENTITIES: &[&str] = &[
    "artist",
    "author",
    "colorist",
    "contributor",
    "creator",
    "editor",
    "illustrator",
    "inker",
    "letterer",
    "penciler",
    "publisher",
    "readBy",
    "translator",
];

const ARRAY_OF_OBJECTS: &[&str] = &["accessModeSufficient"];

const IDENTIFIERS: &[&str] = &["id"];

const URLS: &[&str] = &["url"];

const LITERALS: &[&str] = &[
    "duration",
    "dateModified",
    "datePublished",
    "readingProgression",
    "license",
];

const BOOLEANS: &[&str] = &["abridged"];

/// Terms whose string values are resolved against the document base.
///
/// `id` joins `url` here: identifiers in this vocabulary are URLs or URNs.
const URL_TERMS: &[&str] = &["url", "id"];

/// Classify a manifest term into its canonical shape.
pub fn classify(term: &str) -> Shape {
    if ARRAY_OF_LITERALS.contains(&term) {
        Shape::LiteralArray
    } else if ARRAY_OF_ENTITIES.contains(&term) {
        Shape::EntityArray
    } else if ARRAY_OF_L10N_STRINGS.contains(&term) {
        Shape::L10nStringArray
    } else if ARRAY_OF_LINKED_RESOURCES.contains(&term) {
        Shape::LinkedResourceArray
    } else if ARRAY_OF_OBJECTS.contains(&term) {
        Shape::ObjectArray
    } else if IDENTIFIERS.contains(&term) {
        Shape::Identifier
    } else if URLS.contains(&term) {
        Shape::Url
    } else if LITERALS.contains(&term) {
        Shape::Literal
    } else if BOOLEANS.contains(&term) {
        Shape::Boolean
    } else {
        Shape::Unknown
    }
}

/// Whether string values under this term are URL-resolved against the base.
pub fn is_url_term(term: &str) -> bool {
    URL_TERMS.contains(&term)
}

/// First required `@context` entry.
pub const CONTEXT_SCHEMA_ORG: &str = "https://schema.org";

/// Second required `@context` entry.
pub const CONTEXT_PUB: &str = "https://www.w3.org/ns/pub-context";

/// Profile URI of the W3C audiobooks profile.
pub const AUDIOBOOKS_PROFILE: &str = "https://www.w3.org/TR/audiobooks/";

/// Top-level properties the audiobooks profile expects to be present.
pub(crate) const AUDIO_REQUIRED_PROPERTIES: &[&str] = &[
    "abridged",
    "accessMode",
    "accessModeSufficient",
    "accessibilityFeature",
    "accessibilityHazard",
    "accessibilitySummary",
    "author",
    "dateModified",
    "datePublished",
    "id",
    "inLanguage",
    "name",
    "readBy",
    "readingProgression",
    "resources",
    "url",
];

// most common web audio mimetypes
const AUDIO_MIMES: &[&str] = &[
    "audio/wav",
    "audio/mpeg",
    "audio/ogg",
    "audio/webm",
    "audio/mp4",
    "audio/aac",
    "audio/aacp",
    "audio/flac",
    "audio/mp3",
];

// common image file types
const IMAGE_MIMES: &[&str] = &[
    "image/apng",
    "image/bmp",
    "image/gif",
    "image/x-icon",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/tiff",
    "image/webp",
];

/// Whether `encoding_format` is a playable audio MIME type.
pub fn is_audio_format(encoding_format: &str) -> bool {
    AUDIO_MIMES.contains(&encoding_format)
}

/// Whether `encoding_format` is a recognized image MIME type.
pub fn is_image_format(encoding_format: &str) -> bool {
    IMAGE_MIMES.contains(&encoding_format)
}
