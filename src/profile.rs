//! Profile resolution: declared match, content sniffing, default fallback.

use futures::future::join_all;
use serde_json::{Map, Value};
use url::Url;

use crate::error::Diagnostics;
use crate::fetch::Fetcher;
use crate::urls;

/// A named extension ruleset the caller supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileDescriptor {
    /// Profile URI, matched against `conformsTo`.
    pub id: String,
    /// Reading-order MIME types that identify this profile when guessing.
    pub encoding_formats: Vec<String>,
}

impl ProfileDescriptor {
    /// Create a profile descriptor.
    pub fn new(id: impl Into<String>, encoding_formats: Vec<String>) -> Self {
        Self {
            id: id.into(),
            encoding_formats,
        }
    }
}

/// Pick the effective profile for a document.
///
/// The first declared `conformsTo` value matching a supported profile wins —
/// author intent order, not support order. Otherwise, if permitted, the
/// profile is guessed from the sniffed content types of the preliminary
/// reading order (which gains `encodingFormat` fields as a byproduct).
/// Otherwise a configured default applies. The returned error message
/// becomes a fatal diagnostic.
pub async fn resolve_profile<F: Fetcher>(
    json: &Map<String, Value>,
    reading_order: &mut [Value],
    supported: &[ProfileDescriptor],
    guess_profile: bool,
    default_profile: Option<&str>,
    base: &str,
    fetcher: &F,
    diagnostics: &mut Diagnostics,
) -> Result<String, String> {
    let declared: Vec<&Value> = match json.get("conformsTo") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    };
    for value in declared {
        if let Some(id) = value.as_str() {
            if supported.iter().any(|profile| profile.id == id) {
                return Ok(id.to_string());
            }
        }
    }

    if guess_profile {
        log::debug!("guessing profile from reading order content types");
        match guess(reading_order, supported, base, fetcher).await? {
            Some(id) => {
                diagnostics.push_validation("Had to guess what profile to use");
                Ok(id)
            }
            None => Err("Could not determine profile".to_string()),
        }
    } else if let Some(default) = default_profile {
        diagnostics.push_validation("Conformance statement missing; using default profile");
        Ok(default.to_string())
    } else {
        Err("Could not determine profile, and no default profile was set.".to_string())
    }
}

// Sniff every reading-order item concurrently, then pick the first supported
// profile whose declared formats cover everything seen.
async fn guess<F: Fetcher>(
    reading_order: &mut [Value],
    supported: &[ProfileDescriptor],
    base: &str,
    fetcher: &F,
) -> Result<Option<String>, String> {
    attach_encoding_formats(reading_order, base, fetcher).await?;

    let mut present: Vec<&str> = Vec::new();
    for item in reading_order.iter() {
        if let Some(format) = item.get("encodingFormat").and_then(Value::as_str) {
            if !present.contains(&format) {
                present.push(format);
            }
        }
    }

    Ok(supported
        .iter()
        .find(|profile| {
            present
                .iter()
                .all(|format| profile.encoding_formats.iter().any(|f| f == format))
        })
        .map(|profile| profile.id.clone()))
}

/// Fetch the content type of every item, fan-out/fan-in, and record it as
/// the item's `encodingFormat`.
pub(crate) async fn attach_encoding_formats<F: Fetcher>(
    reading_order: &mut [Value],
    base: &str,
    fetcher: &F,
) -> Result<(), String> {
    let base_url = Url::parse(base).ok();
    let targets: Vec<String> = reading_order
        .iter()
        .map(|item| {
            let raw = item.get("url").and_then(Value::as_str).unwrap_or_default();
            urls::resolve(raw, base_url.as_ref())
                .ok_or_else(|| format!("Invalid reading order URL *{raw}*"))
        })
        .collect::<Result<_, String>>()?;

    let formats = join_all(targets.iter().map(|url| fetcher.content_type(url))).await;
    for (item, format) in reading_order.iter_mut().zip(formats) {
        if let Value::Object(object) = item {
            object.insert("encodingFormat".to_string(), Value::String(format));
        }
    }
    Ok(())
}
