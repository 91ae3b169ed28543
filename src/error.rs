//! Diagnostic types for manifest processing.
//!
//! No error ever escapes the `Manifest` boundary; every failure is recorded
//! as a `Diagnostic` in a per-load `Diagnostics` accumulator.

use core::fmt;

/// Severity of a processing diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// The current stage could not continue meaningfully; the processed
    /// document is left in its last-known-good partial state.
    Fatal,
    /// A documented default substitution or omission was applied and
    /// processing continued.
    Validation,
}

/// A single processing diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity classification.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Create a fatal diagnostic.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
        }
    }

    /// Create a validation diagnostic.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Validation,
            message: message.into(),
        }
    }

    /// Whether this diagnostic is fatal.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Fatal => write!(f, "fatal: {}", self.message),
            Severity::Validation => write!(f, "validation: {}", self.message),
        }
    }
}

/// Append-only diagnostic accumulator scoped to a single manifest load.
///
/// Diagnostics are never deduplicated; a malformed value that appears in
/// several places is reported once per occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Append a fatal diagnostic.
    pub fn push_fatal(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::fatal(message));
    }

    /// Append a validation diagnostic.
    pub fn push_validation(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::validation(message));
    }

    /// Move every diagnostic of `other` into this accumulator.
    pub fn append(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// All collected diagnostics, in the order they were recorded.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Fatal diagnostics only.
    pub fn fatal_entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_fatal())
    }

    /// Whether any fatal diagnostic was recorded.
    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_fatal)
    }

    /// Number of fatal diagnostics.
    pub fn fatal_count(&self) -> usize {
        self.fatal_entries().count()
    }

    /// Number of validation diagnostics.
    pub fn validation_count(&self) -> usize {
        self.entries.len() - self.fatal_count()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::fatal("Missing property \"@context\"");
        assert_eq!(format!("{}", d), "fatal: Missing property \"@context\"");
    }

    #[test]
    fn diagnostics_counts() {
        let mut report = Diagnostics::new();
        report.push_validation("ID not set");
        report.push_validation("ID not set");
        report.push_fatal("Could not determine profile");
        assert_eq!(report.len(), 3);
        assert_eq!(report.fatal_count(), 1);
        assert_eq!(report.validation_count(), 2);
        assert!(report.has_fatal());
    }

    #[test]
    fn diagnostics_are_not_deduplicated() {
        let mut report = Diagnostics::new();
        report.push_validation("Invalid URL x");
        report.push_validation("Invalid URL x");
        assert_eq!(report.entries().len(), 2);
    }
}
