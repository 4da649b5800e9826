//! # Common: the shared vocabulary of deadwatcher
//!
//! Every crate speaks in these types: the symbols under analysis, the
//! per-pass [`AnalysisResult`], lint [`Diagnostic`]s, patch metadata and the
//! [`RunStamp`] that ties backups, patches and manifests of one run together.

pub mod config;
pub mod pattern;
pub mod snapshot;
pub mod wisdom;

pub use config::{Config, ConfigError};
pub use pattern::IgnoreSet;
pub use snapshot::{Snapshot, SnapshotSlot};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a named entity under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    /// A class selector defined in a stylesheet (`.foo` → `foo`).
    CssClass,
    /// A markup element name (`center`, `font`, ...).
    HtmlTag,
    /// A named function declared in a script.
    JsFunction,
}

/// Byte and line range of a declaration inside its defining file.
///
/// Byte offsets are half-open (`start_byte..end_byte`); lines are 1-indexed
/// and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_byte: u32,
    pub end_byte: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl SourceSpan {
    /// Returns `true` if `offset` falls inside the span.
    ///
    /// The end offset is inclusive: an occurrence starting exactly at
    /// `end_byte` still belongs to the declaration's own text.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start_byte as usize && offset <= self.end_byte as usize
    }

    pub fn byte_len(&self) -> u32 {
        self.end_byte.saturating_sub(self.start_byte)
    }
}

/// A named entity under analysis.
///
/// A `CssClass` name never carries the leading `.`. A `JsFunction` is keyed
/// by `(defining_file, name)` and always has a `span`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub defining_file: Option<String>,
    pub span: Option<SourceSpan>,
}

impl Symbol {
    pub fn css_class(name: impl Into<String>, defining_file: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            kind: SymbolKind::CssClass,
            name: name.trim_start_matches('.').to_string(),
            defining_file: Some(defining_file.into()),
            span: None,
        }
    }

    pub fn html_tag(name: impl Into<String>) -> Self {
        Self {
            kind: SymbolKind::HtmlTag,
            name: name.into().to_ascii_lowercase(),
            defining_file: None,
            span: None,
        }
    }

    pub fn js_function(
        name: impl Into<String>,
        defining_file: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            kind: SymbolKind::JsFunction,
            name: name.into(),
            defining_file: Some(defining_file.into()),
            span: Some(span),
        }
    }

    /// `"{file}::{name}"`, or just the name for file-less symbols.
    pub fn symbol_id(&self) -> String {
        match &self.defining_file {
            Some(file) => format!("{}::{}", file, self.name),
            None => self.name.clone(),
        }
    }
}

/// A declared function with no observed reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnusedFunction {
    pub name: String,
    pub file: String,
}

/// Lint severity, numerically compatible with the usual `1 = warn, 2 = error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    Warning = 1,
    Error = 2,
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> u8 {
        s as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, String> {
        match v {
            1 => Ok(Severity::Warning),
            2 => Ok(Severity::Error),
            other => Err(format!("unknown severity {other}")),
        }
    }
}

/// One lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
    pub rule_id: String,
    pub severity: Severity,
    /// Remediation advice, filled from [`wisdom::js_suggestion`].
    pub suggestion: String,
}

/// A file that could not be read or parsed during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub reason: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.reason)
    }
}

/// Outcome of one analysis pass.
///
/// Created fresh per pass, handed to reporting and the patch generator, then
/// kept only as the latest [`Snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub unused_classes: Vec<String>,
    pub deprecated_tags: Vec<String>,
    pub js_unused: Vec<UnusedFunction>,
    pub js_errors: Vec<Diagnostic>,
    pub js_warnings: Vec<Diagnostic>,
    /// Advice for every tag in `deprecated_tags` (`None` if the table has none).
    pub tag_suggestions: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub skipped_files: Vec<FileError>,
}

impl AnalysisResult {
    /// `true` when the pass found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.unused_classes.is_empty()
            && self.deprecated_tags.is_empty()
            && self.js_unused.is_empty()
            && self.js_errors.is_empty()
            && self.js_warnings.is_empty()
    }
}

/// What a patch proposes to do to its target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchKind {
    #[serde(rename = "css-class-removal")]
    CssClassRemoval,
    #[serde(rename = "js-comment-func")]
    JsFunctionComment,
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchKind::CssClassRemoval => f.write_str("css-class-removal"),
            PatchKind::JsFunctionComment => f.write_str("js-comment-func"),
        }
    }
}

/// Manifest entry for one written patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: PatchKind,
    pub patch: String,
    pub timestamp: String,
}

/// `suggested-changes.<timestamp>.json`: every patch of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionManifest {
    pub timestamp: String,
    pub suggestions: Vec<Suggestion>,
}

/// The instant a run started, in the two renderings the run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    /// Unix milliseconds. Names backups, patch files and the manifest.
    pub millis: String,
    /// RFC 3339 / ISO-8601 UTC with milliseconds. Used in removal banners.
    pub iso: String,
}

impl RunStamp {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            millis: instant.timestamp_millis().to_string(),
            iso: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Builds a stamp from unix milliseconds; `None` if out of range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(Self::at)
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_class_strips_selector_marker() {
        let sym = Symbol::css_class(".card", "styles.css");
        assert_eq!(sym.name, "card");
        assert_eq!(sym.kind, SymbolKind::CssClass);
    }

    #[test]
    fn test_symbol_id() {
        let span = SourceSpan {
            start_byte: 0,
            end_byte: 10,
            start_line: 1,
            end_line: 1,
        };
        let sym = Symbol::js_function("helper", "src/app.js", span);
        assert_eq!(sym.symbol_id(), "src/app.js::helper");
        assert_eq!(Symbol::html_tag("CENTER").symbol_id(), "center");
    }

    #[test]
    fn test_span_contains_is_end_inclusive() {
        let span = SourceSpan {
            start_byte: 5,
            end_byte: 9,
            start_line: 1,
            end_line: 1,
        };
        assert!(!span.contains(4));
        assert!(span.contains(5));
        assert!(span.contains(9));
        assert!(!span.contains(10));
        assert_eq!(span.byte_len(), 4);
    }

    #[test]
    fn test_run_stamp_renderings() {
        let stamp = RunStamp::from_millis(1_700_000_000_123).unwrap();
        assert_eq!(stamp.millis, "1700000000123");
        assert_eq!(stamp.iso, "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut result = AnalysisResult::default();
        result.unused_classes.push("bar".into());
        result.js_unused.push(UnusedFunction {
            name: "helper".into(),
            file: "app.js".into(),
        });
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"unusedClasses\":[\"bar\"]"));
        assert!(json.contains("\"jsUnused\":[{\"name\":\"helper\",\"file\":\"app.js\"}]"));
        assert!(json.contains("\"tagSuggestions\""));
    }

    #[test]
    fn test_manifest_uses_type_key() {
        let manifest = SuggestionManifest {
            timestamp: "1".into(),
            suggestions: vec![Suggestion {
                file: "a.css".into(),
                kind: PatchKind::CssClassRemoval,
                patch: "p/1_a.css.diff".into(),
                timestamp: "1".into(),
            }],
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"type\":\"css-class-removal\""));
    }

    #[test]
    fn test_severity_roundtrips_as_number() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "2");
        let back: Severity = serde_json::from_str("1").unwrap();
        assert_eq!(back, Severity::Warning);
    }
}
