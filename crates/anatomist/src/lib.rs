//! # The Anatomist: Parsing & Usage Extraction
//!
//! **Role**: Turns a web source tree (markup, stylesheets, scripts) into the
//! defined/used symbol tables and resolves them into an [`AnalysisResult`].
//!
//! **Core Types**:
//! - [`FileKind`]: which grammar a file is dissected with.
//! - [`usage::Contribution`]: what one file adds to the pass.
//! - [`pipeline::ScanResult`]: the resolved result plus the facts remediation needs.
//!
//! **Design**:
//! - Tree-sitter grammars for all three languages; class-like tokens inside
//!   scripts come from the open [`heuristics::ClassRule`] list.
//! - Every per-file step returns `Result<_, AnatomistError>`; the pipeline
//!   folds the `Ok`s and records the `Err`s as skipped files.
//!
//! [`AnalysisResult`]: common::AnalysisResult

pub mod heuristics;
pub mod lint;
pub mod markup;
pub mod parser;
pub mod path_util;
pub mod pipeline;
pub mod resolver;
pub mod scan;
pub mod stylesheet;
pub mod usage;

pub use heuristics::ClassRule;
pub use parser::ParserHost;
pub use pipeline::ScanResult;
pub use resolver::{ReferenceResolver, UnsafeReason, Verdict};
pub use scan::ProjectFiles;

use std::path::Path;

/// Source grammar of an analysable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    /// `.html`, `.htm`, `.ejs`
    Markup,
    /// `.css`
    Stylesheet,
    /// `.js`, `.mjs`, `.cjs`
    Script,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" | "ejs" => Some(FileKind::Markup),
            "css" => Some(FileKind::Stylesheet),
            "js" | "mjs" | "cjs" => Some(FileKind::Script),
            _ => None,
        }
    }
}

/// Errors produced by the Anatomist crate.
#[derive(Debug, thiserror::Error)]
pub enum AnatomistError {
    /// Tree-sitter parsing failed outright (no tree).
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// I/O error (file read, walk, mmap).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// File content is not valid UTF-8.
    #[error("File is not valid UTF-8")]
    InvalidUtf8,

    /// Byte range exceeds u32::MAX (file too large).
    #[error("Byte range overflow: file size exceeds 4GB limit")]
    ByteRangeOverflow,
}
