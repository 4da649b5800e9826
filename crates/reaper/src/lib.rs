//! # The Reaper: Remediation, Patches & Revert
//!
//! **Role**: Turns an analysis result into changes. Either proposes them as
//! diff files ([`patch::PatchGenerator`]) or applies them in place behind a
//! backup ([`remediate::Remediator`]), and restores those backups on request
//! ([`revert::revert`]).
//!
//! **Invariants**:
//! - A file is backed up at most once per run, before its first write.
//! - All spans in one file are spliced against one snapshot of its content,
//!   bottom-to-top.
//! - Patch generation never writes to a source file.

pub mod diff;
pub mod patch;
pub mod remediate;
pub mod revert;
pub mod safe_edit;
pub mod transform;

pub use patch::{PatchGenerator, PatchSet};
pub use remediate::{
    ClassDecision, ConsoleDecisions, DecisionProvider, FunctionDecision, Policy, Remediator,
    ScriptedDecisions,
};
pub use revert::{revert, RestoredFile, RevertOutcome};
pub use safe_edit::{EditTarget, SafeEditor};

use std::path::PathBuf;

/// Errors from reaper operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// The patch directory cannot be created; aborts the run.
    #[error("Cannot create patch directory {}: {source}", path.display())]
    PatchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    ParseError(#[from] anatomist::AnatomistError),
    #[error("Manifest serialisation failed: {0}")]
    Manifest(#[from] serde_json::Error),
}
