//! Backed-up, bottom-to-top file editing.
//!
//! ## Workflow
//! 1. `SafeEditor::new(stamp)`: one editor per run, one stamp for every backup.
//! 2. `rewrite(file, content)`: copies `file` to `<file>.bak.<millis>` on first
//!    touch, then writes the new content.
//! 3. Span edits are computed with [`splice`] against one snapshot of the
//!    original text before anything is written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::RunStamp;

use crate::ReaperError;

/// One byte range of a source text and the text that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    /// Symbol or rule the edit belongs to (for logging only).
    pub label: String,
    /// Byte offset of the first replaced byte (inclusive).
    pub start: usize,
    /// Byte offset just past the replaced region (exclusive).
    pub end: usize,
    pub replacement: String,
}

impl EditTarget {
    pub fn removal(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            replacement: String::new(),
        }
    }
}

/// Applies `targets` to `source` and returns the new text plus the number of
/// edits applied.
///
/// Targets overlapping an earlier-starting (or enclosing) target are dropped,
/// then the rest are applied in descending `start` order so that earlier
/// offsets stay valid.
pub fn splice(source: &str, targets: &[EditTarget]) -> (String, usize) {
    let mut ordered: Vec<&EditTarget> = targets.iter().collect();
    // Enclosing ranges first so contained ones are the ones dropped.
    ordered.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<&EditTarget> = Vec::with_capacity(ordered.len());
    let mut frontier = 0usize;
    for target in ordered {
        if target.start >= target.end && target.replacement.is_empty() {
            continue;
        }
        if target.end > source.len() || target.start < frontier {
            tracing::warn!(label = %target.label, start = target.start, end = target.end, "overlapping or out-of-range edit dropped");
            continue;
        }
        frontier = target.end;
        kept.push(target);
    }

    let mut content = source.to_string();
    for target in kept.iter().rev() {
        let start = snap_char_boundary_bwd(&content, target.start);
        let end = snap_char_boundary_fwd(&content, target.end);
        content.replace_range(start..end, &target.replacement);
    }
    (content, kept.len())
}

/// Writes files for one run, backing each one up before its first write.
pub struct SafeEditor {
    stamp: RunStamp,
    /// `original_path → backup_path`
    backups: HashMap<PathBuf, PathBuf>,
}

impl SafeEditor {
    pub fn new(stamp: RunStamp) -> Self {
        Self {
            stamp,
            backups: HashMap::new(),
        }
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    /// Replaces the content of `file_path`, taking the run's backup first.
    pub fn rewrite(&mut self, file_path: &Path, content: &str) -> Result<(), ReaperError> {
        let backup = self.ensure_backup(file_path)?;
        std::fs::write(file_path, content)?;
        tracing::info!(file = %file_path.display(), backup = %backup.display(), "rewrote file");
        Ok(())
    }

    /// Ensures a backup of `file_path` exists for this run, creating one on
    /// first touch.
    pub fn ensure_backup(&mut self, file_path: &Path) -> Result<PathBuf, ReaperError> {
        if let Some(existing) = self.backups.get(file_path) {
            return Ok(existing.clone());
        }
        let backup = backup_path(file_path, &self.stamp.millis);
        std::fs::copy(file_path, &backup)?;
        tracing::info!(file = %file_path.display(), backup = %backup.display(), "backup taken");
        self.backups.insert(file_path.to_path_buf(), backup.clone());
        Ok(backup)
    }

    /// Backup taken for `file_path` in this run, if any.
    pub fn backup_of(&self, file_path: &Path) -> Option<&Path> {
        self.backups.get(file_path).map(PathBuf::as_path)
    }

    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }
}

/// `<file>.bak.<millis>` next to the original.
pub fn backup_path(file_path: &Path, millis: &str) -> PathBuf {
    let mut name = file_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".bak.{millis}"));
    file_path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// UTF-8 boundary helpers
// ---------------------------------------------------------------------------

/// Snaps `offset` backward to the start of the current UTF-8 character.
fn snap_char_boundary_bwd(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Snaps `offset` forward past any UTF-8 continuation bytes.
fn snap_char_boundary_fwd(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while offset < text.len() && !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}
