//! # Snapshot: the last computed analysis result
//!
//! One writer (the analysis pass) replaces the whole value; any number of
//! readers (dashboard, reporters) take a cheap `Arc` clone of whatever is
//! current. Starts empty at generation 0.

use crate::AnalysisResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Location of the persisted snapshot, relative to the project root.
pub const SNAPSHOT_FILE: &str = ".deadwatcher/last-result.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generation: u64,
    /// Unix millis of the pass that produced `result`; empty before the first pass.
    #[serde(default)]
    pub stamp: String,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotSlot {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a slot with a previously persisted snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Replaces the current value and returns the new generation.
    pub fn publish(&self, result: AnalysisResult, stamp: impl Into<String>) -> u64 {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let generation = guard.generation + 1;
        *guard = Arc::new(Snapshot {
            generation,
            stamp: stamp.into(),
            result,
        });
        generation
    }

    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn generation(&self) -> u64 {
        self.current().generation
    }
}

pub fn snapshot_path(root: &Path) -> PathBuf {
    root.join(SNAPSHOT_FILE)
}

/// Writes `snapshot` as pretty JSON, creating the parent directory.
pub fn save(snapshot: &Snapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("No snapshot at {}. Run `deadwatcher scan` first.", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed snapshot {}", path.display()))
}
