//! Dead-symbol resolution pipeline.
//!
//! Stages:
//! - **Discover**: walk the project into markup / stylesheet / script lists.
//! - **Extract**: one [`Contribution`](crate::usage::Contribution) per file,
//!   folded into [`UsageTables`]; unreadable files are recorded, never fatal.
//! - **Resolve**: set arithmetic over the tables:
//!   `unusedClasses = (defined − used) − ignored`, deprecated tags as found,
//!   `jsUnused = declared − referenced`.
//!
//! Reporting stops there. Removal additionally asks the
//! [`ReferenceResolver`] for a SAFE verdict per function
//! ([`removal_candidates`]): report liberally, remove conservatively.

use std::collections::BTreeMap;
use std::path::Path;

use common::wisdom::tag_suggestion;
use common::{AnalysisResult, Config, IgnoreSet, Severity, Symbol, UnusedFunction};

use crate::resolver::{ReferenceResolver, Verdict};
use crate::scan::ProjectFiles;
use crate::usage::{UsageExtractor, UsageTables};

/// Results of a full pipeline run.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: ProjectFiles,
    pub result: AnalysisResult,
    /// Declarations behind `result.js_unused`, spans included.
    pub unused_functions: Vec<Symbol>,
    pub stats: PassStats,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub files: usize,
    pub defined_classes: usize,
    pub used_classes: usize,
    pub functions: usize,
}

/// A function proposed for removal with its resolver verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalCandidate {
    pub symbol: Symbol,
    pub verdict: Verdict,
}

/// Runs discovery, extraction and resolution against a project directory.
///
/// # Errors
/// Fails only if the root cannot be walked or a grammar fails to load.
/// Per-file failures land in `result.skipped_files`.
pub fn run(project_root: &Path, config: &Config) -> anyhow::Result<ScanResult> {
    let files = ProjectFiles::discover(project_root, config)?;
    let mut extractor = UsageExtractor::new()?;
    let mut tables = UsageTables::default();

    for (kind, path) in files.all() {
        let shown = files.display(path);
        let outcome = extractor.extract_file(kind, path, &shown);
        tables.fold(&shown, outcome);
    }

    let stats = PassStats {
        files: files.len(),
        defined_classes: tables.defined_classes.len(),
        used_classes: tables.used_classes.len(),
        functions: tables.functions.len(),
    };
    let (result, unused_functions) = resolve(tables, &config.ignore_classes);

    tracing::debug!(
        files = stats.files,
        defined = stats.defined_classes,
        used = stats.used_classes,
        functions = stats.functions,
        unused_classes = result.unused_classes.len(),
        unused_functions = unused_functions.len(),
        skipped = result.skipped_files.len(),
        "analysis pass complete"
    );

    Ok(ScanResult {
        files,
        result,
        unused_functions,
        stats,
    })
}

/// Folds usage tables into the reported result.
pub fn resolve(tables: UsageTables, ignore: &IgnoreSet) -> (AnalysisResult, Vec<Symbol>) {
    let UsageTables {
        defined_classes,
        used_classes,
        deprecated_tags,
        functions,
        references,
        diagnostics,
        skipped,
    } = tables;

    let unused_classes: Vec<String> = defined_classes
        .into_iter()
        .filter(|c| !used_classes.contains(c))
        .filter(|c| !ignore.is_ignored(c))
        .collect();

    let deprecated_tags: Vec<String> = deprecated_tags.into_iter().collect();
    let tag_suggestions: BTreeMap<String, Option<String>> = deprecated_tags
        .iter()
        .map(|t| (t.clone(), tag_suggestion(t).map(str::to_string)))
        .collect();

    let unused_functions: Vec<Symbol> = functions
        .into_iter()
        .filter(|f| !references.contains(&f.name))
        .collect();
    let js_unused: Vec<UnusedFunction> = unused_functions
        .iter()
        .map(|f| UnusedFunction {
            name: f.name.clone(),
            file: f.defining_file.clone().unwrap_or_default(),
        })
        .collect();

    let (js_errors, js_warnings): (Vec<_>, Vec<_>) = diagnostics
        .into_iter()
        .partition(|d| d.severity == Severity::Error);

    let result = AnalysisResult {
        unused_classes,
        deprecated_tags,
        js_unused,
        js_errors,
        js_warnings,
        tag_suggestions,
        skipped_files: skipped,
    };
    (result, unused_functions)
}

/// Unused functions paired with their removal verdict.
///
/// # Errors
/// Propagates resolver automaton construction failure.
pub fn removal_candidates(
    scan: &ScanResult,
    config: &Config,
) -> anyhow::Result<Vec<RemovalCandidate>> {
    if scan.unused_functions.is_empty() {
        return Ok(Vec::new());
    }
    let resolver = ReferenceResolver::new(&scan.files.root, config);
    let verdicts = resolver.resolve(&scan.unused_functions)?;

    let candidates: Vec<RemovalCandidate> = scan
        .unused_functions
        .iter()
        .cloned()
        .zip(verdicts)
        .map(|(symbol, verdict)| RemovalCandidate { symbol, verdict })
        .collect();

    for c in candidates.iter() {
        if let Verdict::Unsafe(reason) = &c.verdict {
            tracing::info!(symbol = %c.symbol.symbol_id(), %reason, "kept: possible use");
        }
    }
    Ok(candidates)
}
