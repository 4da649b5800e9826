//! Console rendering for scan, fix and revert results.

use std::fmt::Write;
use std::path::Path;

use anatomist::path_util::display_path;
use anatomist::pipeline::PassStats;
use common::{AnalysisResult, Diagnostic, RunStamp};
use reaper::remediate::RemediationReport;
use reaper::{Policy, RevertOutcome};

const RULE: &str = "+------------------------------------------+";

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "| {title:<40} |");
    let _ = writeln!(out, "{RULE}");
}

fn row(out: &mut String, label: &str, value: usize) {
    let _ = writeln!(out, "| {label:<17}: {value:>21} |");
}

pub fn render_report(result: &AnalysisResult, stats: &PassStats) -> String {
    let mut out = String::new();
    header(&mut out, "DEADWATCHER SCAN");
    row(&mut out, "Files analysed", stats.files);
    row(&mut out, "Unused classes", result.unused_classes.len());
    row(&mut out, "Deprecated tags", result.deprecated_tags.len());
    row(&mut out, "Unused functions", result.js_unused.len());
    row(&mut out, "JS errors", result.js_errors.len());
    row(&mut out, "JS warnings", result.js_warnings.len());
    row(&mut out, "Skipped files", result.skipped_files.len());
    let _ = writeln!(out, "{RULE}");

    if result.is_clean() {
        let _ = writeln!(out, "No dead code detected.");
    }

    if !result.unused_classes.is_empty() {
        let _ = writeln!(out, "\nUNUSED CSS CLASSES:");
        for class in &result.unused_classes {
            let _ = writeln!(out, "  .{class}");
        }
    }

    if !result.deprecated_tags.is_empty() {
        let _ = writeln!(out, "\nDEPRECATED HTML TAGS:");
        for tag in &result.deprecated_tags {
            match result.tag_suggestions.get(tag).and_then(|s| s.as_deref()) {
                Some(advice) => {
                    let _ = writeln!(out, "  <{tag}> - {advice}");
                }
                None => {
                    let _ = writeln!(out, "  <{tag}>");
                }
            }
        }
    }

    if !result.js_unused.is_empty() {
        let _ = writeln!(out, "\nUNUSED JS FUNCTIONS:");
        for f in &result.js_unused {
            let _ = writeln!(out, "  {} - {}", f.file, f.name);
        }
    }

    diagnostics(&mut out, "JS ERRORS", &result.js_errors);
    diagnostics(&mut out, "JS WARNINGS", &result.js_warnings);

    if !result.skipped_files.is_empty() {
        let _ = writeln!(out, "\nSKIPPED FILES:");
        for skipped in &result.skipped_files {
            let _ = writeln!(out, "  {skipped}");
        }
    }
    out
}

fn diagnostics(out: &mut String, title: &str, list: &[Diagnostic]) {
    if list.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for d in list {
        let _ = writeln!(out, "  {}:{} [{}] {}", d.file, d.line, d.rule_id, d.message);
        let _ = writeln!(out, "      hint: {}", d.suggestion);
    }
}

pub fn print_report(result: &AnalysisResult, stats: &PassStats) {
    print!("{}", render_report(result, stats));
}

pub fn render_remediation(
    report: &RemediationReport,
    stamp: &RunStamp,
    policy: Policy,
    root: &Path,
) -> String {
    let mut out = String::new();
    header(&mut out, &format!("DEADWATCHER FIX ({policy})"));

    if policy == Policy::PatchOnly {
        row(&mut out, "Patches written", report.patches.patches.len());
        let _ = writeln!(out, "{RULE}");
        for patch in &report.patches.patches {
            let _ = writeln!(out, "  {}", display_path(root, patch));
        }
        if let Some(manifest) = &report.patches.manifest {
            let _ = writeln!(out, "Manifest: {}", display_path(root, manifest));
        }
        if report.patches.is_empty() {
            let _ = writeln!(out, "Nothing to patch.");
        }
        return out;
    }

    row(&mut out, "Classes removed", report.classes_removed.len());
    row(&mut out, "Functions removed", report.functions_commented.len());
    row(&mut out, "Files changed", report.changed_files.len());
    row(&mut out, "Backups taken", report.backups);
    let _ = writeln!(out, "{RULE}");

    for file in &report.changed_files {
        let _ = writeln!(out, "  updated {}", display_path(root, file));
    }
    for skipped in &report.skipped {
        let _ = writeln!(out, "  skipped {skipped}");
    }
    if report.changed_files.is_empty() {
        let _ = writeln!(out, "Nothing changed.");
    } else {
        let _ = writeln!(
            out,
            "Undo with: deadwatcher revert {} {}",
            root.display(),
            stamp.millis
        );
    }
    out
}

pub fn print_remediation(report: &RemediationReport, stamp: &RunStamp, policy: Policy, root: &Path) {
    print!("{}", render_remediation(report, stamp, policy, root));
}

pub fn render_revert(outcome: &RevertOutcome, root: &Path) -> String {
    let mut out = String::new();
    match outcome {
        RevertOutcome::Restored { restored } => {
            let _ = writeln!(out, "Restored {} file(s):", restored.len());
            for r in restored {
                let _ = writeln!(
                    out,
                    "  {} <- {}",
                    display_path(root, &r.restored_to),
                    display_path(root, &r.backup)
                );
            }
        }
        RevertOutcome::Miss { message } => {
            let _ = writeln!(out, "{message}");
        }
    }
    out
}
