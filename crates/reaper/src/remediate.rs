//! Remediator: applies (or only proposes) the removals of one analysis pass.
//!
//! Decisions come from an injected [`DecisionProvider`], so the same run loop
//! serves the terminal prompt and scripted tests.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anatomist::parser::load_source;
use anatomist::path_util::display_path;
use anatomist::pipeline::{RemovalCandidate, ScanResult};
use anatomist::ParserHost;
use common::{Config, FileError, RunStamp, Symbol};

use crate::patch::{safe_by_file, stylesheet_patch, PatchGenerator, PatchSet};
use crate::safe_edit::SafeEditor;
use crate::transform::comment_out_functions;
use crate::ReaperError;

/// How a run treats the removals it finds. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Ask per class and per function.
    #[default]
    Interactive,
    /// Apply every removal, no questions.
    ApplyAll,
    /// Write patches only; no source file is touched.
    PatchOnly,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Policy::Interactive => "interactive",
            Policy::ApplyAll => "apply-all",
            Policy::PatchOnly => "patch-only",
        })
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(Policy::Interactive),
            "apply-all" => Ok(Policy::ApplyAll),
            "patch-only" => Ok(Policy::PatchOnly),
            other => Err(format!(
                "unknown fix policy '{other}' (expected interactive, apply-all or patch-only)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDecision {
    Process,
    Skip,
    /// Skip this class and every class after it.
    SkipAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionDecision {
    Comment,
    Keep,
    /// Comment this one and every remaining one in the same file.
    CommentAllInFile,
}

/// Source of per-symbol answers for an interactive run.
pub trait DecisionProvider {
    fn decide_class(&mut self, class: &str) -> ClassDecision;

    /// `excerpt` is the declaration with surrounding lines, each prefixed
    /// by its 1-based line number.
    fn decide_function(&mut self, function: &Symbol, excerpt: &str) -> FunctionDecision;
}

/// Prompts on a writer and reads one answer line per question.
pub struct ConsoleDecisions<R, W> {
    input: R,
    output: W,
}

impl ConsoleDecisions<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleDecisions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes `prompt` and returns the trimmed, lower-cased answer.
    /// `None` once input is closed.
    fn ask(&mut self, prompt: &str) -> Option<String> {
        // A broken terminal surfaces as closed input on the read below.
        let _ = write!(self.output, "{prompt}");
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_ascii_lowercase()),
        }
    }
}

impl<R: BufRead, W: Write> DecisionProvider for ConsoleDecisions<R, W> {
    fn decide_class(&mut self, class: &str) -> ClassDecision {
        let _ = writeln!(self.output, "\nUnused class: \"{class}\"");
        let prompt =
            format!("  Remove \".{class}\" from stylesheets? (y = process / n = skip / q = skip all remaining): ");
        match self.ask(&prompt).as_deref() {
            None | Some("q") => ClassDecision::SkipAll,
            Some("y" | "yes") => ClassDecision::Process,
            Some(_) => ClassDecision::Skip,
        }
    }

    fn decide_function(&mut self, function: &Symbol, excerpt: &str) -> FunctionDecision {
        let file = function.defining_file.as_deref().unwrap_or("?");
        let lines = function
            .span
            .map(|s| format!(" (lines {}-{})", s.start_line, s.end_line))
            .unwrap_or_default();
        let _ = writeln!(self.output, "\nUnused function: {} in {file}{lines}", function.name);
        let _ = writeln!(self.output, "{excerpt}");
        let prompt = "  Comment out this function? (y = comment / n = keep / a = comment all in this file): ";
        match self.ask(prompt).as_deref() {
            Some("y" | "yes") => FunctionDecision::Comment,
            Some("a") => FunctionDecision::CommentAllInFile,
            _ => FunctionDecision::Keep,
        }
    }
}

/// Pre-recorded answers, consumed in order. Once exhausted, classes are
/// skipped and functions kept.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    classes: VecDeque<ClassDecision>,
    functions: VecDeque<FunctionDecision>,
    /// Every excerpt shown, in order.
    pub excerpts: Vec<String>,
}

impl ScriptedDecisions {
    pub fn new(
        classes: impl IntoIterator<Item = ClassDecision>,
        functions: impl IntoIterator<Item = FunctionDecision>,
    ) -> Self {
        Self {
            classes: classes.into_iter().collect(),
            functions: functions.into_iter().collect(),
            excerpts: Vec::new(),
        }
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide_class(&mut self, _class: &str) -> ClassDecision {
        self.classes.pop_front().unwrap_or(ClassDecision::Skip)
    }

    fn decide_function(&mut self, _function: &Symbol, excerpt: &str) -> FunctionDecision {
        self.excerpts.push(excerpt.to_string());
        self.functions.pop_front().unwrap_or(FunctionDecision::Keep)
    }
}

/// What a remediation run did.
#[derive(Debug, Default)]
pub struct RemediationReport {
    /// Files rewritten in place, in the order they were written.
    pub changed_files: Vec<PathBuf>,
    pub classes_removed: Vec<String>,
    pub functions_commented: Vec<String>,
    /// Only filled under [`Policy::PatchOnly`].
    pub patches: PatchSet,
    pub skipped: Vec<FileError>,
    pub backups: usize,
}

pub struct Remediator {
    root: PathBuf,
    config: Config,
    stamp: RunStamp,
}

impl Remediator {
    pub fn new(root: &Path, config: &Config, stamp: RunStamp) -> Self {
        Self {
            root: root.to_path_buf(),
            config: config.clone(),
            stamp,
        }
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    /// Runs one remediation pass under `policy`.
    ///
    /// # Errors
    /// Only fatal conditions: grammar load failure or, under
    /// [`Policy::PatchOnly`], an uncreatable patch directory. Per-file read,
    /// parse and write failures land in `RemediationReport::skipped`.
    pub fn run(
        &self,
        scan: &ScanResult,
        candidates: &[RemovalCandidate],
        policy: Policy,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<RemediationReport, ReaperError> {
        tracing::info!(%policy, stamp = %self.stamp, "remediation started");
        let mut report = RemediationReport::default();

        if policy == Policy::PatchOnly {
            let mut generator = PatchGenerator::new(&self.root, &self.config, self.stamp.clone());
            report.patches = generator.generate(scan, candidates)?;
            return Ok(report);
        }

        let mut editor = SafeEditor::new(self.stamp.clone());
        let mut host = ParserHost::new()?;

        let accepted = self.accept_classes(&scan.result.unused_classes, policy, decisions);
        if !accepted.is_empty() {
            for path in &scan.files.stylesheets {
                let Some((_, modified)) = stylesheet_patch(&mut host, path, &accepted) else {
                    continue;
                };
                self.write(&mut editor, &mut report, path, &modified);
            }
            report.classes_removed = accepted.into_iter().collect();
        }

        for (shown, functions) in safe_by_file(candidates) {
            let path = scan.files.resolve(&shown);
            let source = match load_source(&path) {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(file = %shown, error = %err, "function removal skipped: unreadable");
                    report.skipped.push(FileError {
                        file: shown,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let chosen = self.accept_functions(&source, functions, policy, decisions);
            if chosen.is_empty() {
                continue;
            }
            let (modified, applied) = comment_out_functions(&source, &chosen, &self.stamp.iso);
            if applied == 0 {
                continue;
            }
            if self.write(&mut editor, &mut report, &path, &modified) {
                report
                    .functions_commented
                    .extend(chosen.iter().map(|f| f.symbol_id()));
            }
        }

        report.backups = editor.backup_count();
        Ok(report)
    }

    fn accept_classes(
        &self,
        unused: &[String],
        policy: Policy,
        decisions: &mut dyn DecisionProvider,
    ) -> BTreeSet<String> {
        if policy == Policy::ApplyAll {
            return unused.iter().cloned().collect();
        }
        let mut accepted = BTreeSet::new();
        for class in unused {
            match decisions.decide_class(class) {
                ClassDecision::Process => {
                    accepted.insert(class.clone());
                }
                ClassDecision::Skip => {}
                ClassDecision::SkipAll => break,
            }
        }
        accepted
    }

    fn accept_functions<'s>(
        &self,
        source: &str,
        mut functions: Vec<&'s Symbol>,
        policy: Policy,
        decisions: &mut dyn DecisionProvider,
    ) -> Vec<&'s Symbol> {
        functions.sort_by_key(|f| f.span.map(|s| s.start_byte));
        if policy == Policy::ApplyAll {
            return functions;
        }
        let mut chosen = Vec::new();
        let mut rest_of_file = false;
        for function in functions {
            if rest_of_file {
                chosen.push(function);
                continue;
            }
            let shown = excerpt(source, function, self.config.excerpt_context);
            match decisions.decide_function(function, &shown) {
                FunctionDecision::Comment => chosen.push(function),
                FunctionDecision::Keep => {}
                FunctionDecision::CommentAllInFile => {
                    rest_of_file = true;
                    chosen.push(function);
                }
            }
        }
        chosen
    }

    /// Backs up and rewrites one file; failures are recorded, not raised.
    fn write(
        &self,
        editor: &mut SafeEditor,
        report: &mut RemediationReport,
        path: &Path,
        content: &str,
    ) -> bool {
        let shown = display_path(&self.root, path);
        match editor.rewrite(path, content) {
            Ok(()) => {
                if !report.changed_files.iter().any(|p| p == path) {
                    report.changed_files.push(path.to_path_buf());
                }
                true
            }
            Err(err) => {
                tracing::warn!(file = %shown, error = %err, "rewrite failed; file left as is");
                report.skipped.push(FileError {
                    file: shown,
                    reason: err.to_string(),
                });
                false
            }
        }
    }
}

/// The declaration's lines plus `context` lines either side, numbered.
pub fn excerpt(source: &str, function: &Symbol, context: usize) -> String {
    let Some(span) = function.span else {
        return String::new();
    };
    let lines: Vec<&str> = source.split('\n').collect();
    let first = (span.start_line as usize).saturating_sub(1).saturating_sub(context);
    let last = ((span.end_line as usize).saturating_sub(1) + context).min(lines.len().saturating_sub(1));

    (first..=last)
        .map(|i| format!("{}: {}", i + 1, lines[i]))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SourceSpan;

    fn symbol(start_line: u32, end_line: u32) -> Symbol {
        Symbol::js_function(
            "f",
            "app.js",
            SourceSpan {
                start_byte: 0,
                end_byte: 0,
                start_line,
                end_line,
            },
        )
    }

    #[test]
    fn test_policy_round_trips_through_str() {
        for policy in [Policy::Interactive, Policy::ApplyAll, Policy::PatchOnly] {
            assert_eq!(policy.to_string().parse::<Policy>(), Ok(policy));
        }
        assert!("everything".parse::<Policy>().is_err());
    }

    #[test]
    fn test_excerpt_context_is_clamped() {
        let src = "l1\nl2\nl3\nl4\nl5\nl6";
        assert_eq!(excerpt(src, &symbol(2, 3), 1), "1: l1\n2: l2\n3: l3\n4: l4");
        assert_eq!(excerpt(src, &symbol(1, 1), 3), "1: l1\n2: l2\n3: l3\n4: l4");
        assert_eq!(excerpt(src, &symbol(6, 6), 3), "3: l3\n4: l4\n5: l5\n6: l6");
    }

    #[test]
    fn test_console_answers() {
        let input = b"y\nn\nq\n".as_slice();
        let mut out = Vec::new();
        let mut console = ConsoleDecisions::new(input, &mut out);
        assert_eq!(console.decide_class("a"), ClassDecision::Process);
        assert_eq!(console.decide_class("b"), ClassDecision::Skip);
        assert_eq!(console.decide_class("c"), ClassDecision::SkipAll);
        assert_eq!(console.decide_class("d"), ClassDecision::SkipAll);
        drop(console);
        assert!(String::from_utf8(out).unwrap().contains("Unused class: \"a\""));
    }

    #[test]
    fn test_console_function_answers() {
        let input = b"a\n\n".as_slice();
        let mut console = ConsoleDecisions::new(input, Vec::new());
        let f = symbol(1, 1);
        assert_eq!(console.decide_function(&f, "1: x"), FunctionDecision::CommentAllInFile);
        assert_eq!(console.decide_function(&f, "1: x"), FunctionDecision::Keep);
        assert_eq!(console.decide_function(&f, "1: x"), FunctionDecision::Keep);
    }

    #[test]
    fn test_scripted_defaults_when_exhausted() {
        let mut scripted = ScriptedDecisions::new([ClassDecision::Process], []);
        assert_eq!(scripted.decide_class("a"), ClassDecision::Process);
        assert_eq!(scripted.decide_class("b"), ClassDecision::Skip);
        assert_eq!(scripted.decide_function(&symbol(1, 1), "1: x"), FunctionDecision::Keep);
        assert_eq!(scripted.excerpts, vec!["1: x"]);
    }
}
