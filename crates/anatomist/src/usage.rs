//! Usage Extractor: one file in, one [`Contribution`] out.
//!
//! The pass folds contributions into [`UsageTables`]; a file that cannot be
//! read becomes a [`FileError`] and contributes nothing.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use common::wisdom::is_deprecated_tag;
use common::{Diagnostic, FileError, Symbol};

use crate::heuristics::{self, ClassRule};
use crate::parser::{load_source, script_facts};
use crate::{lint, markup, stylesheet, AnatomistError, FileKind, ParserHost};

/// What a single file adds to the pass.
#[derive(Debug, Default)]
pub struct Contribution {
    pub defined_classes: BTreeSet<String>,
    pub used_classes: HashSet<String>,
    /// Every element name seen; deprecation is decided when folding.
    pub tags: BTreeSet<String>,
    pub functions: Vec<Symbol>,
    pub references: HashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parsers plus the class-token rule list, reused across a pass.
pub struct UsageExtractor {
    host: ParserHost,
    rules: Vec<Box<dyn ClassRule>>,
}

impl UsageExtractor {
    pub fn new() -> Result<Self, AnatomistError> {
        Self::with_rules(heuristics::default_rules())
    }

    pub fn with_rules(rules: Vec<Box<dyn ClassRule>>) -> Result<Self, AnatomistError> {
        Ok(Self {
            host: ParserHost::new()?,
            rules,
        })
    }

    /// Reads and dissects one file.
    ///
    /// `shown` is the root-relative path recorded on symbols and diagnostics.
    pub fn extract_file(
        &mut self,
        kind: FileKind,
        path: &Path,
        shown: &str,
    ) -> Result<Contribution, AnatomistError> {
        let source = load_source(path)?;
        self.extract_source(kind, &source, shown)
    }

    pub fn extract_source(
        &mut self,
        kind: FileKind,
        source: &str,
        shown: &str,
    ) -> Result<Contribution, AnatomistError> {
        match kind {
            FileKind::Markup => self.extract_markup(source),
            FileKind::Stylesheet => self.extract_stylesheet(source),
            FileKind::Script => self.extract_script(source, shown),
        }
    }

    fn extract_markup(&mut self, source: &str) -> Result<Contribution, AnatomistError> {
        let tree = self.host.parse_markup(source)?;
        let facts = markup::markup_facts(&tree, source);

        let mut out = Contribution {
            used_classes: facts.class_tokens.into_iter().collect(),
            tags: facts.tags,
            ..Default::default()
        };

        for style in &facts.styles {
            let tree = self.host.parse_stylesheet(style)?;
            out.defined_classes
                .extend(stylesheet::defined_classes(&tree, style));
        }
        for script in facts.scripts.iter().chain(facts.handlers.iter()) {
            out.used_classes
                .extend(heuristics::extract_class_tokens(&self.rules, script));
            let tree = self.host.parse_script(script)?;
            out.references
                .extend(script_facts(&tree, script, "").references);
        }
        Ok(out)
    }

    fn extract_stylesheet(&mut self, source: &str) -> Result<Contribution, AnatomistError> {
        let tree = self.host.parse_stylesheet(source)?;
        Ok(Contribution {
            defined_classes: stylesheet::defined_classes(&tree, source),
            ..Default::default()
        })
    }

    fn extract_script(&mut self, source: &str, shown: &str) -> Result<Contribution, AnatomistError> {
        let (tree, facts) = self.host.dissect_script(source, shown)?;
        if let Some(err) = &facts.syntax_error {
            tracing::warn!(file = shown, line = err.line, "{}; declarations and references skipped", err.message);
        }
        Ok(Contribution {
            used_classes: heuristics::extract_class_tokens(&self.rules, source),
            functions: facts.functions,
            references: facts.references,
            diagnostics: lint::lint(&tree, source, shown),
            ..Default::default()
        })
    }
}

/// The folded usage model of one pass.
#[derive(Debug, Default)]
pub struct UsageTables {
    pub defined_classes: BTreeSet<String>,
    pub used_classes: HashSet<String>,
    pub deprecated_tags: BTreeSet<String>,
    /// Declarations keyed by (file, name); the first one per key is kept.
    pub functions: Vec<Symbol>,
    pub references: HashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub skipped: Vec<FileError>,
}

impl UsageTables {
    pub fn fold(&mut self, file: &str, outcome: Result<Contribution, AnatomistError>) {
        let contribution = match outcome {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(file, error = %err, "skipping file");
                self.skipped.push(FileError {
                    file: file.to_string(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        self.defined_classes.extend(contribution.defined_classes);
        self.used_classes.extend(contribution.used_classes);
        self.deprecated_tags.extend(
            contribution
                .tags
                .into_iter()
                .filter(|t| is_deprecated_tag(t)),
        );
        for function in contribution.functions {
            let duplicate = self
                .functions
                .iter()
                .any(|f| f.name == function.name && f.defining_file == function.defining_file);
            if !duplicate {
                self.functions.push(function);
            }
        }
        self.references.extend(contribution.references);
        self.diagnostics.extend(contribution.diagnostics);
    }
}
