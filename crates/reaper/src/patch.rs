//! Patch Generator: proposes removals as diff files without touching sources.
//!
//! One run writes `<patches>/<millis>_<basename>.diff` per changed file and a
//! `suggested-changes.<millis>.json` manifest listing all of them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anatomist::parser::load_source;
use anatomist::path_util::{base_name, display_path};
use anatomist::pipeline::{RemovalCandidate, ScanResult};
use anatomist::ParserHost;
use common::{Config, PatchKind, RunStamp, Suggestion, SuggestionManifest, Symbol};

use crate::diff::line_diff;
use crate::transform::{comment_out_functions, strip_classes};
use crate::ReaperError;

/// What one generator run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    pub patches: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub suggestions: Vec<Suggestion>,
}

impl PatchSet {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

pub struct PatchGenerator {
    root: PathBuf,
    patches_dir: PathBuf,
    stamp: RunStamp,
    /// Patch names handed out this run, for collision suffixes.
    names: HashMap<String, usize>,
    dir_ready: bool,
}

impl PatchGenerator {
    pub fn new(root: &Path, config: &Config, stamp: RunStamp) -> Self {
        Self {
            root: root.to_path_buf(),
            patches_dir: config.patches_path(root),
            stamp,
            names: HashMap::new(),
            dir_ready: false,
        }
    }

    pub fn patches_dir(&self) -> &Path {
        &self.patches_dir
    }

    /// Writes a patch for every stylesheet that loses a class and every
    /// script holding a SAFE unused function, then the run manifest.
    ///
    /// # Errors
    /// `ReaperError::PatchDir` if the patch directory cannot be created.
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn generate(
        &mut self,
        scan: &ScanResult,
        candidates: &[RemovalCandidate],
    ) -> Result<PatchSet, ReaperError> {
        let mut host = ParserHost::new()?;
        let mut set = PatchSet::default();

        let classes: BTreeSet<String> = scan.result.unused_classes.iter().cloned().collect();
        if !classes.is_empty() {
            for path in &scan.files.stylesheets {
                let Some((original, modified)) = stylesheet_patch(&mut host, path, &classes) else {
                    continue;
                };
                self.emit(&mut set, path, PatchKind::CssClassRemoval, &original, &modified)?;
            }
        }

        for (shown, functions) in safe_by_file(candidates) {
            let path = scan.files.resolve(&shown);
            let original = match load_source(&path) {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(file = %shown, error = %err, "patch skipped: unreadable");
                    continue;
                }
            };
            let (modified, applied) = comment_out_functions(&original, &functions, &self.stamp.iso);
            if applied == 0 || modified == original {
                continue;
            }
            self.emit(&mut set, &path, PatchKind::JsFunctionComment, &original, &modified)?;
        }

        if !set.suggestions.is_empty() {
            set.manifest = Some(self.write_manifest(&set.suggestions)?);
        }
        Ok(set)
    }

    fn emit(
        &mut self,
        set: &mut PatchSet,
        target: &Path,
        kind: PatchKind,
        original: &str,
        modified: &str,
    ) -> Result<(), ReaperError> {
        let shown = display_path(&self.root, target);
        let diff = line_diff(&shown, original, modified);
        let patch_path = self.write_patch(target, &diff)?;
        tracing::info!(file = %shown, patch = %patch_path.display(), %kind, "patch written");

        set.suggestions.push(Suggestion {
            file: shown,
            kind,
            patch: display_path(&self.root, &patch_path),
            timestamp: self.stamp.millis.clone(),
        });
        set.patches.push(patch_path);
        Ok(())
    }

    fn ensure_dir(&mut self) -> Result<(), ReaperError> {
        if !self.dir_ready {
            std::fs::create_dir_all(&self.patches_dir).map_err(|source| ReaperError::PatchDir {
                path: self.patches_dir.clone(),
                source,
            })?;
            self.dir_ready = true;
        }
        Ok(())
    }

    /// `<millis>_<basename>.diff`; repeated basenames get `-2`, `-3`, ...
    fn patch_name(&mut self, target: &Path) -> String {
        let stem = format!("{}_{}", self.stamp.millis, base_name(target));
        let seen = self.names.entry(stem.clone()).or_insert(0);
        *seen += 1;
        match *seen {
            1 => format!("{stem}.diff"),
            n => format!("{stem}-{n}.diff"),
        }
    }

    fn write_patch(&mut self, target: &Path, diff: &str) -> Result<PathBuf, ReaperError> {
        self.ensure_dir()?;
        let name = self.patch_name(target);
        let path = self.patches_dir.join(name);
        std::fs::write(&path, diff)?;
        Ok(path)
    }

    fn write_manifest(&mut self, suggestions: &[Suggestion]) -> Result<PathBuf, ReaperError> {
        self.ensure_dir()?;
        let manifest = SuggestionManifest {
            timestamp: self.stamp.millis.clone(),
            suggestions: suggestions.to_vec(),
        };
        let path = self
            .patches_dir
            .join(format!("suggested-changes.{}.json", self.stamp.millis));
        std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        Ok(path)
    }
}

/// Original and stripped text of one stylesheet, if stripping changes it.
pub(crate) fn stylesheet_patch(
    host: &mut ParserHost,
    path: &Path,
    classes: &BTreeSet<String>,
) -> Option<(String, String)> {
    let original = match load_source(path) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(file = %path.display(), error = %err, "stylesheet skipped: unreadable");
            return None;
        }
    };
    let tree = match host.parse_stylesheet(&original) {
        Ok(t) => t,
        Err(err) => {
            tracing::warn!(file = %path.display(), error = %err, "stylesheet skipped: parse failure");
            return None;
        }
    };
    let outcome = strip_classes(&tree, &original, classes);
    outcome.changed().then_some((original, outcome.content))
}

/// SAFE candidates grouped by defining file, in path order.
pub(crate) fn safe_by_file(candidates: &[RemovalCandidate]) -> BTreeMap<String, Vec<&Symbol>> {
    let mut by_file: BTreeMap<String, Vec<&Symbol>> = BTreeMap::new();
    for candidate in candidates.iter().filter(|c| c.verdict.is_safe()) {
        if let Some(file) = &candidate.symbol.defining_file {
            by_file.entry(file.clone()).or_default().push(&candidate.symbol);
        }
    }
    by_file
}

#[cfg(test)]
mod tests {
    use super::*;
    use anatomist::Verdict;
    use common::SourceSpan;

    fn stamp() -> RunStamp {
        RunStamp::from_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_patch_name_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gen = PatchGenerator::new(tmp.path(), &Config::default(), stamp());
        assert_eq!(gen.patch_name(Path::new("a/site.css")), "1700000000000_site.css.diff");
        assert_eq!(gen.patch_name(Path::new("b/site.css")), "1700000000000_site.css-2.diff");
        assert_eq!(gen.patch_name(Path::new("b/app.js")), "1700000000000_app.js.diff");
    }

    #[test]
    fn test_safe_by_file_drops_unsafe() {
        let span = SourceSpan {
            start_byte: 0,
            end_byte: 1,
            start_line: 1,
            end_line: 1,
        };
        let candidates = vec![
            RemovalCandidate {
                symbol: Symbol::js_function("a", "x.js", span),
                verdict: Verdict::Safe,
            },
            RemovalCandidate {
                symbol: Symbol::js_function("b", "x.js", span),
                verdict: Verdict::Unsafe(anatomist::UnsafeReason::SameFileReference { line: 3 }),
            },
        ];
        let grouped = safe_by_file(&candidates);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["x.js"].len(), 1);
        assert_eq!(grouped["x.js"][0].name, "a");
    }

    #[test]
    fn test_nothing_to_do_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::default();
        let scan = anatomist::pipeline::run(tmp.path(), &config).unwrap();
        let mut gen = PatchGenerator::new(&scan.files.root, &config, stamp());
        let set = gen.generate(&scan, &[]).unwrap();
        assert!(set.is_empty());
        assert!(set.manifest.is_none());
        assert!(!gen.patches_dir().exists());
    }
}
