//! Script Reference Resolver: decides whether removing a function is safe.
//!
//! A candidate is SAFE only if its name has no whole-word occurrence anywhere
//! in the reference corpus outside the candidate's own declaration span. The
//! first occurrence found decides the UNSAFE reason.
//!
//! **Memory model**: one mmap per corpus file, one Aho-Corasick automaton
//! for all candidate names.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasick, MatchKind};
use common::{Config, Symbol};
use memmap2::Mmap;

use crate::path_util::display_path;
use crate::scan::reference_corpus;

/// Why a candidate may still be in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafeReason {
    /// Named again in its own file, outside its declaration.
    SameFileReference { line: u32 },
    /// Inside quotes in another file (`"helper"`, `` `helper` ``).
    StringEmbedding { file: String, line: u32 },
    /// After `.` or `?.` in another file (`obj.helper`).
    PropertyAccess { file: String, line: u32 },
    /// Followed by a call in another file (`helper(`).
    DynamicCall { file: String, line: u32 },
    /// Any other whole-word occurrence in another file.
    CrossFileReference { file: String, line: u32 },
}

impl fmt::Display for UnsafeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsafeReason::SameFileReference { line } => {
                write!(f, "referenced again in its own file (line {line})")
            }
            UnsafeReason::StringEmbedding { file, line } => {
                write!(f, "named inside a string at {file}:{line}")
            }
            UnsafeReason::PropertyAccess { file, line } => {
                write!(f, "accessed as a property at {file}:{line}")
            }
            UnsafeReason::DynamicCall { file, line } => write!(f, "called at {file}:{line}"),
            UnsafeReason::CrossFileReference { file, line } => {
                write!(f, "referenced at {file}:{line}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe(UnsafeReason),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

pub struct ReferenceResolver {
    root: PathBuf,
    corpus: Vec<PathBuf>,
}

impl ReferenceResolver {
    /// Resolver over every text file under `root` (see [`reference_corpus`]).
    pub fn new(root: &Path, config: &Config) -> Self {
        Self {
            root: root.to_path_buf(),
            corpus: reference_corpus(root, config),
        }
    }

    pub fn with_corpus(root: &Path, corpus: Vec<PathBuf>) -> Self {
        Self {
            root: root.to_path_buf(),
            corpus,
        }
    }

    pub fn corpus(&self) -> &[PathBuf] {
        &self.corpus
    }

    /// Returns one verdict per candidate, in order.
    ///
    /// Candidates must be `JsFunction` symbols with a span; anything else is
    /// judged UNSAFE by its first occurrence like any other name.
    ///
    /// # Errors
    /// Returns an `anyhow::Error` only if automaton construction fails.
    /// Unreadable corpus files are skipped with a warning.
    pub fn resolve(&self, candidates: &[Symbol]) -> anyhow::Result<Vec<Verdict>> {
        let mut verdicts = vec![Verdict::Safe; candidates.len()];
        if candidates.is_empty() {
            return Ok(verdicts);
        }

        let mut names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        // Overlapping search: `init` and `initAll` must both be seen.
        let ac = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&names)
            .map_err(|e| anyhow::anyhow!("AhoCorasick build failed: {}", e))?;

        let mut undecided = candidates.len();
        for path in &self.corpus {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "reference scan skipped file");
                    continue;
                }
            };
            if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
                continue;
            }
            // SAFETY: mmap is read-only; the file handle outlives the mmap.
            let mmap = match unsafe { Mmap::map(&file) } {
                Ok(m) => m,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "reference scan skipped file");
                    continue;
                }
            };
            let bytes = &mmap[..];
            let shown = display_path(&self.root, path);

            for mat in ac.find_overlapping_iter(bytes) {
                let (start, end) = (mat.start(), mat.end());
                if !is_whole_word(bytes, start, end) {
                    continue;
                }
                let name = names[mat.pattern().as_usize()];

                for (candidate, verdict) in candidates.iter().zip(verdicts.iter_mut()) {
                    if candidate.name != name || !verdict.is_safe() {
                        continue;
                    }
                    let same_file = candidate.defining_file.as_deref() == Some(shown.as_str());
                    if same_file && candidate.span.is_some_and(|s| s.contains(start)) {
                        continue;
                    }
                    let line = line_of(bytes, start);
                    *verdict = Verdict::Unsafe(if same_file {
                        UnsafeReason::SameFileReference { line }
                    } else {
                        classify(bytes, start, end, shown.clone(), line)
                    });
                    undecided -= 1;
                }
            }

            // Early exit: every candidate already has a reason.
            if undecided == 0 {
                break;
            }
        }

        Ok(verdicts)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_whole_word(bytes: &[u8], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
    let after_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
    before_ok && after_ok
}

fn line_of(bytes: &[u8], offset: usize) -> u32 {
    (bytes[..offset].iter().filter(|&&b| b == b'\n').count() + 1) as u32
}

fn classify(bytes: &[u8], start: usize, end: usize, file: String, line: u32) -> UnsafeReason {
    let is_quote = |b: u8| matches!(b, b'"' | b'\'' | b'`');
    let prev = start.checked_sub(1).map(|i| bytes[i]);
    let next = bytes.get(end).copied();

    if prev.is_some_and(is_quote) || next.is_some_and(is_quote) {
        return UnsafeReason::StringEmbedding { file, line };
    }
    if prev == Some(b'.') {
        return UnsafeReason::PropertyAccess { file, line };
    }
    let next_token = bytes[end..].iter().find(|b| !b.is_ascii_whitespace());
    if next_token == Some(&b'(') {
        return UnsafeReason::DynamicCall { file, line };
    }
    UnsafeReason::CrossFileReference { file, line }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SourceSpan;
    use std::fs;

    /// Writes `files` under a fresh root and returns (root, resolver).
    fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, ReferenceResolver) {
        let tmp = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let root = dunce::canonicalize(tmp.path()).unwrap();
        let resolver = ReferenceResolver::new(&root, &Config::default());
        (tmp, resolver)
    }

    fn candidate(name: &str, file: &str, source: &str) -> Symbol {
        let decl = format!("function {name}");
        let start = source.find(&decl).unwrap();
        let end = start + source[start..].find('}').unwrap() + 1;
        Symbol::js_function(
            name,
            file,
            SourceSpan {
                start_byte: start as u32,
                end_byte: end as u32,
                start_line: 1,
                end_line: 1,
            },
        )
    }

    #[test]
    fn test_no_occurrence_is_safe() {
        let src = "function helper() { return 1; }\n";
        let (_tmp, resolver) = project(&[("app.js", src), ("index.html", "<p>hi</p>")]);
        let verdicts = resolver.resolve(&[candidate("helper", "app.js", src)]).unwrap();
        assert_eq!(verdicts, vec![Verdict::Safe]);
    }

    #[test]
    fn test_recursion_inside_own_span_is_safe() {
        let src = "function loop(n) { return n && loop(n - 1); }\n";
        let (_tmp, resolver) = project(&[("app.js", src)]);
        let verdicts = resolver.resolve(&[candidate("loop", "app.js", src)]).unwrap();
        assert!(verdicts[0].is_safe());
    }

    #[test]
    fn test_same_file_reference() {
        let src = "function helper() {}\nconst h = helper;\n";
        let (_tmp, resolver) = project(&[("app.js", src)]);
        let verdicts = resolver.resolve(&[candidate("helper", "app.js", src)]).unwrap();
        assert_eq!(verdicts[0], Verdict::Unsafe(UnsafeReason::SameFileReference { line: 2 }));
    }

    #[test]
    fn test_injected_usage_in_other_files() {
        let src = "function helper() {}\n";
        let cases = [
            ("<button onclick=\"track(); helper()\">", "DynamicCall"),
            ("<button onclick=\"helper()\">", "StringEmbedding"),
            ("window['helper'];", "StringEmbedding"),
            ("api.helper;", "PropertyAccess"),
            ("export { helper as h };", "CrossFileReference"),
        ];
        for (usage, expected) in cases {
            let (_tmp, resolver) = project(&[("app.js", src), ("other.html", usage)]);
            let verdict = resolver.resolve(&[candidate("helper", "app.js", src)]).unwrap();
            let Verdict::Unsafe(reason) = &verdict[0] else {
                panic!("expected UNSAFE for {usage}");
            };
            assert!(format!("{reason:?}").starts_with(expected), "{usage}: {reason:?}");
        }
    }

    #[test]
    fn test_partial_words_do_not_count() {
        let src = "function help() {}\n";
        let (_tmp, resolver) = project(&[("app.js", src), ("b.js", "helper(); self_help(); helpful;")]);
        let verdicts = resolver.resolve(&[candidate("help", "app.js", src)]).unwrap();
        assert!(verdicts[0].is_safe());
    }

    #[test]
    fn test_overlapping_names_both_checked() {
        let a = "function init() {}\n";
        let b = "function initAll() {}\n";
        let (_tmp, resolver) = project(&[("a.js", a), ("b.js", b), ("c.js", "initAll();")]);
        let verdicts = resolver
            .resolve(&[candidate("init", "a.js", a), candidate("initAll", "b.js", b)])
            .unwrap();
        assert!(verdicts[0].is_safe());
        assert!(!verdicts[1].is_safe());
    }

    #[test]
    fn test_same_name_in_two_files_is_unsafe_for_both() {
        let src = "function dup() {}\n";
        let (_tmp, resolver) = project(&[("a.js", src), ("b.js", src)]);
        let verdicts = resolver
            .resolve(&[candidate("dup", "a.js", src), candidate("dup", "b.js", src)])
            .unwrap();
        assert!(!verdicts[0].is_safe());
        assert!(!verdicts[1].is_safe());
    }

    #[test]
    fn test_patches_and_snapshot_are_ignored() {
        let src = "function helper() {}\n";
        let (_tmp, resolver) = project(&[
            ("app.js", src),
            ("deadwatcher_patches/1_app.js.diff", "-function helper() {}"),
            (".deadwatcher/last-result.json", "{\"name\":\"helper\"}"),
        ]);
        let verdicts = resolver.resolve(&[candidate("helper", "app.js", src)]).unwrap();
        assert!(verdicts[0].is_safe());
    }
}
