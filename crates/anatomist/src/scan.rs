//! Project discovery: which files a pass analyses and which files the
//! reference resolver searches.
//!
//! Both walks prune the configured exclude directories plus deadwatcher's own
//! output (`.deadwatcher/` and the patch directory), so generated patches and
//! snapshots never count as usage.

use std::path::{Path, PathBuf};

use common::snapshot::SNAPSHOT_FILE;
use common::Config;
use walkdir::{DirEntry, WalkDir};

use crate::path_util::display_path;
use crate::{AnatomistError, FileKind};

/// Extensions searched for textual references to function names.
///
/// Wider than the analysed set: a function may be named from a config
/// file, a template or a framework manifest.
const REFERENCE_EXTENSIONS: &[&str] = &[
    // Web
    "html", "htm", "ejs", "css", "scss", "sass", "less", "js", "mjs", "cjs", "jsx", "ts",
    "tsx", "vue", "svelte", "hbs", "handlebars", "pug", // Config
    "json", "xml", "yaml", "yml", "toml", // Templates
    "njk", "liquid", "twig", "php",
];

/// Analysable files of one project, in sorted path order per kind.
#[derive(Debug, Clone, Default)]
pub struct ProjectFiles {
    pub root: PathBuf,
    pub markup: Vec<PathBuf>,
    /// Stylesheets that are analysed and may be rewritten.
    pub stylesheets: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
    /// Stylesheets skipped by `stylesheet_excludes` (vendored frameworks).
    pub excluded_stylesheets: Vec<PathBuf>,
}

impl ProjectFiles {
    /// Walks `root` and sorts every analysable file by kind.
    ///
    /// # Errors
    /// Returns `AnatomistError::IoError` if `root` itself cannot be walked.
    /// Unreadable entries below the root are skipped with a warning.
    pub fn discover(root: &Path, config: &Config) -> Result<Self, AnatomistError> {
        let root = dunce::canonicalize(root)?;
        let mut files = ProjectFiles {
            root: root.clone(),
            ..Default::default()
        };

        for path in walk_files(&root, config) {
            let Some(kind) = FileKind::from_path(&path) else {
                continue;
            };
            match kind {
                FileKind::Markup => files.markup.push(path),
                FileKind::Script => files.scripts.push(path),
                FileKind::Stylesheet => {
                    let shown = display_path(&root, &path);
                    if config.is_excluded_stylesheet(&shown) {
                        files.excluded_stylesheets.push(path);
                    } else {
                        files.stylesheets.push(path);
                    }
                }
            }
        }

        tracing::debug!(
            markup = files.markup.len(),
            stylesheets = files.stylesheets.len(),
            scripts = files.scripts.len(),
            "discovered project files"
        );
        Ok(files)
    }

    /// Every analysed file with its kind.
    pub fn all(&self) -> impl Iterator<Item = (FileKind, &Path)> {
        self.markup
            .iter()
            .map(|p| (FileKind::Markup, p.as_path()))
            .chain(self.stylesheets.iter().map(|p| (FileKind::Stylesheet, p.as_path())))
            .chain(self.scripts.iter().map(|p| (FileKind::Script, p.as_path())))
    }

    pub fn len(&self) -> usize {
        self.markup.len() + self.stylesheets.len() + self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root-relative, forward-slash form of `path`.
    pub fn display(&self, path: &Path) -> String {
        display_path(&self.root, path)
    }

    /// Inverse of [`ProjectFiles::display`].
    pub fn resolve(&self, shown: &str) -> PathBuf {
        self.root.join(shown)
    }
}

/// Files the reference resolver searches: analysed files plus anything else
/// with a text extension that could name a function.
pub fn reference_corpus(root: &Path, config: &Config) -> Vec<PathBuf> {
    walk_files(root, config)
        .into_iter()
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .map(|ext| REFERENCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect()
}

fn walk_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    let internal = internal_dirs(root, config);
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_scan_excluded(e, config, &internal))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files
}

/// Directories deadwatcher writes into.
fn internal_dirs(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut dirs = vec![config.patches_path(root)];
    if let Some(snapshot_dir) = root.join(SNAPSHOT_FILE).parent() {
        dirs.push(snapshot_dir.to_path_buf());
    }
    dirs
}

/// Returns `true` if a directory entry should be pruned from the walk.
fn is_scan_excluded(entry: &DirEntry, config: &Config, internal: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    if internal.iter().any(|dir| dir == entry.path()) {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| config.is_excluded_dir(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discover_sorts_by_kind() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "index.html");
        touch(tmp.path(), "views/home.ejs");
        touch(tmp.path(), "css/site.css");
        touch(tmp.path(), "js/app.js");
        touch(tmp.path(), "README.md");

        let files = ProjectFiles::discover(tmp.path(), &Config::default()).unwrap();
        assert_eq!(files.markup.len(), 2);
        assert_eq!(files.stylesheets.len(), 1);
        assert_eq!(files.scripts.len(), 1);
        assert_eq!(files.display(&files.scripts[0]), "js/app.js");
    }

    #[test]
    fn test_excluded_dirs_are_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "node_modules/lib/index.js");
        touch(tmp.path(), "dist/bundle.js");
        touch(tmp.path(), "src/main.js");

        let files = ProjectFiles::discover(tmp.path(), &Config::default()).unwrap();
        let shown: Vec<String> = files.scripts.iter().map(|p| files.display(p)).collect();
        assert_eq!(shown, vec!["src/main.js"]);
    }

    #[test]
    fn test_vendored_stylesheets_set_aside() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "vendor/bootstrap.min.css");
        touch(tmp.path(), "site.css");

        let files = ProjectFiles::discover(tmp.path(), &Config::default()).unwrap();
        assert_eq!(files.stylesheets.len(), 1);
        assert_eq!(files.excluded_stylesheets.len(), 1);
    }

    #[test]
    fn test_corpus_skips_own_output() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "deadwatcher_patches/suggested-changes.1.json");
        touch(tmp.path(), ".deadwatcher/last-result.json");
        touch(tmp.path(), "config/routes.json");
        touch(tmp.path(), "app.js");
        touch(tmp.path(), "app.js.bak.1700000000000");

        let root = dunce::canonicalize(tmp.path()).unwrap();
        let corpus = reference_corpus(&root, &Config::default());
        let shown: Vec<String> = corpus.iter().map(|p| display_path(&root, p)).collect();
        assert_eq!(shown, vec!["app.js", "config/routes.json"]);
    }
}
