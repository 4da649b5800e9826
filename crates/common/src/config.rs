//! Project configuration: `deadwatcher.toml` plus environment overrides.

use crate::pattern::IgnoreSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "deadwatcher.toml";
pub const ENV_IGNORE: &str = "DEADWATCHER_IGNORE";
pub const ENV_PATCHES_DIR: &str = "DEADWATCHER_PATCHES_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Class names or wildcard globs never reported as unused.
    pub ignore_classes: IgnoreSet,
    /// Patch output directory, relative to the project root.
    pub patches_dir: PathBuf,
    /// Directory names skipped during discovery and watching.
    pub exclude_dirs: Vec<String>,
    /// Path substrings whose stylesheets are never analysed or rewritten.
    pub stylesheet_excludes: Vec<String>,
    pub debounce_ms: u64,
    /// Lines of context around a function in interactive prompts.
    pub excerpt_context: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_classes: IgnoreSet::default(),
            patches_dir: PathBuf::from("deadwatcher_patches"),
            exclude_dirs: ["node_modules", ".git", "dist", "build", "coverage", "logs"]
                .into_iter()
                .map(String::from)
                .collect(),
            stylesheet_excludes: vec!["bootstrap".to_string()],
            debounce_ms: 200,
            excerpt_context: 3,
        }
    }
}

impl Config {
    /// Loads `deadwatcher.toml` from `root` (defaults if absent), then
    /// applies environment overrides.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&root.join(CONFIG_FILE))?;
        config.apply_env(
            std::env::var(ENV_IGNORE).ok().as_deref(),
            std::env::var(ENV_PATCHES_DIR).ok().as_deref(),
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `ignore` is a comma list appended to the file's patterns;
    /// `patches_dir` replaces the configured directory.
    pub fn apply_env(&mut self, ignore: Option<&str>, patches_dir: Option<&str>) {
        if let Some(list) = ignore {
            self.ignore_classes.extend(list.split(',').map(str::trim));
        }
        if let Some(dir) = patches_dir.map(str::trim).filter(|d| !d.is_empty()) {
            self.patches_dir = PathBuf::from(dir);
        }
    }

    /// Absolute patch directory for a project rooted at `root`.
    pub fn patches_path(&self, root: &Path) -> PathBuf {
        if self.patches_dir.is_absolute() {
            self.patches_dir.clone()
        } else {
            root.join(&self.patches_dir)
        }
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }

    pub fn is_excluded_stylesheet(&self, path: &str) -> bool {
        self.stylesheet_excludes
            .iter()
            .any(|fragment| !fragment.is_empty() && path.contains(fragment.as_str()))
    }
}
