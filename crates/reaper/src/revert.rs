//! Backup/Revert: copies `<file>.bak.<millis>` backups back over their
//! originals. Backups are never deleted, so a revert can be repeated.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

/// Selects every backup regardless of its stamp.
pub const REVERT_ALL: &str = "all";

/// Directories never searched for backups.
const SKIP_DIRS: &[&str] = &[".git", "node_modules"];

fn backup_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)\.bak\.(\d+)$").expect("backup suffix regex is a hardcoded literal"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredFile {
    pub backup: PathBuf,
    pub restored_to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertOutcome {
    Restored { restored: Vec<RestoredFile> },
    /// Nothing matched; not an error.
    Miss { message: String },
}

impl RevertOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, RevertOutcome::Restored { .. })
    }
}

/// A backup found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Backup {
    path: PathBuf,
    original: PathBuf,
    /// The suffix digits exactly as written.
    stamp: String,
}

impl Backup {
    /// Numeric order on the stamp without parsing it.
    fn age_key(&self) -> (usize, &str) {
        let trimmed = self.stamp.trim_start_matches('0');
        (trimmed.len(), trimmed)
    }
}

/// Restores the backups of run `timestamp`, or every backup for `"all"`.
///
/// With `"all"`, newer backups are copied first so each original ends at
/// its oldest recorded state. Individual copy failures are logged and
/// skipped.
pub fn revert(root: &Path, timestamp: &str) -> RevertOutcome {
    let mut backups = find_backups(root);
    if backups.is_empty() {
        return RevertOutcome::Miss {
            message: "No backups found".to_string(),
        };
    }

    if timestamp == REVERT_ALL {
        backups.sort_by(|a, b| b.age_key().cmp(&a.age_key()).then_with(|| a.path.cmp(&b.path)));
    } else {
        backups.retain(|b| b.stamp == timestamp);
        if backups.is_empty() {
            return RevertOutcome::Miss {
                message: format!("No backup found with timestamp {timestamp}"),
            };
        }
    }

    let mut restored = Vec::with_capacity(backups.len());
    for backup in backups {
        match std::fs::copy(&backup.path, &backup.original) {
            Ok(_) => {
                tracing::info!(backup = %backup.path.display(), original = %backup.original.display(), "restored");
                restored.push(RestoredFile {
                    backup: backup.path,
                    restored_to: backup.original,
                });
            }
            Err(err) => {
                tracing::warn!(backup = %backup.path.display(), error = %err, "restore failed; continuing");
            }
        }
    }
    RevertOutcome::Restored { restored }
}

/// Every backup under `root`, in path order.
fn find_backups(root: &Path) -> Vec<Backup> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(|n| SKIP_DIRS.contains(&n)))
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable path");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| parse_backup(e.path()))
        .collect()
}

fn parse_backup(path: &Path) -> Option<Backup> {
    let name = path.file_name()?.to_str()?;
    let caps = backup_suffix_re().captures(name)?;
    let original_name = caps.get(1)?.as_str();
    Some(Backup {
        path: path.to_path_buf(),
        original: path.with_file_name(original_name),
        stamp: caps.get(2)?.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_backup_name() {
        let b = parse_backup(Path::new("/p/css/site.css.bak.1700000000000")).unwrap();
        assert_eq!(b.original, Path::new("/p/css/site.css"));
        assert_eq!(b.stamp, "1700000000000");

        assert!(parse_backup(Path::new("/p/site.css.bak")).is_none());
        assert!(parse_backup(Path::new("/p/site.css.bak.12x")).is_none());
        assert!(parse_backup(Path::new("/p/.bak.12")).is_none());
    }

    #[test]
    fn test_no_backups_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.css"), ".a{}").unwrap();
        let outcome = revert(tmp.path(), "all");
        assert_eq!(
            outcome,
            RevertOutcome::Miss {
                message: "No backups found".into()
            }
        );
    }

    #[test]
    fn test_unknown_timestamp_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.css.bak.100"), ".a{}").unwrap();
        let outcome = revert(tmp.path(), "200");
        assert!(!outcome.is_ok());
    }

    #[test]
    fn test_revert_all_lands_on_oldest() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.css");
        fs::write(&file, "v3").unwrap();
        fs::write(tmp.path().join("a.css.bak.100"), "v1").unwrap();
        fs::write(tmp.path().join("a.css.bak.200"), "v2").unwrap();

        let RevertOutcome::Restored { restored } = revert(tmp.path(), "all") else {
            panic!("expected restore");
        };
        assert_eq!(restored.len(), 2);
        assert_eq!(fs::read_to_string(&file).unwrap(), "v1");
        assert!(tmp.path().join("a.css.bak.100").exists());
    }

    #[test]
    fn test_leading_zero_stamp_matches_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.css");
        fs::write(&file, "new").unwrap();
        fs::write(tmp.path().join("a.css.bak.0042"), "old").unwrap();

        assert!(!revert(tmp.path(), "42").is_ok());
        assert!(revert(tmp.path(), "0042").is_ok());
        assert_eq!(fs::read_to_string(&file).unwrap(), "old");
    }

    #[test]
    fn test_revert_all_orders_stamps_numerically() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.css");
        fs::write(&file, "now").unwrap();
        fs::write(tmp.path().join("a.css.bak.99"), "oldest").unwrap();
        fs::write(tmp.path().join("a.css.bak.100"), "middle").unwrap();
        fs::write(tmp.path().join("a.css.bak.0150"), "newest").unwrap();

        assert!(revert(tmp.path(), "all").is_ok());
        assert_eq!(fs::read_to_string(&file).unwrap(), "oldest");
    }

    #[test]
    fn test_skips_dependency_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/x")).unwrap();
        fs::write(tmp.path().join("node_modules/x/i.js.bak.100"), "old").unwrap();
        assert!(!revert(tmp.path(), "100").is_ok());
    }
}
