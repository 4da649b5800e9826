//! Path display helpers for reports, patches and manifests.

use std::path::Path;

/// `path` relative to `root`, with forward slashes. Paths outside `root`
/// are shown in full.
///
/// # Example
/// ```
/// use std::path::Path;
/// use anatomist::path_util::display_path;
///
/// assert_eq!(display_path(Path::new("/srv/site"), Path::new("/srv/site/css/a.css")), "css/a.css");
/// assert_eq!(display_path(Path::new("/srv/site"), Path::new("/tmp/x.js")), "/tmp/x.js");
/// ```
pub fn display_path(root: &Path, path: &Path) -> String {
    let shown = path.strip_prefix(root).unwrap_or(path);
    shown.to_string_lossy().replace('\\', "/")
}

/// Final path component, used to name patch files.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_nested() {
        let root = Path::new("/project");
        assert_eq!(display_path(root, Path::new("/project/a/b/c.js")), "a/b/c.js");
    }

    #[test]
    fn test_display_path_root_itself() {
        let root = Path::new("/project");
        assert_eq!(display_path(root, root), "");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/project/css/site.css")), "site.css");
        assert_eq!(base_name(Path::new("/")), "file");
    }
}
