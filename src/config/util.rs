//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// ```text
/// /home/user/app/src/pages/       ← cwd
/// /home/user/app/rendition.toml   ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.exists())
}

/// Expand `~` and make `path` absolute relative to `root`.
pub fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    if path.is_relative() {
        root.join(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_file_absolute_missing() {
        assert!(find_config_file(Path::new("/definitely/not/here/rendition.toml")).is_none());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path(Path::new(".rendition"), Path::new("/app")),
            PathBuf::from("/app/.rendition")
        );
        assert_eq!(
            resolve_path(Path::new("/abs/dist"), Path::new("/app")),
            PathBuf::from("/abs/dist")
        );
    }
}
