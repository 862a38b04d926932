//! Filesystem helpers for generated output.
//!
//! - `empty_dir` - clear an output directory before a run
//! - `collect_files` - list files below a directory (jwalk)
//! - `copy_dir` - mirror a directory tree in parallel (rayon)
//! - `write_file` - async write that creates missing parents

use anyhow::{Context, Result};
use jwalk::WalkDir;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Remove everything inside `dir`, then make sure it exists.
pub fn empty_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to clear output directory: {}", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

/// Collect all files from a directory recursively.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect()
}

/// Copy every file below `src` into `dest`, keeping relative paths.
///
/// Returns the number of copied files. A missing `src` copies nothing.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    let files = collect_files(src);
    files.par_iter().try_for_each(|path| -> Result<()> {
        let rel = path.strip_prefix(src).unwrap_or(path);
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target)
            .with_context(|| format!("Failed to copy {}", path.display()))?;
        Ok(())
    })?;

    Ok(files.len())
}

/// Write `content` to `path`, creating parent directories first.
pub async fn write_file(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_dir_removes_contents() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        fs::create_dir_all(out.join("old")).unwrap();
        fs::write(out.join("old/index.html"), "stale").unwrap();

        empty_dir(&out).unwrap();

        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_dir_nested() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("static");
        fs::create_dir_all(src.join("img")).unwrap();
        fs::write(src.join("robots.txt"), "User-agent: *").unwrap();
        fs::write(src.join("img/logo.svg"), "<svg/>").unwrap();
        fs::write(src.join(".DS_Store"), "").unwrap();

        let dest = dir.path().join("dist");
        let copied = copy_dir(&src, &dest).unwrap();

        assert_eq!(copied, 2);
        assert!(dest.join("robots.txt").is_file());
        assert!(dest.join("img/logo.svg").is_file());
        assert!(!dest.join(".DS_Store").exists());
    }

    #[test]
    fn test_copy_dir_missing_source() {
        let dir = TempDir::new().unwrap();
        assert_eq!(copy_dir(&dir.path().join("nope"), dir.path()).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/index.html");
        write_file(&path, "<html></html>").await.unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
