//! URL to filesystem path resolution for bundle and static files.

use crate::utils::url::{decode, strip_base, strip_query_hash};
use std::path::{Path, PathBuf};

/// Where a request path may be served from disk.
#[derive(Debug, Clone)]
pub struct FileRoots {
    /// URL prefix of client bundle files; `None` when bundles live on a CDN.
    pub bundle_prefix: Option<String>,
    pub bundle_dir: PathBuf,
    pub router_base: String,
    pub static_dir: PathBuf,
}

/// A file found for a request.
#[derive(Debug, PartialEq, Eq)]
pub enum StaticFile {
    /// Hashed bundle file, safe to cache forever.
    Bundle(PathBuf),
    Static(PathBuf),
}

impl FileRoots {
    pub fn resolve(&self, url: &str) -> Option<StaticFile> {
        let path = strip_query_hash(url);

        if let Some(prefix) = &self.bundle_prefix
            && let Some(rest) = path.strip_prefix(prefix.as_str())
        {
            return resolve_path(rest, &self.bundle_dir).map(StaticFile::Bundle);
        }

        let path = strip_base(path, &self.router_base);
        resolve_path(&path, &self.static_dir).map(StaticFile::Static)
    }
}

/// Resolve a URL path to a regular file below `root`.
///
/// Directories are never served; routes own them.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = decode(url);
    let clean = clean.trim_matches('/');

    if clean.is_empty() || clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    // Canonicalize so symlinks cannot escape the root
    let canonical = root.join(clean).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;

    (canonical.starts_with(&root_canonical) && canonical.is_file()).then_some(canonical)
}
