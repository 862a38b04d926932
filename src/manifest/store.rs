//! Loading and publication of render resources.
//!
//! `load` reads every resource file, re-parses only those whose content
//! digest changed and publishes a complete new [`Resources`] snapshot with a
//! single atomic store. Readers call [`ManifestStore::snapshot`] once per
//! render and keep that `Arc`.

use super::{Manifest, ManifestError, ManifestKind, ResourceKind, Resources};
use crate::utils::hash;
use crate::{debug, log};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Newlines and runs of 3+ whitespace characters are dropped from the loading page.
static LOADING_WHITESPACE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\r|\n|\s{3,}").unwrap());

/// Outcome of one load batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Resources (re)parsed in this batch.
    pub updated: Vec<ResourceKind>,
    /// Resources that disappeared from disk.
    pub removed: Vec<ResourceKind>,
    /// Resources that could not be read or parsed; previous values were kept.
    pub failed: Vec<(ResourceKind, ManifestError)>,
}

impl LoadReport {
    /// Whether a new snapshot was published.
    pub fn changed(&self) -> bool {
        !self.updated.is_empty() || !self.removed.is_empty()
    }
}

/// Owner of the current resource snapshot.
#[derive(Default)]
pub struct ManifestStore {
    current: ArcSwapOption<Resources>,
    /// Content digests of the published resources. Also serializes loads.
    digests: Mutex<FxHashMap<ResourceKind, blake3::Hash>>,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of a resource below the build directory.
    pub fn resource_path(build_dir: &Path, kind: ResourceKind) -> PathBuf {
        if kind.in_server_dist() {
            build_dir
                .join("dist")
                .join("server")
                .join(kind.file_name())
        } else {
            build_dir.join(kind.file_name())
        }
    }

    /// Read all resources from `build_dir` and publish a new snapshot if anything changed.
    ///
    /// Missing and broken files are not fatal: a missing file clears that
    /// resource, a broken one keeps its previous value.
    pub fn load(&self, build_dir: &Path) -> LoadReport {
        let mut digests = self.digests.lock();
        let previous = self.current.load_full();
        let mut next = previous.as_deref().cloned().unwrap_or_default();
        let mut report = LoadReport::default();

        for kind in ResourceKind::ALL {
            let path = Self::resource_path(build_dir, kind);

            let src = match std::fs::read_to_string(&path) {
                Ok(src) => src,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if next.has(kind) {
                        clear(&mut next, kind);
                        digests.remove(&kind);
                        report.removed.push(kind);
                    }
                    continue;
                }
                Err(e) => {
                    log!("warning"; "cannot read {}: {}", path.display(), e);
                    report.failed.push((kind, ManifestError::Io(path, e)));
                    continue;
                }
            };

            let digest = hash::digest(&src);
            if next.has(kind) && digests.get(&kind) == Some(&digest) {
                continue;
            }

            match apply(&mut next, kind, &src) {
                Ok(()) => {
                    digests.insert(kind, digest);
                    report.updated.push(kind);
                }
                Err(e) => {
                    log!("warning"; "invalid {}, keeping previous: {}", kind.file_name(), e);
                    report.failed.push((kind, ManifestError::Parse(path, e)));
                }
            }
        }

        if report.changed() {
            debug!("resources"; "updated {:?}, removed {:?}", report.updated, report.removed);
            self.current.store(Some(Arc::new(next)));
        }

        report
    }

    /// Current snapshot, if anything was ever loaded.
    pub fn snapshot(&self) -> Option<Arc<Resources>> {
        self.current.load_full()
    }

    pub fn get(&self, kind: ManifestKind) -> Option<Arc<Manifest>> {
        self.current
            .load()
            .as_ref()
            .and_then(|r| r.manifest(kind).cloned())
    }

    pub fn missing(&self, ssr: bool) -> Vec<ResourceKind> {
        match self.current.load().as_ref() {
            Some(resources) => resources.missing(ssr),
            None => Resources::required(ssr).to_vec(),
        }
    }

    pub fn is_ready(&self, ssr: bool) -> bool {
        self.missing(ssr).is_empty()
    }
}

fn apply(resources: &mut Resources, kind: ResourceKind, src: &str) -> Result<(), serde_json::Error> {
    if let Some(manifest_kind) = kind.manifest_kind() {
        let manifest = Some(Arc::new(Manifest::parse(src)?));
        match manifest_kind {
            ManifestKind::Client => resources.client = manifest,
            ManifestKind::Modern => resources.modern = manifest,
            ManifestKind::Server => resources.server = manifest,
        }
        return Ok(());
    }

    let text: Arc<str> = Arc::from(src);
    match kind {
        ResourceKind::SsrTemplate => resources.ssr_template = Some(text),
        ResourceKind::SpaTemplate => resources.spa_template = Some(text),
        ResourceKind::ErrorTemplate => resources.error_template = Some(text),
        ResourceKind::LoadingHtml => {
            resources.loading_html = Some(Arc::from(LOADING_WHITESPACE.replace_all(src, "").as_ref()));
        }
        _ => {}
    }
    Ok(())
}

fn clear(resources: &mut Resources, kind: ResourceKind) {
    match kind {
        ResourceKind::ClientManifest => resources.client = None,
        ResourceKind::ModernManifest => resources.modern = None,
        ResourceKind::ServerManifest => resources.server = None,
        ResourceKind::SsrTemplate => resources.ssr_template = None,
        ResourceKind::SpaTemplate => resources.spa_template = None,
        ResourceKind::ErrorTemplate => resources.error_template = None,
        ResourceKind::LoadingHtml => resources.loading_html = None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, kind: ResourceKind, content: &str) {
        let path = ManifestStore::resource_path(dir, kind);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn write_ssr_build(dir: &Path) {
        write(dir, ResourceKind::ClientManifest, r#"{"initial":["app.js"]}"#);
        write(dir, ResourceKind::ServerManifest, r#"{"files":{"entry":"server.js"}}"#);
        write(dir, ResourceKind::SsrTemplate, "<html>{{ APP }}</html>");
        write(dir, ResourceKind::SpaTemplate, "<html>{{ APP }}</html>");
    }

    #[test]
    fn test_empty_store_not_ready() {
        let store = ManifestStore::new();
        assert!(store.snapshot().is_none());
        assert!(!store.is_ready(false));
        assert_eq!(store.missing(true).len(), 4);
    }

    #[test]
    fn test_load_ssr_build() {
        let dir = TempDir::new().unwrap();
        write_ssr_build(dir.path());

        let store = ManifestStore::new();
        let report = store.load(dir.path());

        assert!(report.changed());
        assert_eq!(report.updated.len(), 4);
        assert!(report.failed.is_empty());
        assert!(store.is_ready(true));
        assert!(store.get(ManifestKind::Modern).is_none());
        assert_eq!(
            store.get(ManifestKind::Server).unwrap().entry(),
            Some("server.js")
        );
    }

    #[test]
    fn test_spa_only_readiness() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ResourceKind::ClientManifest, "{}");
        write(dir.path(), ResourceKind::SpaTemplate, "<html></html>");

        let store = ManifestStore::new();
        store.load(dir.path());

        assert!(store.is_ready(false));
        assert!(!store.is_ready(true));
    }

    #[test]
    fn test_reload_unchanged_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        write_ssr_build(dir.path());

        let store = ManifestStore::new();
        store.load(dir.path());
        let first = store.snapshot().unwrap();

        let report = store.load(dir.path());
        assert!(!report.changed());
        assert!(Arc::ptr_eq(&first, &store.snapshot().unwrap()));
    }

    #[test]
    fn test_reload_publishes_new_snapshot() {
        let dir = TempDir::new().unwrap();
        write_ssr_build(dir.path());

        let store = ManifestStore::new();
        store.load(dir.path());
        let before = store.snapshot().unwrap();

        write(dir.path(), ResourceKind::ClientManifest, r#"{"initial":["app.2.js"]}"#);
        let report = store.load(dir.path());

        assert_eq!(report.updated, vec![ResourceKind::ClientManifest]);
        // readers holding the old snapshot are unaffected
        assert_eq!(before.client.as_ref().unwrap().initial[0].file, "app.js");
        let after = store.snapshot().unwrap();
        assert_eq!(after.client.as_ref().unwrap().initial[0].file, "app.2.js");
        assert!(Arc::ptr_eq(
            before.server.as_ref().unwrap(),
            after.server.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_parse_failure_keeps_previous() {
        let dir = TempDir::new().unwrap();
        write_ssr_build(dir.path());

        let store = ManifestStore::new();
        store.load(dir.path());

        write(dir.path(), ResourceKind::ClientManifest, "{ broken");
        let report = store.load(dir.path());

        assert!(!report.changed());
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, ManifestError::Parse(..)));
        assert_eq!(
            store.get(ManifestKind::Client).unwrap().initial[0].file,
            "app.js"
        );
    }

    #[test]
    fn test_removed_file_clears_resource() {
        let dir = TempDir::new().unwrap();
        write_ssr_build(dir.path());
        write(dir.path(), ResourceKind::ModernManifest, "{}");

        let store = ManifestStore::new();
        store.load(dir.path());
        assert!(store.get(ManifestKind::Modern).is_some());

        fs::remove_file(ManifestStore::resource_path(dir.path(), ResourceKind::ModernManifest))
            .unwrap();
        let report = store.load(dir.path());

        assert_eq!(report.removed, vec![ResourceKind::ModernManifest]);
        assert!(store.get(ManifestKind::Modern).is_none());
    }

    #[test]
    fn test_loading_html_whitespace_collapsed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ResourceKind::LoadingHtml, "<div>\n      <p>Loading</p>\n</div>");

        let store = ManifestStore::new();
        store.load(dir.path());

        let snapshot = store.snapshot().unwrap();
        assert_eq!(
            snapshot.loading_html.as_deref(),
            Some("<div><p>Loading</p></div>")
        );
    }
}
