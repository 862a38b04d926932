//! Bundle manifests and the resources a render is composed from.
//!
//! # Module Structure
//!
//! | Module    | Purpose                                              |
//! |-----------|------------------------------------------------------|
//! | `file`    | `FileRef` / `AssetType` derived from file names      |
//! | `mapping` | Legacy <-> modern file correspondence                |
//! | `store`   | Loading and atomic publication of `Resources`        |
//! | `watch`   | Reload resources when the build output changes       |
//!
//! A manifest looks like this (every field optional):
//!
//! ```json
//! {
//!   "publicPath": "/_app/",
//!   "files": { "entry": "server.js" },
//!   "assetsMapping": { "a1b2": ["pages/index.js", "pages/index.css"] },
//!   "initial": ["runtime.js", "app.js", "app.css"],
//!   "async": ["pages/about.js"]
//! }
//! ```

mod file;
mod mapping;
mod store;
pub mod watch;

pub use file::{AssetType, FileRef};
pub use mapping::AssetMapping;
pub use store::{LoadReport, ManifestStore};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid manifest `{0}`")]
    Parse(PathBuf, #[source] serde_json::Error),
}

// ============================================================================
// Manifest
// ============================================================================

/// Which build a manifest describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// Legacy browser build.
    Client,
    /// ES module browser build.
    Modern,
    /// Server build consumed by the app renderer.
    Server,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawManifest {
    public_path: String,
    files: FxHashMap<String, String>,
    assets_mapping: FxHashMap<String, Vec<String>>,
    initial: Vec<String>,
    #[serde(rename = "async")]
    async_files: Vec<String>,
}

/// A parsed build manifest. Immutable once published.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub public_path: String,
    /// Logical name -> emitted path.
    pub files: FxHashMap<String, String>,
    /// Component hash -> emitted files, in emission order.
    pub assets_mapping: FxHashMap<String, Vec<String>>,
    /// Files every page needs.
    pub initial: Vec<FileRef>,
    /// Files loaded on demand.
    pub async_files: Vec<FileRef>,
}

impl Manifest {
    pub fn parse(src: &str) -> Result<Self, serde_json::Error> {
        let raw: RawManifest = serde_json::from_str(src)?;
        Ok(Self {
            public_path: raw.public_path,
            files: raw.files,
            assets_mapping: raw.assets_mapping,
            initial: raw.initial.into_iter().map(FileRef::new).collect(),
            async_files: raw.async_files.into_iter().map(FileRef::new).collect(),
        })
    }

    /// Server entry file, if the manifest names one.
    pub fn entry(&self) -> Option<&str> {
        self.files
            .get("entry")
            .or_else(|| self.files.get("main"))
            .map(String::as_str)
    }

    /// Look up a file by name in `initial` then `async`.
    pub fn file_ref(&self, file: &str) -> Option<&FileRef> {
        self.initial
            .iter()
            .chain(&self.async_files)
            .find(|f| f.file == file)
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Every file the render pipeline loads from the build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ClientManifest,
    ModernManifest,
    ServerManifest,
    SsrTemplate,
    SpaTemplate,
    ErrorTemplate,
    LoadingHtml,
}

impl ResourceKind {
    pub const ALL: [Self; 7] = [
        Self::ClientManifest,
        Self::ModernManifest,
        Self::ServerManifest,
        Self::SsrTemplate,
        Self::SpaTemplate,
        Self::ErrorTemplate,
        Self::LoadingHtml,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::ClientManifest => "client.manifest.json",
            Self::ModernManifest => "modern.manifest.json",
            Self::ServerManifest => "server.manifest.json",
            Self::SsrTemplate => "index.ssr.html",
            Self::SpaTemplate => "index.spa.html",
            Self::ErrorTemplate => "error.html",
            Self::LoadingHtml => "loading.html",
        }
    }

    /// Manifests and shell templates live in `dist/server`, the rest in the build dir.
    pub const fn in_server_dist(self) -> bool {
        !matches!(self, Self::ErrorTemplate | Self::LoadingHtml)
    }

    pub const fn manifest_kind(self) -> Option<ManifestKind> {
        match self {
            Self::ClientManifest => Some(ManifestKind::Client),
            Self::ModernManifest => Some(ManifestKind::Modern),
            Self::ServerManifest => Some(ManifestKind::Server),
            _ => None,
        }
    }
}

/// One consistent snapshot of everything loaded from the build output.
///
/// Built completely, then published; renders hold an `Arc` for their whole
/// duration and never observe a half-applied reload.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub client: Option<Arc<Manifest>>,
    pub modern: Option<Arc<Manifest>>,
    pub server: Option<Arc<Manifest>>,
    pub ssr_template: Option<Arc<str>>,
    pub spa_template: Option<Arc<str>>,
    pub error_template: Option<Arc<str>>,
    pub loading_html: Option<Arc<str>>,
}

impl Resources {
    pub fn manifest(&self, kind: ManifestKind) -> Option<&Arc<Manifest>> {
        match kind {
            ManifestKind::Client => self.client.as_ref(),
            ManifestKind::Modern => self.modern.as_ref(),
            ManifestKind::Server => self.server.as_ref(),
        }
    }

    pub fn has(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::ClientManifest => self.client.is_some(),
            ResourceKind::ModernManifest => self.modern.is_some(),
            ResourceKind::ServerManifest => self.server.is_some(),
            ResourceKind::SsrTemplate => self.ssr_template.is_some(),
            ResourceKind::SpaTemplate => self.spa_template.is_some(),
            ResourceKind::ErrorTemplate => self.error_template.is_some(),
            ResourceKind::LoadingHtml => self.loading_html.is_some(),
        }
    }

    /// Resources a render cannot do without. SSR needs the server build and
    /// both shells; SPA-only mode needs the client manifest and its shell.
    pub fn required(ssr: bool) -> &'static [ResourceKind] {
        if ssr {
            &[
                ResourceKind::ClientManifest,
                ResourceKind::ServerManifest,
                ResourceKind::SsrTemplate,
                ResourceKind::SpaTemplate,
            ]
        } else {
            &[ResourceKind::ClientManifest, ResourceKind::SpaTemplate]
        }
    }

    pub fn missing(&self, ssr: bool) -> Vec<ResourceKind> {
        Self::required(ssr)
            .iter()
            .copied()
            .filter(|kind| !self.has(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parse() {
        let manifest = Manifest::parse(
            r#"{
                "publicPath": "/_app/",
                "files": { "entry": "server.js" },
                "assetsMapping": { "a1": ["pages/index.js"] },
                "initial": ["runtime.js", "app.css"],
                "async": ["pages/about.js"],
                "hasNoCssVersion": {}
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.public_path, "/_app/");
        assert_eq!(manifest.entry(), Some("server.js"));
        assert_eq!(manifest.initial.len(), 2);
        assert_eq!(manifest.initial[1].asset_type, AssetType::Style);
        assert_eq!(manifest.async_files[0].file, "pages/about.js");
        assert!(manifest.file_ref("pages/about.js").is_some());
    }

    #[test]
    fn test_manifest_parse_empty_object() {
        let manifest = Manifest::parse("{}").unwrap();
        assert!(manifest.initial.is_empty());
        assert!(manifest.entry().is_none());
    }

    #[test]
    fn test_manifest_parse_invalid() {
        assert!(Manifest::parse("{ not json").is_err());
    }

    #[test]
    fn test_resources_missing() {
        let resources = Resources {
            client: Some(Arc::new(Manifest::default())),
            spa_template: Some(Arc::from("<html></html>")),
            ..Resources::default()
        };
        assert!(resources.missing(false).is_empty());
        assert_eq!(
            resources.missing(true),
            vec![ResourceKind::ServerManifest, ResourceKind::SsrTemplate]
        );
    }
}
