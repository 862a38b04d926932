//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! dir = ".rendition"          # Build output of the bundler (contains dist/)
//! public_path = "/_app/"      # URL prefix of client bundle files
//! static_dir = "static"       # Files copied verbatim into the generated site
//! minify = true               # Minify generated HTML
//! dev = false                 # Development mode (longer readiness wait)
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Bundler output directory.
    pub dir: PathBuf,

    /// URL prefix under which client bundle files are served.
    /// May be an absolute URL (CDN).
    pub public_path: String,

    /// Static directory copied into the generated output.
    pub static_dir: PathBuf,

    /// Minify generated HTML.
    pub minify: bool,

    /// Development mode.
    pub dev: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dir: ".rendition".into(),
            public_path: "/_app/".into(),
            static_dir: "static".into(),
            minify: true,
            dev: false,
        }
    }
}

impl BuildConfig {
    pub const DIR: FieldPath = FieldPath::new("build.dir");
    pub const PUBLIC_PATH: FieldPath = FieldPath::new("build.public_path");

    /// Directory holding manifests and shell templates.
    pub fn server_dist(&self) -> PathBuf {
        self.dir.join("dist").join("server")
    }

    /// Directory holding client bundle files.
    pub fn client_dist(&self) -> PathBuf {
        self.dir.join("dist").join("client")
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.public_path.trim().is_empty() {
            diag.error_with_hint(
                Self::PUBLIC_PATH,
                "must not be empty",
                "use \"/_app/\" or a CDN url",
            );
        }
    }
}
