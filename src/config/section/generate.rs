//! `[generate]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [generate]
//! dir = "dist"
//! concurrency = 500           # Renders in flight at once
//! interval = 0                # Stagger (ms) between renders of one batch
//! subfolders = true           # /about -> about/index.html (false: about.html)
//! fallback = "200.html"       # SPA fallback page (false disables)
//! crawler = true              # Discover routes from rendered <a href>
//! nojekyll = true
//! payload_threshold_kb = 10   # Split state into state.js above this size
//! exclude = ["/admin", { regex = "^/drafts/" }]
//! routes = ["/hidden", { route = "/users/1", payload = { name = "Ada" } }]
//!
//! [generate.static_assets]
//! enable = true
//! dir = "static"
//! version = "1700000000"
//!
//! [[generate.hooks.before]]
//! command = ["./scripts/fetch-content.sh", "$RENDITION_GENERATE_DIR"]
//!
//! [[generate.hooks.after]]
//! command = ["pagefind", "--site", "$RENDITION_GENERATE_DIR"]
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Output directory of the generated site.
    pub dir: PathBuf,
    /// Extra routes (with optional payload) merged with the app routes.
    pub routes: Vec<RouteEntry>,
    /// Routes never generated, also applied to crawled links.
    pub exclude: Vec<ExcludePattern>,
    pub concurrency: usize,
    /// Milliseconds between the starts of two renders of the same batch.
    pub interval: u64,
    pub subfolders: bool,
    pub fallback: Fallback,
    pub crawler: bool,
    pub nojekyll: bool,
    /// Write `manifest.js` with the generated route list (static assets mode).
    pub manifest: bool,
    pub payload_threshold_kb: usize,
    /// Exit non-zero when unhandled errors occurred.
    pub fail_on_error: bool,
    /// Stop scheduling new batches once this many errors were recorded.
    pub max_errors: Option<usize>,
    pub static_assets: StaticAssetsConfig,
    pub hooks: GenerateHooksConfig,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            dir: "dist".into(),
            routes: Vec::new(),
            exclude: Vec::new(),
            concurrency: 500,
            interval: 0,
            subfolders: true,
            fallback: Fallback::default(),
            crawler: true,
            nojekyll: true,
            manifest: true,
            payload_threshold_kb: 10,
            fail_on_error: false,
            max_errors: None,
            static_assets: StaticAssetsConfig::default(),
            hooks: GenerateHooksConfig::default(),
        }
    }
}

impl GenerateConfig {
    pub const CONCURRENCY: FieldPath = FieldPath::new("generate.concurrency");
    pub const EXCLUDE: FieldPath = FieldPath::new("generate.exclude");
    pub const FALLBACK: FieldPath = FieldPath::new("generate.fallback");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.concurrency == 0 {
            diag.error(Self::CONCURRENCY, "must be at least 1");
        }

        for pattern in &self.exclude {
            if let ExcludePattern::Regex { regex } = pattern
                && let Err(e) = regex::Regex::new(regex)
            {
                diag.error(Self::EXCLUDE, format!("invalid regex `{regex}`: {e}"));
            }
        }

        if let Some(path) = self.fallback.path()
            && Path::new(path).is_absolute()
        {
            diag.error_with_hint(
                Self::FALLBACK,
                "must be relative to the generate directory",
                "use \"200.html\" or \"404.html\"",
            );
        }
    }
}

/// A configured route, optionally carrying a payload for the render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteEntry {
    Path(String),
    WithPayload {
        route: String,
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
}

impl RouteEntry {
    pub fn route(&self) -> &str {
        match self {
            Self::Path(route) | Self::WithPayload { route, .. } => route,
        }
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Path(_) => None,
            Self::WithPayload { payload, .. } => payload.as_ref(),
        }
    }
}

/// Exact route or regular expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludePattern {
    Exact(String),
    Regex { regex: String },
}

/// SPA fallback page: `true` = `200.html`, `false` = none, or a file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fallback {
    Enabled(bool),
    Path(String),
}

impl Default for Fallback {
    fn default() -> Self {
        Self::Path("200.html".into())
    }
}

impl Fallback {
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Enabled(true) => Some("200.html"),
            Self::Enabled(false) => None,
            Self::Path(p) if p.is_empty() => None,
            Self::Path(p) => Some(p),
        }
    }
}

/// Out-of-band state/payload files for fully static sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAssetsConfig {
    pub enable: bool,
    /// Directory below the public path.
    pub dir: String,
    /// Version segment; defaults to the generation timestamp.
    pub version: Option<String>,
}

impl Default for StaticAssetsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            dir: "static".into(),
            version: None,
        }
    }
}

/// Command hooks around a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateHooksConfig {
    /// Run before rendering starts. A failure aborts the run.
    pub before: Vec<GenerateHookConfig>,
    /// Run after all routes and the fallback were written.
    pub after: Vec<GenerateHookConfig>,
}

/// A single command hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateHookConfig {
    pub enable: bool,
    /// Display name for logging (defaults to command[0]).
    pub name: Option<String>,
    /// Command and arguments, `$RENDITION_*` variables are substituted.
    pub command: Vec<String>,
    /// Suppress output.
    pub quiet: bool,
}

impl Default for GenerateHookConfig {
    fn default() -> Self {
        Self {
            enable: true,
            name: None,
            command: Vec::new(),
            quiet: true,
        }
    }
}

impl GenerateHookConfig {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.command.first().map(String::as_str).unwrap_or("hook"))
    }
}
