//! `[render]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [render]
//! ssr = true
//! modern = "auto"             # auto | off | client | server
//! resource_hints = true
//! inject_scripts = true
//! crossorigin = "anonymous"
//! preload = ["script", "style"]
//! prefetch = []
//!
//! [render.etag]
//! enable = true
//! weak = false
//!
//! [render.csp]
//! enable = true
//! hash_algorithm = "sha384"
//! allowed_sources = ["https://analytics.example.com"]
//! report_only = false
//! add_meta = false
//!
//! [render.csp.policies]
//! script-src = ["'self'", "https://cdn.example.com"]
//! report-uri = ["/csp-report"]
//!
//! [render.http2]
//! push = true
//! push_types = ["script"]
//!
//! [render.app]
//! command = ["node", "$RENDITION_SERVER_ENTRY"]
//! timeout = 30
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::csp::HashAlgorithm;
use crate::manifest::AssetType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How modern (ES module) bundles are used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModernMode {
    /// Enable when a modern manifest is found: `server` with SSR, `client` without.
    #[default]
    Auto,
    /// Never use modern bundles.
    Off,
    /// Ship both builds, let the browser pick via `type="module"`/`nomodule`.
    Client,
    /// Pick the build per request by user agent.
    Server,
}

/// Render pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Server-side render pages; `false` serves the SPA shell only.
    pub ssr: bool,
    pub modern: ModernMode,
    /// Emit preload/prefetch links.
    pub resource_hints: bool,
    /// Inject state and bundle scripts into the page.
    pub inject_scripts: bool,
    /// `crossorigin` attribute for script tags and module preloads.
    pub crossorigin: Option<String>,
    /// Asset types that get `<link rel="preload">`.
    pub preload: Vec<AssetType>,
    /// Asset types that get `<link rel="prefetch">`.
    pub prefetch: Vec<AssetType>,
    pub etag: EtagConfig,
    pub globals: GlobalsConfig,
    pub csp: CspConfig,
    pub http2: Http2Config,
    pub app: AppConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ssr: true,
            modern: ModernMode::Auto,
            resource_hints: true,
            inject_scripts: true,
            crossorigin: None,
            preload: vec![AssetType::Script, AssetType::Style],
            prefetch: Vec::new(),
            etag: EtagConfig::default(),
            globals: GlobalsConfig::default(),
            csp: CspConfig::default(),
            http2: Http2Config::default(),
            app: AppConfig::default(),
        }
    }
}

impl RenderConfig {
    pub const APP_COMMAND: FieldPath = FieldPath::new("render.app.command");
    pub const CSP_POLICIES: FieldPath = FieldPath::new("render.csp.policies");
    pub const GLOBALS_CONTEXT: FieldPath = FieldPath::new("render.globals.context");

    pub fn should_preload(&self, ty: AssetType) -> bool {
        self.preload.contains(&ty)
    }

    pub fn should_prefetch(&self, ty: AssetType) -> bool {
        self.prefetch.contains(&ty)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.ssr && self.app.command.is_empty() {
            diag.error_with_hint(
                Self::APP_COMMAND,
                "required when `render.ssr` is enabled",
                "set `command = [\"node\", \"$RENDITION_SERVER_ENTRY\"]` or `ssr = false`",
            );
        }

        let is_ident = |s: &str| {
            !s.is_empty()
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        };
        if !is_ident(&self.globals.context) {
            diag.error(Self::GLOBALS_CONTEXT, "must be a valid JavaScript identifier");
        }

        if self.csp.enable
            && self.csp.skip_hash_with_unsafe_inline
            && !self.csp.contains_unsafe_inline()
        {
            diag.warn(
                CspConfig::SKIP_HASH,
                "has no effect: `script-src` does not contain 'unsafe-inline'",
            );
        }

        for name in self.csp.policies.keys() {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                diag.error(Self::CSP_POLICIES, format!("invalid directive name `{name}`"));
            }
        }
    }
}

/// `ETag` generation for rendered responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtagConfig {
    pub enable: bool,
    pub weak: bool,
}

impl Default for EtagConfig {
    fn default() -> Self {
        Self {
            enable: true,
            weak: false,
        }
    }
}

/// Names of the globals shared between server output and the client bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalsConfig {
    /// Root element id.
    pub id: String,
    /// `window` property holding the serialized state.
    pub context: String,
    /// JSONP callback wrapping static payload files.
    pub jsonp: String,
}

impl Default for GlobalsConfig {
    fn default() -> Self {
        Self {
            id: "__app".into(),
            context: "__APP__".into(),
            jsonp: "__APP_JSONP__".into(),
        }
    }
}

/// Content-Security-Policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    pub enable: bool,
    pub hash_algorithm: HashAlgorithm,
    /// Extra sources appended to the generated `script-src`.
    pub allowed_sources: Vec<String>,
    /// Full policy table; hashes and `'self'` are merged into `script-src`.
    pub policies: BTreeMap<String, Vec<String>>,
    /// Send `Content-Security-Policy-Report-Only` instead.
    pub report_only: bool,
    /// Also emit a `<meta http-equiv>` tag.
    pub add_meta: bool,
    /// Skip hashing when `script-src` allows `'unsafe-inline'`.
    pub skip_hash_with_unsafe_inline: bool,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            enable: false,
            hash_algorithm: HashAlgorithm::Sha256,
            allowed_sources: Vec::new(),
            policies: BTreeMap::new(),
            report_only: false,
            add_meta: false,
            skip_hash_with_unsafe_inline: false,
        }
    }
}

impl CspConfig {
    pub const SKIP_HASH: FieldPath = FieldPath::new("render.csp.skip_hash_with_unsafe_inline");

    /// Whether the configured `script-src` allows inline scripts.
    pub fn contains_unsafe_inline(&self) -> bool {
        const UNSAFE_INLINE: &str = "'unsafe-inline'";
        self.allowed_sources.iter().any(|s| s == UNSAFE_INLINE)
            || self
                .policies
                .get("script-src")
                .is_some_and(|srcs| srcs.iter().any(|s| s == UNSAFE_INLINE))
    }

    /// Inline scripts are hashed unless the compatibility flag opts out.
    pub fn should_hash(&self) -> bool {
        self.enable && !(self.skip_hash_with_unsafe_inline && self.contains_unsafe_inline())
    }

    pub fn header_name(&self) -> &'static str {
        if self.report_only {
            "Content-Security-Policy-Report-Only"
        } else {
            "Content-Security-Policy"
        }
    }
}

/// HTTP/2 server push via `Link` headers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Http2Config {
    pub push: bool,
    /// Asset types to push; `None` pushes scripts and styles.
    pub push_types: Option<Vec<AssetType>>,
}

/// External application renderer invoked once per render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Command and arguments. Supports `$RENDITION_*` variable substitution.
    pub command: Vec<String>,
    /// Seconds before a render is considered crashed.
    pub timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_render_defaults() {
        let config = test_parse_config("");
        let render = &config.render;
        assert!(render.ssr);
        assert_eq!(render.modern, ModernMode::Auto);
        assert!(render.should_preload(AssetType::Script));
        assert!(render.should_preload(AssetType::Style));
        assert!(!render.should_preload(AssetType::Font));
        assert!(!render.should_prefetch(AssetType::Script));
        assert_eq!(render.globals.context, "__APP__");
        assert_eq!(render.csp.hash_algorithm, HashAlgorithm::Sha256);
        assert!(!render.csp.should_hash());
    }

    #[test]
    fn test_render_csp_table() {
        let config = test_parse_config(
            r#"
[render.csp]
enable = true
hash_algorithm = "sha512"
report_only = true

[render.csp.policies]
script-src = ["'self'", "'unsafe-inline'"]
"#,
        );
        let csp = &config.render.csp;
        assert_eq!(csp.hash_algorithm, HashAlgorithm::Sha512);
        assert!(csp.contains_unsafe_inline());
        // hashing stays on unless explicitly skipped
        assert!(csp.should_hash());
        assert_eq!(csp.header_name(), "Content-Security-Policy-Report-Only");
    }

    #[test]
    fn test_render_csp_skip_hash_opt_in() {
        let config = test_parse_config(
            r#"
[render.csp]
enable = true
skip_hash_with_unsafe_inline = true
allowed_sources = ["'unsafe-inline'"]
"#,
        );
        assert!(!config.render.csp.should_hash());
    }

    #[test]
    fn test_render_modern_and_push() {
        let config = test_parse_config(
            "[render]\nmodern = \"client\"\nprefetch = [\"script\"]\n[render.http2]\npush = true\npush_types = [\"font\"]",
        );
        assert_eq!(config.render.modern, ModernMode::Client);
        assert!(config.render.should_prefetch(AssetType::Script));
        assert_eq!(config.render.http2.push_types, Some(vec![AssetType::Font]));
    }

    #[test]
    fn test_render_validate_requires_command() {
        let render = RenderConfig::default();
        let mut diag = ConfigDiagnostics::new();
        render.validate(&mut diag);
        assert!(diag.errors().iter().any(|e| e.field == RenderConfig::APP_COMMAND));

        let spa_only = RenderConfig {
            ssr: false,
            ..RenderConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        spa_only.validate(&mut diag);
        assert!(!diag.has_errors());
    }
}
