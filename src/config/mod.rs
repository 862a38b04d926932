//! Configuration management for `rendition.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── generate   # [generate]
//! │   ├── render     # [render] and sub-sections
//! │   ├── router     # [router]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # Config (this file)
//! ```
//!
//! Defaults are applied once by serde when the file is parsed; the render
//! pipeline and generator only ever see fully populated sections.

pub mod section;
pub mod types;
mod util;

use util::{find_config_file, resolve_path};

pub use section::{
    AppConfig, BuildConfig, CspConfig, EtagConfig, ExcludePattern, Fallback, GenerateConfig,
    GenerateHookConfig, GenerateHooksConfig, GlobalsConfig, Http2Config, ModernMode,
    RenderConfig, RouteEntry, RouterConfig, ServeConfig, StaticAssetsConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands, GenerateArgs},
    log,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `rendition.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub generate: GenerateConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl Config {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file; the project root is the
    /// file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config) else {
            bail!(ConfigError::Validation(format!(
                "config file '{}' not found",
                cli.config.display()
            )));
        };

        let mut config = Self::from_path(&config_path)?;
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        config.config_path = config_path;
        config.finalize(&root);
        config.apply_command_options(cli);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Resolve relative paths against the project root.
    pub fn finalize(&mut self, root: &Path) {
        self.root = resolve_path(root, &std::env::current_dir().unwrap_or_default());
        self.build.dir = resolve_path(&self.build.dir, &self.root);
        self.build.static_dir = resolve_path(&self.build.static_dir, &self.root);
        self.generate.dir = resolve_path(&self.generate.dir, &self.root);
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        match &cli.command {
            Commands::Generate { args } => self.apply_generate_args(args),
            Commands::Serve {
                interface,
                port,
                watch,
                dev,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
                if *dev {
                    self.build.dev = true;
                }
            }
            Commands::Render { .. } => {}
        }
    }

    fn apply_generate_args(&mut self, args: &GenerateArgs) {
        if let Some(dir) = &args.dir {
            self.generate.dir = resolve_path(dir, &self.root);
        }
        Self::update_option(&mut self.generate.concurrency, args.concurrency.as_ref());
        Self::update_option(&mut self.generate.interval, args.interval.as_ref());
        Self::update_option(&mut self.generate.crawler, args.crawler.as_ref());
        Self::update_option(&mut self.build.minify, args.minify.as_ref());
        if args.fail_on_error {
            self.generate.fail_on_error = true;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration. Collects all errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.router.validate(&mut diag);
        self.render.validate(&mut diag);
        self.generate.validate(&mut diag);

        diag.print_warnings();

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(Config::from_str("[build\ndir = \"x\"").is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.config_path, PathBuf::new());
        assert!(config.build.minify);
        assert!(config.render.ssr);
        assert_eq!(config.generate.concurrency, 500);
        assert_eq!(config.serve.port, 3000);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[build]\nminify = false\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = Config::parse_with_ignored(content).unwrap();

        assert!(!config.build.minify);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_finalize_resolves_paths() {
        let mut config = test_parse_config("[build]\ndir = \"out\"\n[generate]\ndir = \"site\"");
        config.finalize(Path::new("/project"));
        assert_eq!(config.build.dir, PathBuf::from("/project/out"));
        assert_eq!(config.build.static_dir, PathBuf::from("/project/static"));
        assert_eq!(config.generate.dir, PathBuf::from("/project/site"));
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut config = test_parse_config(
            "[router]\nbase = \"docs\"\n[generate]\nconcurrency = 0",
        );
        config.render.app.command = vec!["node".into()];
        let err = config.validate().unwrap_err();
        let display = format!("{err}");
        assert!(display.contains("router.base"));
        assert!(display.contains("generate.concurrency"));
    }
}
