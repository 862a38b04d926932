//! Composition of everything a render needs.
//!
//! A [`Composition`] is rebuilt from scratch after every load batch that
//! changed a resource, never patched in place.

use super::modern::resolve_mode;
use super::spa::SpaRenderer;
use super::template::{PlaceholderTemplate, ShellTemplate};
use crate::app::{AppFactory, AppRenderer};
use crate::config::{Config, ModernMode};
use crate::manifest::{AssetMapping, Manifest, Resources};
use crate::utils::url::{is_url, url_join};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Resources, derived data and the app renderer for one resource generation.
pub struct Composition {
    pub resources: Arc<Resources>,
    pub client: Arc<Manifest>,
    /// Never `Auto`.
    pub modern_mode: ModernMode,
    /// Empty without a modern manifest.
    pub mapping: AssetMapping,
    /// URL prefix for bundle files.
    pub public_path: String,
    /// `None` in SPA-only mode.
    pub app: Option<Arc<dyn AppRenderer>>,
    pub ssr_template: Option<Arc<dyn ShellTemplate>>,
    pub spa_template: Arc<dyn ShellTemplate>,
    pub error_template: Option<Arc<dyn ShellTemplate>>,
    pub spa: SpaRenderer,
}

pub(super) fn compose(
    config: &Config,
    resources: Arc<Resources>,
    factory: &dyn AppFactory,
) -> Result<Composition> {
    let ssr = config.render.ssr;

    let client = resources
        .client
        .clone()
        .context("client manifest is not loaded")?;
    let spa_template = resources
        .spa_template
        .as_deref()
        .context("SPA template is not loaded")?;

    let app = if ssr {
        let server = resources
            .server
            .as_deref()
            .context("server manifest is not loaded")?;
        Some(factory.create(server)?)
    } else {
        None
    };

    let modern_mode = resolve_mode(config.render.modern, ssr, resources.modern.is_some());
    let mapping = match (&resources.modern, modern_mode) {
        (Some(modern), ModernMode::Client | ModernMode::Server) => {
            AssetMapping::build(&client, modern)
        }
        _ => AssetMapping::default(),
    };

    let public_path = if !client.public_path.is_empty() {
        client.public_path.clone()
    } else if is_url(&config.build.public_path) {
        config.build.public_path.clone()
    } else {
        url_join(&config.router.base, &config.build.public_path)
    };

    Ok(Composition {
        ssr_template: resources.ssr_template.as_deref().map(template),
        spa_template: template(spa_template),
        error_template: resources.error_template.as_deref().map(template),
        resources,
        client,
        modern_mode,
        mapping,
        public_path,
        app,
        spa: SpaRenderer::new(),
    })
}

fn template(src: &str) -> Arc<dyn ShellTemplate> {
    Arc::new(PlaceholderTemplate::parse(src))
}
