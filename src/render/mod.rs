//! Render pipeline.
//!
//! # Module Structure
//!
//! | Module     | Purpose                                                |
//! |------------|--------------------------------------------------------|
//! | `context`  | Per-render input (`RenderContext`) and `RenderResult`   |
//! | `factory`  | Composition of resources, mapping, app and templates    |
//! | `ssr`      | Server-side render of one route                         |
//! | `spa`      | SPA shell render, cached per `(modern, url)`            |
//! | `modern`   | Modern mode resolution, UA sniffing, module scripts     |
//! | `hints`    | preload / prefetch / modulepreload links                |
//! | `state`    | State serialization                                     |
//! | `payload`  | Splitting state into static side files                  |
//! | `template` | HTML shell placeholders                                 |
//!
//! # Flow
//!
//! ```text
//! ManifestStore::load ──▶ Renderer::recompose ──▶ ArcSwapOption<Composition>
//!                                                        │ (one Arc per render)
//! render_route(url, ctx) ─▶ validate ─▶ wait ready ─▶ select ─┬─▶ spa::render
//!                                                             └─▶ ssr::render
//! ```

pub mod context;
mod factory;
mod hints;
mod modern;
pub mod payload;
mod spa;
mod ssr;
pub mod state;
pub mod template;

#[cfg(test)]
mod tests;

pub use context::{
    PageError, PageErrorKind, Redirect, RenderContext, RenderResult, RequestInfo, StaticAsset,
};
pub use factory::Composition;
pub use modern::is_modern_browser;

use crate::app::AppFactory;
use crate::config::{Config, ModernMode};
use crate::manifest::{LoadReport, ManifestStore};
use crate::{debug, log};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Delay between readiness checks.
const READY_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid url `{0}`: {1}")]
    InvalidUrl(String, &'static str),

    #[error("server resources are not available (missing: {})", .0.join(", "))]
    NotReady(Vec<&'static str>),
}

/// Renders routes against the current resource composition.
pub struct Renderer {
    config: Arc<Config>,
    store: Arc<ManifestStore>,
    factory: Arc<dyn AppFactory>,
    composition: ArcSwapOption<Composition>,
}

impl Renderer {
    pub fn new(config: Arc<Config>, store: Arc<ManifestStore>, factory: Arc<dyn AppFactory>) -> Self {
        Self {
            config,
            store,
            factory,
            composition: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Load resources from the build directory and recompose once if anything changed.
    pub fn load_resources(&self) -> LoadReport {
        let report = self.store.load(&self.config.build.dir);
        if report.changed() || self.composition.load().is_none() {
            self.recompose();
        }
        report
    }

    /// Build a new composition from the current snapshot and publish it.
    ///
    /// Clears the composition when required resources are missing.
    pub fn recompose(&self) {
        let ssr = self.config.render.ssr;
        let next = match self.store.snapshot() {
            Some(resources) if resources.missing(ssr).is_empty() => {
                match factory::compose(&self.config, resources, self.factory.as_ref()) {
                    Ok(composition) => Some(Arc::new(composition)),
                    Err(e) => {
                        log!("error"; "failed to set up renderer: {:#}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        if let Some(composition) = &next {
            debug!("render"; "composed (modern mode: {:?}, {} mapped assets)",
                composition.modern_mode, composition.mapping.len());
        }
        self.composition.store(next);
    }

    pub fn composition(&self) -> Option<Arc<Composition>> {
        self.composition.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.composition.load().is_some()
    }

    /// Whether responses depend on the user agent.
    pub fn negotiates_modern(&self) -> bool {
        self.composition
            .load()
            .as_ref()
            .is_some_and(|c| c.modern_mode == ModernMode::Server)
    }

    /// Wait for a composition, polling once per second.
    ///
    /// Gives up after 3 retries, or 60 in development.
    pub async fn wait_ready(&self) -> Result<Arc<Composition>, RenderError> {
        let retries = if self.config.build.dev { 60 } else { 3 };

        for attempt in 0..=retries {
            if let Some(composition) = self.composition.load_full() {
                return Ok(composition);
            }
            if attempt < retries {
                tokio::time::sleep(READY_POLL).await;
            }
        }

        let mut missing: Vec<&'static str> = self
            .store
            .missing(self.config.render.ssr)
            .into_iter()
            .map(|kind| kind.file_name())
            .collect();
        if missing.is_empty() {
            missing.push("app renderer");
        }
        Err(RenderError::NotReady(missing))
    }

    /// Render one route.
    ///
    /// Errors are returned only for invalid input and unavailable resources;
    /// application failures are reported through [`RenderResult::error`].
    pub async fn render_route(
        &self,
        url: &str,
        mut ctx: RenderContext,
    ) -> Result<RenderResult, RenderError> {
        validate_url(url)?;
        let composition = self.wait_ready().await?;

        ctx.url = url.to_string();
        let spa = !self.config.render.ssr || ctx.spa == Some(true) || ctx.request_spa();
        let modern = match composition.modern_mode {
            ModernMode::Client => true,
            ModernMode::Server => is_modern_request(&ctx),
            ModernMode::Off | ModernMode::Auto => false,
        };
        ctx.spa = Some(spa);
        ctx.modern = Some(modern);

        let result = if spa {
            composition.spa.render(&composition, &self.config, ctx, modern)
        } else {
            ssr::render(&composition, &self.config, ctx, modern).await
        };
        Ok(result)
    }
}

/// Explicit flags win over user-agent sniffing.
fn is_modern_request(ctx: &RenderContext) -> bool {
    if let Some(modern) = ctx.modern {
        return modern;
    }
    let Some(request) = &ctx.request else {
        return false;
    };
    if let Some(modern) = request.modern {
        return modern;
    }
    request
        .user_agent
        .as_deref()
        .or_else(|| request.header("user-agent"))
        .is_some_and(is_modern_browser)
}

fn validate_url(url: &str) -> Result<(), RenderError> {
    let reason = if url.is_empty() {
        "empty"
    } else if url.starts_with("//") {
        "scheme-relative urls are not routes"
    } else if !url.starts_with('/') {
        "must start with `/`"
    } else if url.chars().any(char::is_control) {
        "contains control characters"
    } else {
        return Ok(());
    };
    Err(RenderError::InvalidUrl(url.to_string(), reason))
}
