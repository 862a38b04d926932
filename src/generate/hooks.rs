//! Programmatic generation hooks.
//!
//! Every method has a no-op default. Errors from per-route hooks are
//! recorded as unhandled errors of that route; errors from
//! `before_generate` and `after_generate` abort the run.

use super::error::GenerationError;
use super::routes::GeneratedRoute;
use super::GenerateReport;
use crate::render::RenderContext;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// A rendered page about to be written.
#[derive(Debug)]
pub struct Page {
    pub route: String,
    /// Output file relative to the generate directory.
    pub path: PathBuf,
    pub html: String,
    /// Set to skip writing the page.
    pub exclude: bool,
    /// Errors recorded for the route so far.
    pub errors: Vec<GenerationError>,
}

#[async_trait]
pub trait GenerateHooks: Send + Sync {
    async fn before_generate(&self) -> Result<()> {
        Ok(())
    }

    /// Add, remove or decorate routes after the configured ones were merged.
    async fn extend_routes(&self, _routes: &mut Vec<GeneratedRoute>) -> Result<()> {
        Ok(())
    }

    /// Adjust the render context (typically its payload) of one route.
    async fn route_will_render(&self, _route: &str, _ctx: &mut RenderContext) -> Result<()> {
        Ok(())
    }

    /// Rewrite the output path or HTML of a page, or exclude it.
    async fn page(&self, _page: &mut Page) -> Result<()> {
        Ok(())
    }

    async fn route_rendered(&self, _page: &Page) -> Result<()> {
        Ok(())
    }

    async fn route_failed(&self, _route: &str, _errors: &[GenerationError]) {}

    async fn after_generate(&self, _report: &GenerateReport) -> Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
pub struct NoHooks;

impl GenerateHooks for NoHooks {}
