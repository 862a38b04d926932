//! `rendition render <url>`: render one route to stdout.

use super::{command_renderer, runtime};
use crate::config::Config;
use crate::render::RenderContext;
use anyhow::{Result, bail};
use std::io::Write;
use std::sync::Arc;

pub fn render_url(config: &Arc<Config>, url: &str, spa: bool, modern: Option<bool>) -> Result<()> {
    let renderer = command_renderer(config);
    renderer.load_resources();

    let mut ctx = RenderContext::new(url);
    if spa {
        ctx = ctx.spa();
    }
    ctx.modern = modern;

    let result = runtime().block_on(renderer.render_route(url, ctx))?;

    if let Some(redirect) = &result.redirected {
        // stdout carries page markup only
        eprintln!("{} redirects to {} ({})", url, redirect.location, redirect.status);
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(result.html.as_bytes())?;
    stdout.flush()?;

    match &result.error {
        Some(error) if error.is_crash() => bail!("{} failed to render: {}", url, error.message),
        Some(error) => {
            eprintln!("{} rendered with status {}: {}", url, error.status, error.message);
            Ok(())
        }
        None => Ok(()),
    }
}
