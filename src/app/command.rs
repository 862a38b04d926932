//! App renderer backed by an external process.
//!
//! The configured command runs once per render. It receives the render
//! context as JSON on stdin:
//!
//! ```json
//! { "url": "/about", "spa": false, "modern": true, "payload": null,
//!   "state": {}, "headers": { "accept": "text/html" } }
//! ```
//!
//! and prints its output as JSON on stdout:
//!
//! ```json
//! { "html": "<div id=\"__app\">...</div>",
//!   "meta": { "title": "<title>About</title>" },
//!   "state": { "data": [{}] },
//!   "preloadFiles": ["pages/about.js"],
//!   "error": { "statusCode": 404, "message": "Not found" },
//!   "redirect": { "location": "/login", "status": 302 } }
//! ```

use super::{AppOutput, AppRenderer, MetaFragments};
use crate::config::Config;
use crate::hooks::{build_vars, resolve_args};
use crate::manifest::Manifest;
use crate::render::{PageError, RenderContext};
use crate::render::context::Redirect;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs `render.app.command` for every render.
pub struct CommandApp {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
    vars: FxHashMap<String, String>,
    timeout: Duration,
}

impl CommandApp {
    /// Build from config and the server manifest; `$RENDITION_SERVER_ENTRY`
    /// points at the manifest's entry file.
    pub fn new(config: &Config, server: &Manifest) -> Result<Self> {
        let mut vars = build_vars(config);
        if let Some(entry) = server.entry() {
            vars.insert(
                "RENDITION_SERVER_ENTRY".into(),
                config.build.server_dist().join(entry).display().to_string(),
            );
        }

        let mut command = resolve_args(&config.render.app.command, &vars).into_iter();
        let Some(program) = command.next() else {
            bail!("`render.app.command` is empty");
        };

        Ok(Self {
            program,
            args: command.collect(),
            cwd: config.get_root().to_path_buf(),
            vars,
            timeout: Duration::from_secs(config.render.app.timeout),
        })
    }

    /// Factory building a fresh `CommandApp` for every resource load.
    pub fn factory(
        config: Arc<Config>,
    ) -> impl Fn(&Manifest) -> Result<Arc<dyn AppRenderer>> + Send + Sync {
        move |server| Ok(Arc::new(Self::new(&config, server)?) as Arc<dyn AppRenderer>)
    }

    async fn run(&self, input: Vec<u8>) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .envs(&self.vars)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program))?;

        // A command that ignores its input may exit before reading it.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(&input).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| format!("`{}` timed out after {:?}", self.program, self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{}` exited with {}: {}", self.program, output.status, stderr.trim());
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl AppRenderer for CommandApp {
    async fn render_to_string(&self, ctx: &mut RenderContext) -> Result<AppOutput> {
        let input = serde_json::to_vec(&ContextView::from(&*ctx))?;
        let stdout = self.run(input).await?;
        let response: CommandResponse =
            serde_json::from_slice(&stdout).context("app command printed invalid JSON")?;
        Ok(response.apply(ctx))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ContextView<'a> {
    url: &'a str,
    spa: bool,
    modern: bool,
    payload: Option<&'a Value>,
    state: &'a Map<String, Value>,
    headers: FxHashMap<String, &'a str>,
}

impl<'a> From<&'a RenderContext> for ContextView<'a> {
    fn from(ctx: &'a RenderContext) -> Self {
        let headers = ctx
            .request
            .iter()
            .flat_map(|r| &r.headers)
            .map(|(k, v)| (k.to_ascii_lowercase(), v.as_str()))
            .collect();
        Self {
            url: &ctx.url,
            spa: ctx.spa.unwrap_or(false),
            modern: ctx.modern.unwrap_or(false),
            payload: ctx.payload.as_ref(),
            state: &ctx.state,
            headers,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CommandResponse {
    html: String,
    meta: MetaFragments,
    state: Map<String, Value>,
    preload_files: Vec<String>,
    error: Option<ErrorResponse>,
    redirect: Option<RedirectResponse>,
    server_rendered: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default = "default_error_status")]
    status_code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RedirectResponse {
    location: String,
    #[serde(default = "default_redirect_status")]
    status: u16,
}

fn default_error_status() -> u16 {
    500
}

fn default_redirect_status() -> u16 {
    302
}

impl CommandResponse {
    fn apply(self, ctx: &mut RenderContext) -> AppOutput {
        ctx.state.extend(self.state);
        if let Some(error) = self.error {
            ctx.error = Some(PageError::application(error.status_code, error.message));
        }
        if let Some(redirect) = self.redirect {
            ctx.redirect = Some(Redirect {
                location: redirect.location,
                status: redirect.status,
            });
        }
        ctx.server_rendered = self.server_rendered.unwrap_or(true);

        AppOutput {
            html: self.html,
            meta: self.meta,
            preload_files: self.preload_files,
        }
    }
}
