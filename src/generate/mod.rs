//! Static site generation.
//!
//! # Phases
//!
//! ```text
//! initiate ─▶ init dist ─▶ init routes ─▶ crawl loop ─▶ SPA fallback ─▶ manifest.js ─▶ after hooks
//!  (ready,     (empty,      (routes.json,   (batches of
//!   before      copy         exclude,        `concurrency`,
//!   hooks)      static)      configured)     crawled links)
//! ```
//!
//! Route failures never abort a run: they are collected in
//! [`GenerateReport::errors`] as handled (page still written) or unhandled
//! (nothing written). Only the phases outside the crawl loop fail the run.
//!
//! # Module Structure
//!
//! | Module   | Purpose                                         |
//! |----------|-------------------------------------------------|
//! | `routes` | Route tree, exclusion, normalization, out paths |
//! | `crawl`  | `<a href>` discovery                            |
//! | `minify` | HTML minification                               |
//! | `hooks`  | Programmatic hooks                              |
//! | `error`  | Error classification and summary                |

mod crawl;
mod error;
mod hooks;
mod minify;
mod routes;


pub use error::{ErrorKind, GenerateError, GenerationError, print_report};
pub use hooks::{GenerateHooks, NoHooks, Page};
pub use minify::{MinifyError, minify_html};
pub use routes::{GeneratedRoute, output_path};

use crate::config::Config;
use crate::core::is_shutdown;
use crate::hooks::run_hooks;
use crate::logger::ProgressLine;
use crate::render::{RenderContext, Renderer, state::jsonp_script};
use crate::utils::fs::{copy_dir, empty_dir, write_file};
use crate::utils::html::escape;
use crate::utils::plural::plural_count;
use crate::utils::url::{decode, is_url, url_join, without_trailing_slash};
use crate::{debug, log};
use anyhow::{Context, Result, bail};
use futures::stream::{FuturesUnordered, StreamExt};
use routes::{Exclusion, merge_defaults, normalize_route};
use rustc_hash::FxHashSet;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Clear the output directory and copy static and client files first.
    pub init_dist: bool,
    /// Hide the progress line.
    pub quiet: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            init_dist: true,
            quiet: false,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Default)]
pub struct GenerateReport {
    /// Routes whose page was written, in completion order.
    pub routes: Vec<String>,
    pub errors: Vec<GenerationError>,
    /// SPA fallback file, if one was written.
    pub fallback: Option<PathBuf>,
    /// Stopped early by Ctrl+C or `max_errors`.
    pub interrupted: bool,
    pub duration: Duration,
}

impl GenerateReport {
    pub fn unhandled(&self) -> usize {
        self.errors.iter().filter(|e| e.is_unhandled()).count()
    }

    pub fn has_unhandled(&self) -> bool {
        self.errors.iter().any(GenerationError::is_unhandled)
    }
}

/// Where static payload files of this run go.
struct StaticAssetsTarget {
    /// URL prefix passed to renders.
    base: String,
    dir: PathBuf,
}

/// Output locations and filters of one run.
struct RunContext {
    dist: PathBuf,
    /// Copy of the client build; `None` when bundles are served from a CDN.
    assets_dir: Option<PathBuf>,
    static_assets: Option<StaticAssetsTarget>,
    exclusion: Exclusion,
    crawl: bool,
}

/// What a route task hands back to the crawl loop.
struct RouteOutcome {
    route: String,
    links: Vec<String>,
    errors: Vec<GenerationError>,
    written: bool,
    /// Rendered without error or redirect; listed in `manifest.js`.
    clean: bool,
}

impl RouteOutcome {
    fn new(route: &str) -> Self {
        Self {
            route: route.to_string(),
            links: Vec::new(),
            errors: Vec::new(),
            written: false,
            clean: false,
        }
    }
}

pub struct Generator {
    config: Arc<Config>,
    renderer: Arc<Renderer>,
    hooks: Arc<dyn GenerateHooks>,
    payload: Option<Value>,
}

impl Generator {
    pub fn new(config: Arc<Config>, renderer: Arc<Renderer>) -> Self {
        Self {
            config,
            renderer,
            hooks: Arc::new(NoHooks),
            payload: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn GenerateHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set a payload shared by all routes. Repeated calls deep-merge, newer values win.
    ///
    /// Route payloads take precedence over the shared one.
    pub fn set_payload(&mut self, payload: Value) {
        let mut next = payload;
        if let Some(previous) = &self.payload {
            merge_defaults(&mut next, previous);
        }
        self.payload = Some(next);
    }

    pub async fn generate(&self, options: GenerateOptions) -> Result<GenerateReport, GenerateError> {
        let started = Instant::now();
        let config = &self.config;

        // initiate
        if !self.renderer.is_ready() {
            self.renderer.load_resources();
        }
        let composition = self.renderer.wait_ready().await?;
        run_hooks(&config.generate.hooks.before, config, "before")
            .await
            .map_err(GenerateError::BeforeHook)?;
        self.hooks
            .before_generate()
            .await
            .map_err(GenerateError::BeforeHook)?;

        let run = self
            .run_context(&composition.public_path)
            .map_err(GenerateError::Routes)?;
        if options.init_dist {
            self.init_dist(&run).map_err(GenerateError::Dist)?;
        }

        let routes = self.init_routes(&run).await.map_err(GenerateError::Routes)?;
        log!("generate"; "{} into {}", plural_count(routes.len(), "route"), run.dist.display());

        let (mut report, clean_routes) = self.crawl(&run, routes, options.quiet).await;

        self.write_fallback(&run, &mut report).await;

        if let Some(target) = &run.static_assets
            && config.generate.manifest
        {
            self.write_manifest(target, clean_routes)
                .await
                .map_err(|e| GenerateError::Output("manifest.js", e))?;
        }

        report.duration = started.elapsed();

        run_hooks(&config.generate.hooks.after, config, "after")
            .await
            .map_err(GenerateError::AfterHook)?;
        self.hooks
            .after_generate(&report)
            .await
            .map_err(GenerateError::AfterHook)?;

        Ok(report)
    }

    fn run_context(&self, public_path: &str) -> Result<RunContext> {
        let config = &self.config;
        let dist = config.generate.dir.clone();

        let assets_dir = (!is_url(&config.build.public_path))
            .then(|| dist.join(config.build.public_path.trim_matches('/')));

        let static_assets = config.generate.static_assets.enable.then(|| {
            let section = &config.generate.static_assets;
            let version = section.version.clone().unwrap_or_else(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default()
                    .to_string()
            });
            let rel = format!("{}/{}", section.dir.trim_matches('/'), version);
            StaticAssetsTarget {
                base: url_join(public_path, &rel),
                dir: assets_dir.as_ref().unwrap_or(&dist).join(&rel),
            }
        });

        Ok(RunContext {
            exclusion: Exclusion::new(&config.generate.exclude)?,
            crawl: config.generate.crawler && config.render.ssr,
            dist,
            assets_dir,
            static_assets,
        })
    }

    fn init_dist(&self, run: &RunContext) -> Result<()> {
        let config = &self.config;
        if config.get_root().starts_with(&run.dist) || config.build.dir.starts_with(&run.dist) {
            bail!(
                "refusing to clear {}: it contains the project or build directory",
                run.dist.display()
            );
        }

        empty_dir(&run.dist)?;

        let copied = copy_dir(&config.build.static_dir, &run.dist)?;
        debug!("generate"; "copied {} from {}", plural_count(copied, "static file"), config.build.static_dir.display());

        if let Some(assets_dir) = &run.assets_dir {
            let copied = copy_dir(&config.build.client_dist(), assets_dir)?;
            debug!("generate"; "copied {}", plural_count(copied, "client file"));
        }

        if let Some(target) = &run.static_assets {
            std::fs::create_dir_all(&target.dir)
                .with_context(|| format!("Failed to create directory: {}", target.dir.display()))?;
        }

        if config.generate.nojekyll {
            std::fs::write(run.dist.join(".nojekyll"), "")
                .context("Failed to write .nojekyll")?;
        }

        Ok(())
    }

    async fn init_routes(&self, run: &RunContext) -> Result<Vec<GeneratedRoute>> {
        let config = &self.config;

        let app_routes = routes::read_app_routes(&config.build.dir)?;
        let mut merged = routes::merge_routes(app_routes, &config.generate.routes);
        self.hooks
            .extend_routes(&mut merged)
            .await
            .context("extend-routes hook failed")?;

        let mut routes = Vec::with_capacity(merged.len());
        for mut route in merged {
            match normalize_route(&config.router, &route.route) {
                Some(key) if run.exclusion.is_excluded(&key) => {
                    debug!("generate"; "excluded {}", key);
                }
                Some(key) => {
                    route.route = key;
                    routes.push(route);
                }
                None => {
                    log!("warning"; "skipping `{}`: resolves outside the output directory", route.route);
                }
            }
        }
        Ok(routes)
    }

    /// Render all routes, `concurrency` at a time, queueing discovered links.
    ///
    /// Returns the report and the routes eligible for `manifest.js`.
    async fn crawl(
        &self,
        run: &RunContext,
        routes: Vec<GeneratedRoute>,
        quiet: bool,
    ) -> (GenerateReport, Vec<String>) {
        let generate = &self.config.generate;
        let concurrency = generate.concurrency.max(1);
        let interval = generate.interval;

        let mut known: FxHashSet<String> = FxHashSet::default();
        let mut pending: VecDeque<GeneratedRoute> = VecDeque::with_capacity(routes.len());
        for route in routes {
            if known.insert(route.route.clone()) {
                pending.push_back(route);
            }
        }

        let progress = (!quiet).then(|| ProgressLine::new(&[("routes", pending.len())]));
        let mut report = GenerateReport::default();
        let mut clean_routes = Vec::new();

        while !pending.is_empty() {
            if is_shutdown() {
                report.interrupted = true;
                break;
            }
            if let Some(max) = generate.max_errors
                && report.errors.len() >= max
            {
                log!("warning"; "stopping: {} reached", plural_count(report.errors.len(), "error"));
                report.interrupted = true;
                break;
            }

            let size = concurrency.min(pending.len());
            let mut in_flight: FuturesUnordered<_> = pending
                .drain(..size)
                .enumerate()
                .map(|(i, route)| {
                    let delay = Duration::from_millis(interval.saturating_mul(i as u64));
                    async move {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        self.generate_route(run, route).await
                    }
                })
                .collect();

            while let Some(outcome) = in_flight.next().await {
                for link in outcome.links {
                    if known.insert(link.clone()) {
                        pending.push_back(GeneratedRoute::new(link));
                        if let Some(progress) = &progress {
                            progress.grow("routes", 1);
                        }
                    }
                }
                if let Some(progress) = &progress {
                    progress.inc("routes");
                }

                if outcome.written {
                    report.routes.push(outcome.route.clone());
                }
                if outcome.clean {
                    clean_routes.push(without_trailing_slash(&outcome.route).to_string());
                }
                report.errors.extend(outcome.errors);
            }
        }

        if let Some(progress) = progress {
            progress.finish();
        }
        (report, clean_routes)
    }

    async fn generate_route(&self, run: &RunContext, route: GeneratedRoute) -> RouteOutcome {
        let mut outcome = RouteOutcome::new(&route.route);

        if let Err(e) = self.render_and_write(run, route, &mut outcome).await {
            outcome.errors.push(GenerationError::unhandled(&outcome.route, &e));
        }

        if outcome.errors.iter().any(GenerationError::is_unhandled) {
            outcome.clean = false;
            debug!("generate"; "{} failed", outcome.route);
            self.hooks.route_failed(&outcome.route, &outcome.errors).await;
        }

        outcome
    }

    async fn render_and_write(
        &self,
        run: &RunContext,
        route: GeneratedRoute,
        outcome: &mut RouteOutcome,
    ) -> Result<()> {
        let config = &self.config;

        let mut payload = route.payload;
        if let Some(shared) = &self.payload {
            merge_defaults(payload.get_or_insert(Value::Null), shared);
        }
        let mut ctx = RenderContext::new(&route.route).with_payload(payload);
        if let Some(target) = &run.static_assets {
            ctx = ctx.with_static_assets_base(&target.base);
        }
        self.hooks
            .route_will_render(&route.route, &mut ctx)
            .await
            .context("route-will-render hook failed")?;

        let result = self.renderer.render_route(&route.route, ctx).await?;

        if let Some(error) = &result.error {
            if error.is_crash() {
                bail!("render failed: {}", error.message);
            }
            outcome.errors.push(GenerationError::handled(
                &route.route,
                format!("{} {}", error.status, error.message),
            ));
        }

        let mut html = match &result.redirected {
            Some(redirect) => redirect_page(&redirect.location),
            None => result.html,
        };
        outcome.clean = result.error.is_none() && result.redirected.is_none();

        if run.crawl && result.redirected.is_none() {
            outcome.links = crawl::extract_links(&html, &config.router, &run.exclusion);
        }

        if config.build.minify {
            match minify_html(&html) {
                Ok(minified) => html = minified,
                Err(e) => outcome.errors.push(GenerationError::handled(
                    &route.route,
                    format!("HTML minification failed: {e}"),
                )),
            }
        }

        if let Some(target) = &run.static_assets {
            for asset in &result.static_assets {
                let rel = decode(asset.path.trim_start_matches('/'));
                write_file(&target.dir.join(rel.as_ref()), &asset.src).await?;
            }
        }

        let mut page = Page {
            path: output_path(&route.route, config.generate.subfolders),
            route: route.route,
            html,
            exclude: false,
            errors: outcome.errors.clone(),
        };
        self.hooks.page(&mut page).await.context("page hook failed")?;
        if page.exclude {
            outcome.clean = false;
            return Ok(());
        }

        write_file(&run.dist.join(&page.path), &page.html).await?;
        outcome.written = true;

        self.hooks
            .route_rendered(&page)
            .await
            .context("route-rendered hook failed")
    }

    /// Render `/` as SPA shell into the fallback file, unless that file exists.
    async fn write_fallback(&self, run: &RunContext, report: &mut GenerateReport) {
        let Some(name) = self.config.generate.fallback.path() else {
            return;
        };

        let path = run.dist.join(name);
        if path.exists() {
            log!("warning"; "SPA fallback `{}` already exists, not overwriting", name);
            return;
        }

        let mut ctx = RenderContext::new("/").spa();
        if let Some(target) = &run.static_assets {
            ctx = ctx.with_static_assets_base(&target.base);
        }
        let mut html = match self.renderer.render_route("/", ctx).await {
            Ok(result) => result.html,
            Err(e) => {
                report.errors.push(GenerationError::unhandled(name, &e.into()));
                return;
            }
        };

        if self.config.build.minify {
            match minify_html(&html) {
                Ok(minified) => html = minified,
                Err(e) => log!("warning"; "HTML minification failed for SPA fallback: {}", e),
            }
        }

        match write_file(&path, &html).await {
            Ok(()) => {
                debug!("generate"; "client-side fallback created: {}", name);
                report.fallback = Some(path);
            }
            Err(e) => report.errors.push(GenerationError::unhandled(name, &e)),
        }
    }

    async fn write_manifest(&self, target: &StaticAssetsTarget, mut routes: Vec<String>) -> Result<()> {
        routes.sort();
        routes.dedup();
        let src = jsonp_script(
            &self.config.render.globals.jsonp,
            "manifest.js",
            &json!({ "routes": routes }),
        );
        write_file(&target.dir.join("manifest.js"), src).await
    }
}

/// Page written for routes that redirected during generation.
fn redirect_page(location: &str) -> String {
    let location = escape(location);
    format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"0; url={location}\">\
         <link rel=\"canonical\" href=\"{location}\"></head><body></body></html>"
    )
}
