//! HTTP server rendering routes on demand.
//!
//! ```text
//! request ─▶ shutdown? ─▶ bundle / static file? ─▶ ready? ─▶ render_route ─▶ page_response
//!              503           respond_file           loading page                 │
//!                                                                    ETag · Link · CSP · Vary
//! ```
//!
//! Requests are handled on a small rayon pool; renders run on a shared tokio
//! runtime. With `serve.watch` the build directory is watched and resources
//! are reloaded in place.

mod path;
mod push;
mod response;

pub use push::{PushAssets, PushPolicy};
pub use response::{PageResponse, page_response};

use crate::config::Config;
use crate::core::{is_shutdown, register_server};
use crate::manifest::watch::ResourceWatcher;
use crate::render::{RenderContext, RenderError, Renderer, RequestInfo};
use crate::utils::url::{is_url, url_join};
use crate::{debug, log};
use anyhow::{Result, anyhow};
use path::{FileRoots, StaticFile};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tiny_http::{Method, Request, Server};
use tokio::runtime::Handle;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Request handler threads.
const WORKERS: usize = 4;

/// Bound server ready to accept requests.
pub struct BoundServer {
    server: Arc<Server>,
}

/// Bind the HTTP server and register it for graceful shutdown.
pub fn bind_server(config: &Config) -> Result<BoundServer> {
    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    Ok(BoundServer { server })
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Everything a request handler needs.
struct ServeState {
    config: Arc<Config>,
    renderer: Arc<Renderer>,
    push: PushPolicy,
    roots: FileRoots,
    runtime: Handle,
}

impl BoundServer {
    /// Run the request loop until shutdown (blocking).
    ///
    /// Must be called outside of the runtime `runtime` belongs to.
    pub fn run(self, renderer: Arc<Renderer>, push: PushPolicy, runtime: Handle) -> Result<()> {
        let config = renderer.shared_config();

        if config.serve.watch {
            spawn_watcher(&renderer, &runtime);
        }

        let state = Arc::new(ServeState {
            roots: file_roots(&config),
            config,
            renderer,
            push,
            runtime,
        });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(WORKERS)
            .build()
            .expect("failed to create thread pool");

        for request in self.server.incoming_requests() {
            let state = Arc::clone(&state);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &state) {
                    log!("serve"; "request error: {e:#}");
                }
            });
        }
        Ok(())
    }
}

fn spawn_watcher(renderer: &Arc<Renderer>, runtime: &Handle) {
    let build_dir = renderer.config().build.dir.clone();
    let watcher = match ResourceWatcher::new(&build_dir) {
        Ok(watcher) => watcher,
        Err(e) => {
            log!("warning"; "cannot watch {}: {}", build_dir.display(), e);
            return;
        }
    };

    let renderer = Arc::clone(renderer);
    runtime.spawn(watcher.run(move || {
        let report = renderer.load_resources();
        if report.changed() {
            log!("serve"; "resources reloaded ({} updated, {} removed)",
                report.updated.len(), report.removed.len());
        }
    }));
    debug!("watch"; "{}", build_dir.display());
}

fn file_roots(config: &Config) -> FileRoots {
    let public_path = &config.build.public_path;
    FileRoots {
        bundle_prefix: (!is_url(public_path)).then(|| url_join(&config.router.base, public_path)),
        bundle_dir: config.build.client_dist(),
        router_base: config.router.base.clone(),
        static_dir: config.build.static_dir.clone(),
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_error(request, 405, "Method Not Allowed");
    }

    if let Some(file) = state.roots.resolve(request.url()) {
        return match file {
            StaticFile::Bundle(path) => response::respond_file(request, &path, true),
            StaticFile::Static(path) => response::respond_file(request, &path, false),
        };
    }

    let renderer = &state.renderer;
    if !renderer.is_ready() && state.config.build.dev {
        let loading = renderer.store().snapshot();
        let loading = loading.as_ref().and_then(|r| r.loading_html.as_deref());
        return response::respond_loading(request, loading);
    }

    let info = request_info(&request);
    let if_none_match = info.header("if-none-match").map(str::to_string);
    let ctx = RenderContext::new(request.url()).with_request(info.clone());

    let result = match state.runtime.block_on(renderer.render_route(request.url(), ctx)) {
        Ok(result) => result,
        Err(e @ RenderError::InvalidUrl(..)) => {
            debug!("serve"; "{}", e);
            return response::respond_error(request, 400, "Bad Request");
        }
        Err(e @ RenderError::NotReady(_)) => {
            log!("warning"; "{}", e);
            return response::respond_unavailable(request);
        }
    };

    if let Some(error) = result.error.as_ref().filter(|e| e.is_crash()) {
        log!("error"; "{}: {}", request.url(), error.message);
    }

    let links = match renderer.composition() {
        Some(composition) if state.config.render.http2.push && result.error.is_none() => state
            .push
            .links(&info, &composition.public_path, &result.preload_files, result.modern),
        _ => Vec::new(),
    };

    let page = page_response(
        result,
        &state.config,
        if_none_match.as_deref(),
        renderer.negotiates_modern(),
        &links,
    );
    response::respond_page(request, page)
}

/// Collect the request data the renderer looks at.
fn request_info(request: &Request) -> RequestInfo {
    let headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
        .collect();
    let user_agent = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
        .map(|(_, v)| v.clone());

    RequestInfo {
        headers,
        user_agent,
        ..RequestInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_file_roots_from_config() {
        let mut config = test_parse_config("[router]\nbase = \"/docs/\"");
        config.finalize(std::path::Path::new("/srv/site"));

        let roots = file_roots(&config);
        assert_eq!(roots.bundle_prefix.as_deref(), Some("/docs/_app/"));
        assert_eq!(roots.bundle_dir, std::path::PathBuf::from("/srv/site/.rendition/dist/client"));
        assert_eq!(roots.static_dir, std::path::PathBuf::from("/srv/site/static"));
    }

    #[test]
    fn test_cdn_bundles_are_not_served() {
        let config = test_parse_config("[build]\npublic_path = \"https://cdn.example.com/app/\"");
        assert!(file_roots(&config).bundle_prefix.is_none());
    }
}
