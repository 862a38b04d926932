//! Render pipeline scenarios against a temporary build directory.

use super::*;
use crate::app::{AppFactory, AppOutput, AppRenderer, MetaFragments};
use crate::config::ModernMode;
use crate::manifest::Manifest;
use async_trait::async_trait;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SHELL: &str = "<!DOCTYPE html><html {{ HTML_ATTRS }}><head {{ HEAD_ATTRS }}>{{ HEAD }}</head><body {{ BODY_ATTRS }}>{{ APP }}</body></html>";

type RenderFn = dyn Fn(&mut RenderContext) -> anyhow::Result<AppOutput> + Send + Sync;

struct StubApp(Box<RenderFn>);

#[async_trait]
impl AppRenderer for StubApp {
    async fn render_to_string(&self, ctx: &mut RenderContext) -> anyhow::Result<AppOutput> {
        (self.0)(ctx)
    }
}

fn factory<F>(f: F) -> Arc<dyn AppFactory>
where
    F: Fn(&mut RenderContext) -> anyhow::Result<AppOutput> + Send + Sync + Clone + 'static,
{
    Arc::new(move |_: &Manifest| -> anyhow::Result<Arc<dyn AppRenderer>> {
        Ok(Arc::new(StubApp(Box::new(f.clone()))))
    })
}

fn hello_app() -> Arc<dyn AppFactory> {
    factory(|ctx: &mut RenderContext| {
        ctx.state.insert("data".into(), json!([{ "url": ctx.url }]));
        Ok(AppOutput {
            html: format!("<div id=\"__app\">{}</div>", ctx.url),
            meta: MetaFragments {
                title: "<title>Hello</title>".into(),
                body_append: "<!-- tail -->".into(),
                ..MetaFragments::default()
            },
            preload_files: Vec::new(),
        })
    })
}

fn write_server_file(build_dir: &Path, name: &str, content: &str) {
    let dir = build_dir.join("dist").join("server");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

fn write_build(build_dir: &Path, client: &str) {
    write_server_file(build_dir, "client.manifest.json", client);
    write_server_file(build_dir, "server.manifest.json", r#"{ "files": { "entry": "server.js" } }"#);
    write_server_file(build_dir, "index.ssr.html", SHELL);
    write_server_file(build_dir, "index.spa.html", SHELL);
}

fn test_config(build_dir: &Path) -> Config {
    let mut config = Config::default();
    config.build.dir = build_dir.to_path_buf();
    config
}

fn renderer(config: Config, factory: Arc<dyn AppFactory>) -> Renderer {
    let renderer = Renderer::new(Arc::new(config), Arc::new(ManifestStore::new()), factory);
    renderer.load_resources();
    renderer
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[tokio::test]
async fn test_legacy_render_preloads_initial_script() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let renderer = renderer(test_config(dir.path()), hello_app());

    let result = renderer
        .render_route("/", RenderContext::new("/"))
        .await
        .unwrap();

    assert_eq!(count(&result.html, "rel=\"preload\""), 1);
    assert!(result.html.contains("<link rel=\"preload\" href=\"/_app/app.js\" as=\"script\">"));
    assert!(!result.html.contains("modulepreload"));
    assert!(!result.html.contains("nomodule"));
    assert!(result.html.contains("<script src=\"/_app/app.js\" defer></script>"));
    assert!(!result.modern);
    assert_eq!(result.status(), 200);
}

#[tokio::test]
async fn test_modern_render_pairs_module_and_nomodule() {
    let dir = TempDir::new().unwrap();
    write_build(
        dir.path(),
        r#"{ "initial": ["app.js"], "assetsMapping": { "h1": ["app.js"] } }"#,
    );
    write_server_file(
        dir.path(),
        "modern.manifest.json",
        r#"{ "initial": ["app.modern.js"], "assetsMapping": { "h1": ["app.modern.js"] } }"#,
    );
    let mut config = test_config(dir.path());
    config.render.modern = ModernMode::Client;
    let renderer = renderer(config, hello_app());

    let result = renderer
        .render_route("/", RenderContext::new("/"))
        .await
        .unwrap();

    assert!(result.modern);
    assert!(result.html.contains(
        "<script src=\"/_app/app.js\" defer nomodule></script>\
         <script src=\"/_app/app.modern.js\" defer type=\"module\"></script>"
    ));
    assert!(result.html.contains("<link rel=\"modulepreload\" href=\"/_app/app.modern.js\">"));
    assert!(result.html.contains(modern::SAFARI_NOMODULE_FIX));
    assert!(!result.html.contains("rel=\"preload\" href=\"/_app/app.js\""));
}

#[tokio::test]
async fn test_server_mode_negotiates_by_user_agent() {
    let dir = TempDir::new().unwrap();
    write_build(
        dir.path(),
        r#"{ "initial": ["app.js"], "assetsMapping": { "h1": ["app.js"] } }"#,
    );
    write_server_file(
        dir.path(),
        "modern.manifest.json",
        r#"{ "assetsMapping": { "h1": ["app.modern.js"] } }"#,
    );
    let renderer = renderer(test_config(dir.path()), hello_app());
    assert!(renderer.negotiates_modern());

    let request = |ua: &str| RequestInfo {
        user_agent: Some(ua.to_string()),
        ..RequestInfo::default()
    };
    let modern = renderer
        .render_route(
            "/",
            RenderContext::new("/").with_request(request("Mozilla/5.0 Chrome/120.0 Safari/537.36")),
        )
        .await
        .unwrap();
    let legacy = renderer
        .render_route(
            "/",
            RenderContext::new("/").with_request(request("Mozilla/5.0 (Trident/7.0; rv:11.0)")),
        )
        .await
        .unwrap();

    assert!(modern.modern);
    assert!(modern.html.contains("app.modern.js"));
    assert!(!legacy.modern);
    assert!(!legacy.html.contains("app.modern.js"));
}

#[tokio::test]
async fn test_render_order() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js", "app.css"] }"#);
    let renderer = renderer(test_config(dir.path()), hello_app());

    let html = renderer
        .render_route("/about", RenderContext::new("/about"))
        .await
        .unwrap()
        .html;

    let pos = |needle: &str| {
        html.find(needle)
            .unwrap_or_else(|| panic!("`{needle}` missing from {html}"))
    };
    assert!(pos("<title>Hello</title>") < pos("rel=\"preload\""));
    assert!(pos("rel=\"preload\"") < pos("rel=\"stylesheet\""));
    assert!(pos("rel=\"stylesheet\"") < pos("</head>"));
    assert!(pos("<div id=\"__app\">/about</div>") < pos("window.__APP__="));
    assert!(pos("window.__APP__=") < pos("<script src=\"/_app/app.js\""));
    assert!(pos("<script src=\"/_app/app.js\"") < pos("<!-- tail -->"));
}

#[tokio::test]
async fn test_client_only_app_gets_empty_root() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let app = factory(|ctx: &mut RenderContext| {
        ctx.server_rendered = false;
        Ok(AppOutput {
            html: "<div id=\"__app\"><p>stale</p></div>".into(),
            ..AppOutput::default()
        })
    });
    let renderer = renderer(test_config(dir.path()), app);

    let html = renderer
        .render_route("/", RenderContext::new("/"))
        .await
        .unwrap()
        .html;

    assert!(html.contains("<div id=\"__app\"></div>"), "{html}");
    assert!(!html.contains("stale"));
    assert!(html.contains("\"serverRendered\":false"));
}

#[tokio::test]
async fn test_csp_hash_matches_inline_state() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let mut config = test_config(dir.path());
    config.render.csp.enable = true;
    config.render.csp.add_meta = true;
    let renderer = renderer(config, hello_app());

    let result = renderer
        .render_route("/", RenderContext::new("/"))
        .await
        .unwrap();

    let start = result.html.find("<script>window.__APP__=").unwrap() + "<script>".len();
    let end = start + result.html[start..].find("</script>").unwrap();
    let script = &result.html[start..end];

    assert_eq!(result.csp_hashes.len(), 1);
    assert_eq!(
        result.csp_hashes[0],
        crate::csp::hash_script(script, crate::csp::HashAlgorithm::Sha256)
    );
    assert!(result.html.contains(&crate::csp::meta_tag(&result.csp_hashes)));
}

#[tokio::test]
async fn test_crash_renders_error_page() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    fs::write(dir.path().join("error.html"), "<h1>{{ STATUS }}</h1><p>{{ MESSAGE }}</p>").unwrap();
    let renderer = renderer(
        test_config(dir.path()),
        factory(|_: &mut RenderContext| anyhow::bail!("component <Foo> exploded")),
    );

    let result = renderer
        .render_route("/", RenderContext::new("/"))
        .await
        .unwrap();

    let error = result.error.as_ref().unwrap();
    assert!(error.is_crash());
    assert_eq!(result.status(), 500);
    assert_eq!(
        result.html,
        "<h1>500</h1><p>component &lt;Foo&gt; exploded</p>"
    );
}

#[tokio::test]
async fn test_application_error_keeps_markup() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let renderer = renderer(
        test_config(dir.path()),
        factory(|ctx: &mut RenderContext| {
            ctx.error = Some(PageError::application(404, "This page could not be found"));
            Ok(AppOutput {
                html: "<div>404 page</div>".into(),
                ..AppOutput::default()
            })
        }),
    );

    let result = renderer
        .render_route("/missing", RenderContext::new("/missing"))
        .await
        .unwrap();

    assert_eq!(result.status(), 404);
    assert!(result.html.contains("<div>404 page</div>"));
    assert!(result.html.contains("\"statusCode\":404"));
}

#[tokio::test]
async fn test_redirect_short_circuits() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let renderer = renderer(
        test_config(dir.path()),
        factory(|ctx: &mut RenderContext| {
            ctx.redirect = Some(Redirect::new("/login"));
            ctx.state.insert("secret".into(), json!(true));
            Ok(AppOutput::default())
        }),
    );

    let result = renderer
        .render_route("/admin", RenderContext::new("/admin").with_static_assets_base("/_app/static/1"))
        .await
        .unwrap();

    assert_eq!(result.redirected, Some(Redirect::new("/login")));
    assert_eq!(result.status(), 302);
    assert!(result.html.is_empty());
    assert!(result.static_assets.is_empty());
    assert!(result.preload_files.is_empty());
}

#[tokio::test]
async fn test_static_mode_splits_large_state() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let mut config = test_config(dir.path());
    config.generate.payload_threshold_kb = 1;
    let renderer = renderer(
        config,
        factory(|ctx: &mut RenderContext| {
            ctx.state.insert("data".into(), json!(["x".repeat(4096)]));
            Ok(AppOutput {
                html: "<div></div>".into(),
                ..AppOutput::default()
            })
        }),
    );

    let result = renderer
        .render_route("/big", RenderContext::new("/big").with_static_assets_base("/_app/static/1"))
        .await
        .unwrap();

    assert_eq!(result.static_assets.len(), 2);
    assert!(!result.html.contains("<script>window.__APP__="));
    assert!(result.html.contains("<script defer src=\"/_app/static/1/big/state.js\"></script>"));
    assert!(result.csp_hashes.is_empty());
}

#[tokio::test]
async fn test_spa_render_and_cache() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    fs::write(dir.path().join("loading.html"), "<div>\n   Loading...\n</div>").unwrap();
    let mut config = test_config(dir.path());
    config.render.ssr = false;
    let renderer = renderer(config, hello_app());

    let first = renderer
        .render_route("/app", RenderContext::new("/app"))
        .await
        .unwrap();
    renderer
        .render_route("/app", RenderContext::new("/app"))
        .await
        .unwrap();

    assert!(first.spa);
    assert!(first.html.contains("<div id=\"__app\"><div>Loading...</div></div>"));
    assert!(first.html.contains("\"routePath\":\"\\u002Fapp\""));
    assert!(!first.html.contains("<title>Hello</title>"));
    assert_eq!(renderer.composition().unwrap().spa.cached(), 1);
}

#[tokio::test]
async fn test_spa_requested_per_render() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.js"] }"#);
    let renderer = renderer(test_config(dir.path()), hello_app());

    let result = renderer
        .render_route("/", RenderContext::new("/").spa())
        .await
        .unwrap();
    assert!(result.spa);
    assert!(!result.html.contains("<title>Hello</title>"));
}

#[tokio::test]
async fn test_reload_swaps_composition() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{ "initial": ["app.v1.js"] }"#);
    let renderer = renderer(test_config(dir.path()), hello_app());

    let before = renderer.composition().unwrap();
    let v1 = renderer.render_route("/", RenderContext::new("/")).await.unwrap();

    write_server_file(dir.path(), "client.manifest.json", r#"{ "initial": ["app.v2.js"] }"#);
    let report = renderer.load_resources();
    let v2 = renderer.render_route("/", RenderContext::new("/")).await.unwrap();

    assert!(report.changed());
    assert!(v1.html.contains("app.v1.js"));
    assert!(v2.html.contains("app.v2.js"));
    // The old snapshot is untouched for renders that still hold it.
    assert_eq!(before.client.initial[0].file, "app.v1.js");
}

#[tokio::test]
async fn test_invalid_urls_rejected() {
    let dir = TempDir::new().unwrap();
    write_build(dir.path(), r#"{}"#);
    let renderer = renderer(test_config(dir.path()), hello_app());

    for url in ["", "about", "//evil.com", "/a\nb"] {
        let err = renderer
            .render_route(url, RenderContext::new(url))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidUrl(..)), "{url:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_after_retries() {
    let dir = TempDir::new().unwrap();
    write_server_file(dir.path(), "client.manifest.json", "{}");
    let renderer = renderer(test_config(dir.path()), hello_app());
    assert!(!renderer.is_ready());

    let started = tokio::time::Instant::now();
    let err = renderer
        .render_route("/", RenderContext::new("/"))
        .await
        .unwrap_err();

    assert!(started.elapsed() >= Duration::from_secs(3));
    let RenderError::NotReady(missing) = err else {
        panic!("expected NotReady");
    };
    assert!(missing.contains(&"server.manifest.json"));
    assert!(missing.contains(&"index.ssr.html"));
}
