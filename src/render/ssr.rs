//! Server-side render of one route.

use super::context::{PageError, RenderContext, RenderResult};
use super::factory::Composition;
use super::hints::{self, AssetContext};
use super::modern::{SAFARI_NOMODULE_FIX, render_scripts};
use super::payload::{self, Split, SplitOptions};
use super::state::state_script;
use super::template::{TemplateParams, fallback_error_page};
use crate::app::AppOutput;
use crate::config::Config;
use crate::manifest::FileRef;
use crate::utils::html::escape;
use crate::{csp, debug};
use serde_json::{Value, json};

/// Stylesheet links for the style files among `files`.
pub(super) fn render_styles(files: &[FileRef], ctx: &AssetContext) -> String {
    files
        .iter()
        .filter(|f| f.is_style())
        .map(|f| format!("<link rel=\"stylesheet\" href=\"{}\">", ctx.url(&f.file)))
        .collect()
}

pub(super) async fn render(
    comp: &Composition,
    config: &Config,
    mut ctx: RenderContext,
    modern: bool,
) -> RenderResult {
    let render = &config.render;

    let output = match &comp.app {
        Some(app) => match app.render_to_string(&mut ctx).await {
            Ok(output) => output,
            Err(e) => {
                debug!("render"; "{} crashed: {:#}", ctx.url, e);
                ctx.error = Some(PageError::crash(&e));
                AppOutput::default()
            }
        },
        None => {
            ctx.error = Some(PageError::crash(&anyhow::anyhow!("no app renderer configured")));
            AppOutput::default()
        }
    };

    if let Some(redirect) = ctx.redirect.take() {
        return RenderResult {
            redirected: Some(redirect),
            error: ctx.error,
            modern,
            ..RenderResult::default()
        };
    }

    if let Some(error) = &ctx.error
        && error.is_crash()
        && output.html.is_empty()
    {
        return error_page(comp, error.clone(), modern);
    }

    let assets = AssetContext {
        public_path: &comp.public_path,
        render,
        mapping: modern.then_some(&comp.mapping),
    };
    let preload = hints::preload_files(&comp.client, &output.preload_files);
    let should_hash = render.csp.should_hash();
    let algorithm = render.csp.hash_algorithm;
    let mut csp_hashes = Vec::new();
    let meta = output.meta;

    // Head: app meta, base, hints, styles
    let mut head = String::new();
    head.push_str(&meta.title);
    head.push_str(&meta.meta);
    if config.router.base_specified() {
        head.push_str(&format!("<base href=\"{}\">", config.router.base));
    }
    head.push_str(&meta.link);
    head.push_str(&meta.style);
    head.push_str(&meta.script);
    head.push_str(&meta.noscript);
    if render.resource_hints && render.inject_scripts {
        head.push_str(&hints::render_resource_hints(&comp.client, &preload, &assets));
    }
    head.push_str(&render_styles(&preload, &assets));

    // Body: markup, state, scripts
    let mut app = meta.body_prepend;
    if ctx.server_rendered {
        app.push_str(&output.html);
    } else {
        app.push_str(&format!("<div id=\"{}\"></div>", render.globals.id));
    }

    ctx.state
        .insert("serverRendered".into(), Value::Bool(ctx.server_rendered));
    if let Some(error) = &ctx.error {
        ctx.state.insert(
            "error".into(),
            json!({ "statusCode": error.status, "message": error.message }),
        );
    }

    let mut static_assets = Vec::new();
    let inline_state = match &ctx.static_assets_base {
        Some(base) if ctx.error.is_none() => {
            let options = SplitOptions {
                global: &render.globals.context,
                jsonp: &render.globals.jsonp,
                static_base: base,
                threshold_kb: config.generate.payload_threshold_kb,
                manifest: config.generate.manifest,
            };
            match payload::split(&ctx.state, &ctx.url, &options) {
                Split::Inline { script } => Some(script),
                Split::External {
                    assets,
                    head: preload,
                    body,
                } => {
                    head.push_str(&preload);
                    app.push_str(&body);
                    static_assets = assets;
                    None
                }
            }
        }
        _ => Some(state_script(&render.globals.context, &ctx.state)),
    };
    if let Some(script) = inline_state {
        if should_hash {
            csp_hashes.push(csp::hash_script(&script, algorithm));
        }
        app.push_str(&format!("<script>{script}</script>"));
    }

    if render.inject_scripts {
        if modern {
            if should_hash {
                csp_hashes.push(csp::hash_script(SAFARI_NOMODULE_FIX, algorithm));
            }
            app.push_str(&format!("<script>{SAFARI_NOMODULE_FIX}</script>"));
        }
        app.push_str(&render_scripts(&preload, &assets));
    }

    if render.csp.enable && render.csp.add_meta {
        head.push_str(&csp::meta_tag(&csp_hashes));
    }

    app.push_str(&meta.body_append);

    let params = TemplateParams {
        html_attrs: meta.html_attrs,
        head_attrs: meta.head_attrs.clone(),
        body_attrs: meta.body_attrs.clone(),
        head,
        app,
        ..TemplateParams::default()
    };
    let template = comp.ssr_template.as_ref().unwrap_or(&comp.spa_template);
    let html = template.render_template(&params);

    RenderResult {
        html,
        head_attrs: meta.head_attrs,
        body_attrs: meta.body_attrs,
        preload_files: preload,
        csp_hashes,
        static_assets,
        error: ctx.error,
        redirected: None,
        spa: false,
        modern,
    }
}

fn error_page(comp: &Composition, error: PageError, modern: bool) -> RenderResult {
    let html = match &comp.error_template {
        Some(template) => template.render_template(&TemplateParams {
            status: error.status.to_string(),
            message: escape(&error.message).into_owned(),
            ..TemplateParams::default()
        }),
        None => fallback_error_page(error.status, &error.message),
    };

    RenderResult {
        html,
        error: Some(error),
        modern,
        ..RenderResult::default()
    }
}
