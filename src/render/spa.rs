//! SPA shell rendering.
//!
//! No app markup: the shell carries the loading page, resource hints, a
//! minimal state object and the scripts. Head and scripts only depend on
//! `(modern, url)` and are cached per composition.

use super::context::{RenderContext, RenderResult};
use super::factory::Composition;
use super::hints::{self, AssetContext};
use super::modern::{SAFARI_NOMODULE_FIX, render_scripts};
use super::ssr::render_styles;
use super::state::state_script;
use super::template::TemplateParams;
use crate::config::Config;
use crate::csp;
use crate::manifest::FileRef;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Entries kept before the cache is reset.
const CACHE_CAPACITY: usize = 1000;

#[derive(Debug)]
struct SpaMeta {
    head: String,
    scripts: String,
    preload_files: Vec<FileRef>,
}

#[derive(Default)]
pub struct SpaRenderer {
    cache: DashMap<(bool, String), Arc<SpaMeta>>,
}

impl SpaRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn cached(&self) -> usize {
        self.cache.len()
    }

    fn meta(&self, comp: &Composition, config: &Config, url: &str, modern: bool) -> Arc<SpaMeta> {
        let key = (modern, url.to_string());
        if let Some(meta) = self.cache.get(&key) {
            return Arc::clone(meta.value());
        }

        let render = &config.render;
        let assets = AssetContext {
            public_path: &comp.public_path,
            render,
            mapping: modern.then_some(&comp.mapping),
        };
        let preload_files = hints::preload_files(&comp.client, &[]);

        let mut head = String::new();
        if config.router.base_specified() {
            head.push_str(&format!("<base href=\"{}\">", config.router.base));
        }
        if render.resource_hints && render.inject_scripts {
            head.push_str(&hints::render_resource_hints(&comp.client, &preload_files, &assets));
        }
        head.push_str(&render_styles(&preload_files, &assets));

        let scripts = if render.inject_scripts {
            render_scripts(&preload_files, &assets)
        } else {
            String::new()
        };

        let meta = Arc::new(SpaMeta {
            head,
            scripts,
            preload_files,
        });
        if self.cache.len() >= CACHE_CAPACITY {
            self.cache.clear();
        }
        self.cache.insert(key, Arc::clone(&meta));
        meta
    }

    pub fn render(
        &self,
        comp: &Composition,
        config: &Config,
        ctx: RenderContext,
        modern: bool,
    ) -> RenderResult {
        let render = &config.render;
        let meta = self.meta(comp, config, &ctx.url, modern);
        let should_hash = render.csp.should_hash();
        let algorithm = render.csp.hash_algorithm;
        let mut csp_hashes = Vec::new();

        let mut state = ctx.state;
        state.insert("spa".into(), Value::Bool(true));
        state.insert("serverRendered".into(), Value::Bool(false));
        state.insert("routePath".into(), Value::String(ctx.url.clone()));
        if let Some(base) = &ctx.static_assets_base {
            state.insert("staticAssetsBase".into(), Value::String(base.clone()));
        }
        let state = state_script(&render.globals.context, &state);
        if should_hash {
            csp_hashes.push(csp::hash_script(&state, algorithm));
        }

        let loading = comp.resources.loading_html.as_deref().unwrap_or_default();
        let mut app = format!(
            "<div id=\"{}\">{}</div><script>{}</script>",
            render.globals.id, loading, state
        );
        if render.inject_scripts && modern {
            if should_hash {
                csp_hashes.push(csp::hash_script(SAFARI_NOMODULE_FIX, algorithm));
            }
            app.push_str(&format!("<script>{SAFARI_NOMODULE_FIX}</script>"));
        }
        app.push_str(&meta.scripts);

        let mut head = meta.head.clone();
        if render.csp.enable && render.csp.add_meta {
            head.push_str(&csp::meta_tag(&csp_hashes));
        }

        let html = comp.spa_template.render_template(&TemplateParams {
            head,
            app,
            ..TemplateParams::default()
        });

        RenderResult {
            html,
            preload_files: meta.preload_files.clone(),
            csp_hashes,
            spa: true,
            modern,
            ..RenderResult::default()
        }
    }
}
