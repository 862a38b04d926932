//! HTTP/2 server push via a single `Link` header.
//!
//! Link selection, first match wins:
//!
//! 1. a programmatic [`PushAssets`] callback
//! 2. the configured `render.http2.push_types` filter
//! 3. scripts and styles

use crate::config::RenderConfig;
use crate::manifest::{AssetType, FileRef};
use crate::render::RequestInfo;
use crate::utils::url::url_join;
use std::sync::Arc;

/// Custom push callback: `(request, public_path, preload_files) -> links`.
pub type PushAssets = Arc<dyn Fn(&RequestInfo, &str, &[FileRef]) -> Vec<String> + Send + Sync>;

/// Asset types pushed when nothing else is configured.
const DEFAULT_PUSH_TYPES: [AssetType; 2] = [AssetType::Script, AssetType::Style];

#[derive(Clone, Default)]
pub struct PushPolicy {
    custom: Option<PushAssets>,
    types: Option<Vec<AssetType>>,
    crossorigin: Option<String>,
}

impl PushPolicy {
    pub fn from_config(render: &RenderConfig) -> Self {
        Self {
            custom: None,
            types: render.http2.push_types.clone(),
            crossorigin: render.crossorigin.clone(),
        }
    }

    pub fn with_callback(mut self, push_assets: PushAssets) -> Self {
        self.custom = Some(push_assets);
        self
    }

    /// Links to announce for one rendered page.
    pub fn links(
        &self,
        request: &RequestInfo,
        public_path: &str,
        files: &[FileRef],
        modern: bool,
    ) -> Vec<String> {
        if let Some(push_assets) = &self.custom {
            return push_assets(request, public_path, files);
        }

        let types = self.types.as_deref().unwrap_or(&DEFAULT_PUSH_TYPES);
        let cors = self
            .crossorigin
            .as_deref()
            .map(|value| format!(" crossorigin={value};"))
            .unwrap_or_default();

        files
            .iter()
            .filter(|file| types.contains(&file.asset_type))
            .map(|file| {
                // `modulepreload` only accepts script-like destinations
                let rel = if modern && file.is_script() {
                    "modulepreload"
                } else {
                    "preload"
                };
                format!(
                    "<{}>; rel={};{} as={}",
                    url_join(public_path, &file.file),
                    rel,
                    cors,
                    file.asset_type.as_str()
                )
            })
            .collect()
    }
}

/// Join links into one header value.
pub fn link_header(links: &[String]) -> Option<String> {
    (!links.is_empty()).then(|| links.join(", "))
}
