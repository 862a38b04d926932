//! Static payload splitting.
//!
//! During static export the state is either inlined or moved to side files
//! below the static assets base:
//!
//! ```text
//! <base>/about/state.js    window.__APP__={...};           (state without page data)
//! <base>/about/payload.js  __APP_JSONP__("/about",{data})  (page data, loaded on navigation)
//! ```
//!
//! The branch depends only on the size of the serialized state and the
//! threshold, so the same state always takes the same branch.

use super::context::StaticAsset;
use super::state::{jsonp_script, state_script};
use crate::utils::url::{strip_query_hash, url_join, without_trailing_slash};
use serde_json::{Map, Value};

/// State keys moved to `payload.js`.
const PAYLOAD_KEYS: [&str; 3] = ["data", "fetch", "mutations"];

#[derive(Debug, Clone)]
pub struct SplitOptions<'a> {
    /// Window global receiving the state.
    pub global: &'a str,
    /// JSONP callback wrapping payloads.
    pub jsonp: &'a str,
    pub static_base: &'a str,
    pub threshold_kb: usize,
    /// Preload `manifest.js` along with the side files.
    pub manifest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    /// State small enough to inline; the script body to put in `<script>`.
    Inline { script: String },
    /// State moved to side files.
    External {
        assets: Vec<StaticAsset>,
        /// Preload links for the head.
        head: String,
        /// Deferred script loading the state.
        body: String,
    },
}

impl Split {
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }
}

/// Whether a serialized state exceeds `threshold_kb` kilobytes.
pub fn exceeds_threshold(script: &str, threshold_kb: usize) -> bool {
    script.len() as f64 / 1024.0 > threshold_kb as f64
}

/// Decide between inline state and side files for `url`.
///
/// Must not be called for renders that errored or redirected.
pub fn split(state: &Map<String, Value>, url: &str, options: &SplitOptions) -> Split {
    let mut full = state.clone();
    full.insert(
        "staticAssetsBase".into(),
        Value::String(options.static_base.to_string()),
    );

    let script = state_script(options.global, &full);
    if !exceeds_threshold(&script, options.threshold_kb) {
        return Split::Inline { script };
    }

    let mut payload = Map::new();
    for key in PAYLOAD_KEYS {
        if let Some(value) = full.remove(key) {
            payload.insert(key.to_string(), value);
        }
    }

    let route = without_trailing_slash(strip_query_hash(url));
    let route = if route.is_empty() { "/" } else { route };

    let state_path = url_join(route, "state.js");
    let payload_path = url_join(route, "payload.js");
    let state_url = url_join(options.static_base, &state_path);
    let payload_url = url_join(options.static_base, &payload_path);

    let assets = vec![
        StaticAsset {
            path: state_path,
            src: state_script(options.global, &full),
        },
        StaticAsset {
            path: payload_path,
            src: jsonp_script(options.jsonp, route, &Value::Object(payload)),
        },
    ];

    let mut preload = vec![state_url.clone(), payload_url];
    if options.manifest {
        preload.push(url_join(options.static_base, "manifest.js"));
    }
    let head = preload
        .iter()
        .map(|href| format!("<link rel=\"preload\" href=\"{href}\" as=\"script\">"))
        .collect();

    Split::External {
        assets,
        head,
        body: format!("<script defer src=\"{state_url}\"></script>"),
    }
}
