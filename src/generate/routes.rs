//! Route list resolution.
//!
//! The initial list is built from the app's route tree (`routes.json` in the
//! build directory), filtered by `generate.exclude`, then merged with the
//! configured routes. Entries are keyed by path: a configured entry replaces
//! the app entry of the same path and carries its payload.

use crate::config::{ExcludePattern, RouteEntry, RouterConfig};
use crate::utils::url::decode;
use anyhow::{Context, Result};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// App route tree written by the bundler.
pub const APP_ROUTES_FILE: &str = "routes.json";

static REPEATED_SLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/{2,}").unwrap());

/// A route scheduled for generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRoute {
    pub route: String,
    pub payload: Option<Value>,
}

impl GeneratedRoute {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            payload: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppRoute {
    #[serde(default)]
    path: String,
    #[serde(default)]
    children: Vec<AppRoute>,
}

/// Static routes of the app, or `/` when the build has no route tree.
pub fn read_app_routes(build_dir: &Path) -> Result<Vec<String>> {
    let path = build_dir.join(APP_ROUTES_FILE);
    let src = match std::fs::read_to_string(&path) {
        Ok(src) => src,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec!["/".to_string()]),
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
    };

    let tree: Vec<AppRoute> = serde_json::from_str(&src)
        .with_context(|| format!("invalid route tree in {}", path.display()))?;

    let mut routes = Vec::new();
    flatten(&tree, "", &mut routes);
    Ok(routes)
}

/// Flatten nested routes into paths. Dynamic routes (`:id`, `*`) are skipped.
fn flatten(tree: &[AppRoute], prefix: &str, out: &mut Vec<String>) {
    for route in tree {
        if route.path.contains([':', '*']) {
            continue;
        }

        if !route.children.is_empty() {
            if prefix.is_empty() && route.path == "/" {
                out.push("/".to_string());
            }
            flatten(&route.children, &format!("{prefix}{}/", route.path), out);
            continue;
        }

        let prefix = REPEATED_SLASHES.replace_all(prefix, "/");
        if route.path.starts_with('/') {
            out.push(route.path.clone());
        } else if route.path.is_empty() && prefix.ends_with('/') {
            out.push(prefix[..prefix.len() - 1].to_string());
        } else {
            out.push(format!("{prefix}{}", route.path));
        }
    }
}

/// Compiled `generate.exclude` patterns.
#[derive(Debug, Default)]
pub struct Exclusion {
    exact: FxHashSet<String>,
    patterns: Vec<Regex>,
}

impl Exclusion {
    pub fn new(patterns: &[ExcludePattern]) -> Result<Self> {
        let mut exclusion = Self::default();
        for pattern in patterns {
            match pattern {
                ExcludePattern::Exact(route) => {
                    exclusion.exact.insert(route.clone());
                }
                ExcludePattern::Regex { regex } => {
                    let re = Regex::new(regex)
                        .with_context(|| format!("invalid exclude pattern `{regex}`"))?;
                    exclusion.patterns.push(re);
                }
            }
        }
        Ok(exclusion)
    }

    pub fn is_excluded(&self, route: &str) -> bool {
        self.exact.contains(route) || self.patterns.iter().any(|re| re.is_match(route))
    }
}

/// Merge app routes with configured entries, keeping first-seen order.
pub fn merge_routes(app_routes: Vec<String>, configured: &[RouteEntry]) -> Vec<GeneratedRoute> {
    let mut merged: Vec<GeneratedRoute> = Vec::with_capacity(app_routes.len() + configured.len());
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    let entries = app_routes
        .into_iter()
        .map(GeneratedRoute::new)
        .chain(configured.iter().map(|entry| GeneratedRoute {
            route: entry.route().to_string(),
            payload: entry.payload().cloned(),
        }));

    for route in entries {
        match index.get(&route.route) {
            Some(&i) => merged[i] = route,
            None => {
                index.insert(route.route.clone(), merged.len());
                merged.push(route);
            }
        }
    }
    merged
}

/// Normalize a route key: trailing slash policy, then percent-decoding.
///
/// Returns `None` for routes that would escape the output directory.
pub fn normalize_route(router: &RouterConfig, route: &str) -> Option<String> {
    let route = route.trim();
    let route = if route.is_empty() { "/" } else { route };
    let normalized = decode(&router.normalize_slash(route)).into_owned();

    if normalized.split('/').any(|segment| segment == "..") || normalized.contains('\\') {
        return None;
    }
    Some(normalized)
}

/// File a route is written to, relative to the output directory.
///
/// | route    | subfolders        | flat         |
/// |----------|-------------------|--------------|
/// | `/`      | `index.html`      | `index.html` |
/// | `/about` | `about/index.html`| `about.html` |
/// | `/404`   | `404.html`        | `404.html`   |
pub fn output_path(route: &str, subfolders: bool) -> PathBuf {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        return PathBuf::from("index.html");
    }

    if !subfolders || trimmed == "404" {
        PathBuf::from(format!("{trimmed}.html"))
    } else {
        Path::new(trimmed).join("index.html")
    }
}

/// Deep-merge `defaults` into `target`. Values already set in `target` win.
pub fn merge_defaults(target: &mut Value, defaults: &Value) {
    if target.is_null() {
        *target = defaults.clone();
        return;
    }
    if let (Value::Object(target), Value::Object(defaults)) = (target, defaults) {
        for (key, default) in defaults {
            let value = target.entry(key.clone()).or_insert(Value::Null);
            merge_defaults(value, default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_app_routes_flattens_tree() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(APP_ROUTES_FILE),
            r#"[
                { "path": "/" },
                { "path": "/about" },
                { "path": "/users/:id" },
                { "path": "/docs", "children": [
                    { "path": "" },
                    { "path": "guide" },
                    { "path": "/absolute" }
                ] },
                { "path": "*" }
            ]"#,
        )
        .unwrap();

        let routes = read_app_routes(dir.path()).unwrap();
        assert_eq!(routes, ["/", "/about", "/docs", "/docs/guide", "/absolute"]);
    }

    #[test]
    fn test_read_app_routes_defaults_to_root() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_app_routes(dir.path()).unwrap(), ["/"]);
    }

    #[test]
    fn test_read_app_routes_invalid_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(APP_ROUTES_FILE), "{ nope").unwrap();
        assert!(read_app_routes(dir.path()).is_err());
    }

    #[test]
    fn test_exclusion() {
        let exclusion = Exclusion::new(&[
            ExcludePattern::Exact("/admin".into()),
            ExcludePattern::Regex {
                regex: "^/drafts/".into(),
            },
        ])
        .unwrap();

        assert!(exclusion.is_excluded("/admin"));
        assert!(!exclusion.is_excluded("/admin/users"));
        assert!(exclusion.is_excluded("/drafts/one"));
        assert!(!exclusion.is_excluded("/blog"));
    }

    #[test]
    fn test_merge_routes_configured_wins() {
        let configured = vec![
            RouteEntry::WithPayload {
                route: "/about".into(),
                payload: Some(json!({ "team": 3 })),
            },
            RouteEntry::Path("/hidden".into()),
        ];
        let merged = merge_routes(vec!["/".into(), "/about".into()], &configured);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], GeneratedRoute::new("/"));
        assert_eq!(merged[1].route, "/about");
        assert_eq!(merged[1].payload, Some(json!({ "team": 3 })));
        assert_eq!(merged[2], GeneratedRoute::new("/hidden"));
    }

    #[test]
    fn test_normalize_route() {
        let router = RouterConfig::default();
        assert_eq!(normalize_route(&router, "/about/").as_deref(), Some("/about"));
        assert_eq!(normalize_route(&router, "").as_deref(), Some("/"));
        assert_eq!(normalize_route(&router, "/caf%C3%A9").as_deref(), Some("/café"));
        assert_eq!(normalize_route(&router, "/a/../../etc"), None);

        let router = RouterConfig {
            trailing_slash: Some(true),
            ..RouterConfig::default()
        };
        assert_eq!(normalize_route(&router, "/about").as_deref(), Some("/about/"));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("/", true), PathBuf::from("index.html"));
        assert_eq!(output_path("/about", true), PathBuf::from("about/index.html"));
        assert_eq!(output_path("/docs/guide/", true), PathBuf::from("docs/guide/index.html"));
        assert_eq!(output_path("/404", true), PathBuf::from("404.html"));
        assert_eq!(output_path("/", false), PathBuf::from("index.html"));
        assert_eq!(output_path("/about", false), PathBuf::from("about.html"));
        assert_eq!(output_path("/docs/guide", false), PathBuf::from("docs/guide.html"));
    }

    #[test]
    fn test_merge_defaults() {
        let mut payload = json!({ "title": "Post", "meta": { "lang": null }, "tags": ["a"] });
        let shared = json!({ "title": "Site", "meta": { "lang": "en", "dir": "ltr" }, "tags": ["b"], "footer": true });
        merge_defaults(&mut payload, &shared);

        assert_eq!(
            payload,
            json!({
                "title": "Post",
                "meta": { "lang": "en", "dir": "ltr" },
                "tags": ["a"],
                "footer": true
            })
        );
    }
}
