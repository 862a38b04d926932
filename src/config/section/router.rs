//! `[router]` section configuration.
//!
//! ```toml
//! [router]
//! base = "/docs/"
//! trailing_slash = true
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Router settings that influence rendered URLs and generated route keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Base path the application is mounted under.
    pub base: String,

    /// `Some(true)` appends, `Some(false)` or `None` strips trailing slashes.
    pub trailing_slash: Option<bool>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base: "/".into(),
            trailing_slash: None,
        }
    }
}

impl RouterConfig {
    pub const BASE: FieldPath = FieldPath::new("router.base");

    /// A non-root base is emitted as `<base href>` in rendered pages.
    pub fn base_specified(&self) -> bool {
        self.base != "/"
    }

    /// Normalize a route according to the trailing slash policy.
    pub fn normalize_slash(&self, route: &str) -> String {
        use crate::utils::url::{with_trailing_slash, without_trailing_slash};

        if self.trailing_slash == Some(true) {
            with_trailing_slash(route)
        } else {
            without_trailing_slash(route).to_string()
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.base.starts_with('/') {
            diag.error(Self::BASE, "must start with `/`");
        }
    }
}
