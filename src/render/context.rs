//! Per-render input and output.

use crate::manifest::FileRef;
use serde_json::{Map, Value};

/// What the HTTP layer knows about the incoming request.
///
/// Absent for renders issued by the generator.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub headers: Vec<(String, String)>,
    pub user_agent: Option<String>,
    /// Explicit modern-capability flag (e.g. set by a proxy); wins over sniffing.
    pub modern: Option<bool>,
    /// Client asked for the SPA shell only.
    pub spa: bool,
}

impl RequestInfo {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Origin of a page error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErrorKind {
    /// The app resolved to an error page (404, failed fetch ...).
    Application,
    /// The app renderer itself failed.
    Crash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    pub status: u16,
    pub message: String,
    pub kind: PageErrorKind,
}

impl PageError {
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            kind: PageErrorKind::Application,
        }
    }

    pub fn crash(error: &anyhow::Error) -> Self {
        Self {
            status: 500,
            message: format!("{error:#}"),
            kind: PageErrorKind::Crash,
        }
    }

    pub fn is_crash(&self) -> bool {
        self.kind == PageErrorKind::Crash
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
}

impl Redirect {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: 302,
        }
    }
}

/// A side file produced by the payload splitter, relative to the static assets base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    /// URL path below the static assets base, e.g. `/about/payload.js`.
    pub path: String,
    pub src: String,
}

/// Mutable state of one render. Created fresh per render, never shared.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub url: String,
    pub request: Option<RequestInfo>,
    /// Force the SPA shell.
    pub spa: Option<bool>,
    /// Force modern (`Some(true)`) or legacy (`Some(false)`) output.
    pub modern: Option<bool>,
    pub payload: Option<Value>,
    /// State serialized into the page; filled by the app.
    pub state: Map<String, Value>,
    /// Set during static export; state and payload go to side files below it.
    pub static_assets_base: Option<String>,
    pub static_assets: Vec<StaticAsset>,
    pub error: Option<PageError>,
    pub redirect: Option<Redirect>,
    /// Cleared by apps that only render on the client.
    pub server_rendered: bool,
}

impl RenderContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            server_rendered: true,
            ..Self::default()
        }
    }

    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_static_assets_base(mut self, base: impl Into<String>) -> Self {
        self.static_assets_base = Some(base.into());
        self
    }

    pub fn spa(mut self) -> Self {
        self.spa = Some(true);
        self
    }

    pub(crate) fn request_spa(&self) -> bool {
        self.request.as_ref().is_some_and(|r| r.spa)
    }
}

/// Finished render. Immutable once returned.
#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    pub html: String,
    pub head_attrs: String,
    pub body_attrs: String,
    /// Bundle files the page references, used for HTTP/2 push.
    pub preload_files: Vec<FileRef>,
    pub csp_hashes: Vec<String>,
    pub static_assets: Vec<StaticAsset>,
    pub error: Option<PageError>,
    pub redirected: Option<Redirect>,
    /// Rendered by the SPA shell (no server markup).
    pub spa: bool,
    pub modern: bool,
}

impl RenderResult {
    pub(crate) fn redirect(redirect: Redirect) -> Self {
        Self {
            redirected: Some(redirect),
            ..Self::default()
        }
    }

    /// HTTP status for this result.
    pub fn status(&self) -> u16 {
        if let Some(redirect) = &self.redirected {
            return redirect.status;
        }
        self.error.as_ref().map_or(200, |e| e.status)
    }
}
