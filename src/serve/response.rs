//! HTTP response handlers.

use crate::config::Config;
use crate::csp;
use crate::render::RenderResult;
use crate::utils::hash;
use crate::utils::mime::types::{HTML, PLAIN};
use anyhow::{Context, Result, anyhow};
use std::{fs, path::Path};
use tiny_http::{Header, Method, Request, Response, StatusCode};

const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Status, headers and body for a rendered page.
#[derive(Debug, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl PageResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Turn a render result into a response.
///
/// `links` are the HTTP/2 push links for the page; they and the `ETag`
/// are only sent for pages rendered without error.
pub fn page_response(
    result: RenderResult,
    config: &Config,
    if_none_match: Option<&str>,
    vary_user_agent: bool,
    links: &[String],
) -> PageResponse {
    let mut headers = Vec::new();
    if vary_user_agent {
        headers.push(("Vary", "User-Agent".to_string()));
    }

    if let Some(redirect) = &result.redirected {
        headers.push(("Location", redirect.location.clone()));
        return PageResponse {
            status: redirect.status,
            headers,
            body: String::new(),
        };
    }

    let status = result.status();
    let render = &config.render;
    let ok = result.error.is_none();

    if ok && render.etag.enable {
        let etag = hash::etag(result.html.as_bytes(), render.etag.weak);
        if if_none_match.is_some_and(|value| hash::etag_matches(value, &etag)) {
            headers.push(("ETag", etag));
            return PageResponse {
                status: 304,
                headers,
                body: String::new(),
            };
        }
        headers.push(("ETag", etag));
    }

    if ok
        && render.http2.push
        && let Some(link) = super::push::link_header(links)
    {
        headers.push(("Link", link));
    }

    if render.csp.enable {
        let policy = csp::build_policy(&render.csp, &result.csp_hashes, config.build.dev);
        headers.push((render.csp.header_name(), policy));
    }

    headers.push(("Content-Type", HTML.to_string()));
    headers.push(("Accept-Ranges", "none".to_string()));

    PageResponse {
        status,
        headers,
        body: result.html,
    }
}

/// Send a rendered page. HEAD requests get the headers only.
pub fn respond_page(request: Request, page: PageResponse) -> Result<()> {
    let mut headers = Vec::with_capacity(page.headers.len());
    for (key, value) in &page.headers {
        headers.push(header(key, value)?);
    }

    let body = if is_head_request(&request) {
        Vec::new()
    } else {
        page.body.into_bytes()
    };

    let mut response = Response::from_data(body).with_status_code(StatusCode(page.status));
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// Respond with a file from disk. Bundle files are cached forever.
pub fn respond_file(request: Request, path: &Path, immutable: bool) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut response = Response::from_data(body)
        .with_status_code(StatusCode(200))
        .with_header(make_header("Content-Type", content_type));
    if immutable {
        response.add_header(make_header("Cache-Control", IMMUTABLE));
    }
    request.respond(response)?;
    Ok(())
}

/// Respond while resources are missing: the loading page if the build has one.
pub fn respond_loading(request: Request, loading_html: Option<&str>) -> Result<()> {
    match loading_html {
        Some(html) => send_body(request, 503, HTML, html.as_bytes().to_vec()),
        None => respond_unavailable(request),
    }
}

/// Respond with 503 Service Unavailable (shutting down or not ready).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with a plain text error.
pub fn respond_error(request: Request, status: u16, message: &str) -> Result<()> {
    send_body(request, status, PLAIN, format!("{status} {message}").into_bytes())
}

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response =
        Response::empty(StatusCode(status)).with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, status, content_type);
    }
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

/// Header with a value computed at runtime.
fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid `{key}` header value: {value:?}"))
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::render::{PageError, Redirect};

    fn page(html: &str) -> RenderResult {
        RenderResult {
            html: html.to_string(),
            csp_hashes: vec!["'sha256-abc'".into()],
            ..RenderResult::default()
        }
    }

    #[test]
    fn test_page_headers() {
        let config = test_parse_config("");
        let response = page_response(page("<p>hi</p>"), &config, None, false, &[]);

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<p>hi</p>");
        assert_eq!(response.header("content-type"), Some(HTML));
        assert_eq!(response.header("Accept-Ranges"), Some("none"));
        assert_eq!(
            response.header("ETag"),
            Some(hash::etag(b"<p>hi</p>", false).as_str())
        );
        assert!(response.header("Vary").is_none());
        assert!(response.header("Content-Security-Policy").is_none());
    }

    #[test]
    fn test_matching_etag_is_not_modified() {
        let config = test_parse_config("[render.etag]\nweak = true");
        let etag = hash::etag(b"<p>hi</p>", true);

        let response = page_response(page("<p>hi</p>"), &config, Some(&etag), false, &[]);

        assert_eq!(response.status, 304);
        assert!(response.body.is_empty());
        assert_eq!(response.header("ETag"), Some(etag.as_str()));
    }

    #[test]
    fn test_error_page_skips_etag_and_push() {
        let config = test_parse_config("[render.http2]\npush = true");
        let result = RenderResult {
            error: Some(PageError::application(404, "not found")),
            ..page("<h1>404</h1>")
        };
        let links = vec!["</_app/app.js>; rel=preload; as=script".to_string()];

        let response = page_response(result, &config, Some("*"), false, &links);

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "<h1>404</h1>");
        assert!(response.header("ETag").is_none());
        assert!(response.header("Link").is_none());
    }

    #[test]
    fn test_push_link_header() {
        let config = test_parse_config("[render.http2]\npush = true");
        let links = vec!["<a>; rel=preload; as=script".to_string(), "<b>; rel=preload; as=style".to_string()];

        let response = page_response(page("x"), &config, None, false, &links);

        assert_eq!(
            response.header("Link"),
            Some("<a>; rel=preload; as=script, <b>; rel=preload; as=style")
        );
    }

    #[test]
    fn test_csp_header() {
        let config = test_parse_config("[render.csp]\nenable = true\nreport_only = true");
        let response = page_response(page("x"), &config, None, true, &[]);

        assert_eq!(
            response.header("Content-Security-Policy-Report-Only"),
            Some("script-src 'self' 'sha256-abc'")
        );
        assert_eq!(response.header("Vary"), Some("User-Agent"));
    }

    #[test]
    fn test_redirect() {
        let config = test_parse_config("");
        let result = RenderResult {
            redirected: Some(Redirect {
                location: "/login".into(),
                status: 301,
            }),
            ..RenderResult::default()
        };

        let response = page_response(result, &config, None, false, &[]);

        assert_eq!(response.status, 301);
        assert_eq!(response.header("Location"), Some("/login"));
        assert!(response.header("Content-Type").is_none());
    }

    #[test]
    fn test_header_rejects_non_ascii() {
        assert!(header("Location", "/caf\u{e9}").is_err());
        assert!(header("Location", "/cafe").is_ok());
    }
}
