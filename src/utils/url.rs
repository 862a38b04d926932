//! URL path helpers shared by rendering, crawling and serving.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Join a public path and a file name with exactly one slash between them.
///
/// Absolute URLs and protocol-relative public paths are kept as-is.
///
/// # Example
/// ```ignore
/// assert_eq!(url_join("/_app/", "app.js"), "/_app/app.js");
/// assert_eq!(url_join("https://cdn.example.com", "/app.js"), "https://cdn.example.com/app.js");
/// ```
pub fn url_join(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) if !base.is_empty() => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

/// Check whether a string carries a scheme (`https://`, `mailto:` ...) or is
/// protocol-relative.
pub fn is_url(s: &str) -> bool {
    s.starts_with("//") || ::url::Url::parse(s).is_ok()
}

/// Ensure a trailing slash, keeping query and hash in place.
pub fn with_trailing_slash(path: &str) -> String {
    let (base, rest) = split_query_hash(path);
    if base.ends_with('/') {
        path.to_string()
    } else {
        format!("{base}/{rest}")
    }
}

/// Strip trailing slashes, keeping `/` itself.
pub fn without_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Remove `?query` and `#hash` from a path.
pub fn strip_query_hash(path: &str) -> &str {
    split_query_hash(path).0
}

fn split_query_hash(path: &str) -> (&str, &str) {
    match path.find(['?', '#']) {
        Some(i) => path.split_at(i),
        None => (path, ""),
    }
}

/// Percent-decode a path; invalid UTF-8 sequences are replaced lossily.
pub fn decode(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

/// Whether the last path segment has a file extension (`/app.js`, `/a/b.html`).
pub fn has_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rfind('.'))
        .is_some_and(|dot| dot > 0)
}

/// Strip a router base (`/docs/`) from a path, returning an absolute path.
pub fn strip_base<'a>(path: &'a str, base: &str) -> Cow<'a, str> {
    let base = without_trailing_slash(base);
    if base == "/" || base.is_empty() {
        return Cow::Borrowed(path);
    }
    match path.strip_prefix(base) {
        Some("") => Cow::Borrowed("/"),
        Some(rest) if rest.starts_with('/') => Cow::Borrowed(rest),
        _ => Cow::Borrowed(path),
    }
}
