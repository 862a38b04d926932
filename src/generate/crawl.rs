//! Link discovery in rendered pages.

use super::routes::{Exclusion, normalize_route};
use crate::config::RouterConfig;
use crate::utils::html::unescape;
use crate::utils::url::{has_extension, strip_base, strip_query_hash};
use rustc_hash::FxHashSet;

/// Internal page routes linked from `html`, in document order, deduplicated.
///
/// An `href` becomes a route after the router base, query, hash and trailing
/// slashes are removed and it is normalized like configured routes. Kept
/// when it is site-absolute (`/x`, not `//x`), has no file extension and is
/// not excluded.
pub fn extract_links(html: &str, router: &RouterConfig, exclusion: &Exclusion) -> Vec<String> {
    let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
        return Vec::new();
    };

    let mut seen = FxHashSet::default();
    let mut links = Vec::new();

    for node in dom.nodes() {
        let Some(tag) = node.as_tag() else {
            continue;
        };
        if !tag.name().as_utf8_str().eq_ignore_ascii_case("a") {
            continue;
        }
        let Some(href) = tag.attributes().get("href").flatten() else {
            continue;
        };

        let href = href.as_utf8_str();
        if let Some(route) = href_to_route(&unescape(&href), router)
            && !exclusion.is_excluded(&route)
            && seen.insert(route.clone())
        {
            links.push(route);
        }
    }

    links
}

fn href_to_route(href: &str, router: &RouterConfig) -> Option<String> {
    let href = href.trim();
    if href.starts_with("//") {
        return None;
    }

    let path = strip_base(href, &router.base);
    let path = strip_query_hash(&path);
    if !path.starts_with('/') {
        return None;
    }
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    if has_extension(path) {
        return None;
    }

    normalize_route(router, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExcludePattern;

    fn links(html: &str) -> Vec<String> {
        extract_links(html, &RouterConfig::default(), &Exclusion::default())
    }

    #[test]
    fn test_extracts_internal_routes() {
        let html = r#"<nav>
            <a href="/a">A</a>
            <a href="/b/?ref=nav#top">B</a>
            <a class="nav" href="/c/">C</a>
            <a href="/a">A again</a>
        </nav>"#;
        assert_eq!(links(html), ["/a", "/b", "/c"]);
    }

    #[test]
    fn test_href_entities_decoded() {
        let html = r#"<a href="/search?q=a&amp;page=2">s</a><a href="/tom&#39;s">t</a>"#;
        assert_eq!(links(html), ["/search", "/tom's"]);
    }

    #[test]
    fn test_skips_external_and_files() {
        let html = r##"
            <a href="https://example.com/x">ext</a>
            <a href="//cdn.example.com/y">cdn</a>
            <a href="mailto:me@example.com">mail</a>
            <a href="/files/report.pdf">pdf</a>
            <a href="relative">rel</a>
            <a href="#top">top</a>
            <a href="?page=2">query</a>
            <a>no href</a>
        "##;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_keeps_root_link() {
        let html = r#"<a href="/">home</a><a href="/about">about</a>"#;
        assert_eq!(links(html), ["/", "/about"]);

        let router = RouterConfig {
            base: "/docs/".into(),
            trailing_slash: None,
        };
        let html = r#"<a href="/docs/">home</a><a href="/docs">home</a><a href="/docs/guide/">g</a>"#;
        assert_eq!(
            extract_links(html, &router, &Exclusion::default()),
            ["/", "/guide"]
        );
    }

    #[test]
    fn test_decodes_and_strips_base() {
        let router = RouterConfig {
            base: "/docs/".into(),
            trailing_slash: None,
        };
        let html = r#"<a href="/docs/guide">g</a><a href="/docs/caf%C3%A9/">c</a>"#;
        assert_eq!(
            extract_links(html, &router, &Exclusion::default()),
            ["/guide", "/café"]
        );
    }

    #[test]
    fn test_applies_exclusion() {
        let exclusion = Exclusion::new(&[ExcludePattern::Regex {
            regex: "^/private".into(),
        }])
        .unwrap();
        let html = r#"<a href="/private/x">p</a><a href="/public">q</a>"#;
        assert_eq!(
            extract_links(html, &RouterConfig::default(), &exclusion),
            ["/public"]
        );
    }
}
