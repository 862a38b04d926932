//! Differential legacy/modern loading.

use super::hints::AssetContext;
use crate::config::ModernMode;
use crate::manifest::FileRef;
use std::sync::LazyLock;

/// Keeps Safari 10.1 from running both the module and the `nomodule` build.
pub const SAFARI_NOMODULE_FIX: &str = r#"!function(){var e=document,t=e.createElement("script");if(!("noModule"in t)&&"onbeforeload"in t){var n=!1;e.addEventListener("beforeload",function(e){if(e.target===t)n=!0;else if(!e.target.hasAttribute("nomodule")||!n)return;e.preventDefault()},!0),t.type="module",t.src=".",e.head.appendChild(t),t.remove()}}();"#;

/// Resolve `auto`: server-side negotiation when rendering on the server,
/// client-side loading for SPA-only apps, off without a modern build.
pub fn resolve_mode(mode: ModernMode, ssr: bool, has_modern_manifest: bool) -> ModernMode {
    match mode {
        ModernMode::Auto if !has_modern_manifest => ModernMode::Off,
        ModernMode::Auto if ssr => ModernMode::Server,
        ModernMode::Auto => ModernMode::Client,
        mode => mode,
    }
}

static BROWSER_VERSION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(Edge|Edg|Firefox|Chrome|Version)/(\d+)").unwrap()
});

/// Whether a user agent supports `<script type="module">`.
pub fn is_modern_browser(user_agent: &str) -> bool {
    if user_agent.contains("MSIE") || user_agent.contains("Trident/") {
        return false;
    }

    let version = |name: &str| {
        BROWSER_VERSION
            .captures_iter(user_agent)
            .find(|c| &c[1] == name)
            .and_then(|c| c[2].parse::<u32>().ok())
    };

    // Edge and Chrome-based browsers advertise several tokens; the most specific wins.
    if let Some(v) = version("Edg") {
        return v >= 79;
    }
    if let Some(v) = version("Edge") {
        return v >= 16;
    }
    if let Some(v) = version("Firefox") {
        return v >= 60;
    }
    if let Some(v) = version("Chrome") {
        return v >= 61;
    }
    if user_agent.contains("Safari/")
        && let Some(v) = version("Version")
    {
        return v >= 11;
    }
    false
}

/// Script tags for the page.
///
/// Legacy renders emit one deferred tag per file. Modern renders emit a
/// `nomodule` tag for the legacy file and a `type="module"` tag for its
/// modern counterpart, if any.
pub fn render_scripts(files: &[FileRef], ctx: &AssetContext) -> String {
    let crossorigin = ctx.crossorigin();
    let mut out = String::new();

    for file in files.iter().filter(|f| f.is_script()) {
        let src = ctx.url(&file.file);
        match ctx.mapping {
            None => out.push_str(&format!("<script src=\"{src}\" defer{crossorigin}></script>")),
            Some(mapping) => {
                out.push_str(&format!(
                    "<script src=\"{src}\" defer nomodule{crossorigin}></script>"
                ));
                if let Some(modern) = mapping.modern_for(&file.file) {
                    out.push_str(&format!(
                        "<script src=\"{}\" defer type=\"module\"{crossorigin}></script>",
                        ctx.url(modern)
                    ));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::manifest::{AssetMapping, Manifest};

    #[test]
    fn test_resolve_mode() {
        assert_eq!(resolve_mode(ModernMode::Auto, true, true), ModernMode::Server);
        assert_eq!(resolve_mode(ModernMode::Auto, false, true), ModernMode::Client);
        assert_eq!(resolve_mode(ModernMode::Auto, true, false), ModernMode::Off);
        assert_eq!(resolve_mode(ModernMode::Client, true, false), ModernMode::Client);
        assert_eq!(resolve_mode(ModernMode::Off, true, true), ModernMode::Off);
    }

    #[test]
    fn test_modern_browser_sniffing() {
        let chrome = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let old_chrome = "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";
        let firefox = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
        let safari = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
        let old_safari = "Mozilla/5.0 (Macintosh) AppleWebKit/603.1.30 (KHTML, like Gecko) Version/10.1 Safari/603.1.30";
        let edge_legacy = "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/52.0 Safari/537.36 Edge/15.15063";
        let ie = "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko";

        assert!(is_modern_browser(chrome));
        assert!(!is_modern_browser(old_chrome));
        assert!(is_modern_browser(firefox));
        assert!(is_modern_browser(safari));
        assert!(!is_modern_browser(old_safari));
        assert!(!is_modern_browser(edge_legacy));
        assert!(!is_modern_browser(ie));
        assert!(!is_modern_browser("curl/8.0"));
    }

    #[test]
    fn test_render_scripts() {
        let legacy = Manifest::parse(
            r#"{ "initial": ["app.js", "vendor.js", "app.css"],
                 "assetsMapping": { "a": ["app.js"] } }"#,
        )
        .unwrap();
        let modern = Manifest::parse(r#"{ "assetsMapping": { "a": ["app.modern.js"] } }"#).unwrap();
        let mapping = AssetMapping::build(&legacy, &modern);
        let render = RenderConfig::default();

        let legacy_ctx = AssetContext {
            public_path: "/_app/",
            render: &render,
            mapping: None,
        };
        assert_eq!(
            render_scripts(&legacy.initial, &legacy_ctx),
            "<script src=\"/_app/app.js\" defer></script><script src=\"/_app/vendor.js\" defer></script>"
        );

        let modern_ctx = AssetContext {
            mapping: Some(&mapping),
            ..legacy_ctx
        };
        assert_eq!(
            render_scripts(&legacy.initial, &modern_ctx),
            "<script src=\"/_app/app.js\" defer nomodule></script>\
             <script src=\"/_app/app.modern.js\" defer type=\"module\"></script>\
             <script src=\"/_app/vendor.js\" defer nomodule></script>"
        );
    }
}
