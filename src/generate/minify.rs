//! HTML minification for generated pages.
//!
//! Conservative: line indentation and blank lines are removed, inline
//! `<style>` blocks are minified with lightningcss. `<pre>`, `<textarea>`
//! and `<script>` contents are copied verbatim.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static PRESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre\b.*?</pre>|<textarea\b.*?</textarea>|<script\b.*?</script>").unwrap()
});
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style>)").unwrap());

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("invalid inline style: {0}")]
    Style(String),
}

pub fn minify_html(html: &str) -> Result<String, MinifyError> {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for preserved in PRESERVED.find_iter(html) {
        minify_markup(&html[last..preserved.start()], &mut out)?;
        out.push_str(preserved.as_str());
        last = preserved.end();
    }
    minify_markup(&html[last..], &mut out)?;

    Ok(out)
}

fn minify_markup(markup: &str, out: &mut String) -> Result<(), MinifyError> {
    let collapsed = markup
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut last = 0;
    for caps in STYLE.captures_iter(&collapsed) {
        let (Some(whole), Some(open), Some(css), Some(close)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        out.push_str(&collapsed[last..whole.start()]);
        out.push_str(open.as_str());
        out.push_str(&minify_css(css.as_str())?);
        out.push_str(close.as_str());
        last = whole.end();
    }
    out.push_str(&collapsed[last..]);

    Ok(())
}

pub fn minify_css(css: &str) -> Result<String, MinifyError> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| MinifyError::Style(e.to_string()))?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| MinifyError::Style(e.to_string()))?;
    let result = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| MinifyError::Style(e.to_string()))?;
    Ok(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation_removed() {
        let html = "<div>\n    <p>Hello   world</p>\n\n    <p>Bye</p>\n</div>";
        assert_eq!(
            minify_html(html).unwrap(),
            "<div>\n<p>Hello   world</p>\n<p>Bye</p>\n</div>"
        );
    }

    #[test]
    fn test_preserved_blocks_verbatim() {
        let html = "<body>\n  <pre>\n  keep   this\n    </pre>\n  <textarea>\n  a\n</textarea>\n  <script>\n    var a = 1;\n  </script>\n</body>";
        let minified = minify_html(html).unwrap();

        assert!(minified.contains("<pre>\n  keep   this\n    </pre>"));
        assert!(minified.contains("<textarea>\n  a\n</textarea>"));
        assert!(minified.contains("<script>\n    var a = 1;\n  </script>"));
        assert!(!minified.contains("  <pre>"));
    }

    #[test]
    fn test_inline_style_minified() {
        let html = "<head>\n  <style>\n    body { margin: 0; }\n  </style>\n</head>";
        assert_eq!(
            minify_html(html).unwrap(),
            "<head>\n<style>body{margin:0}</style>\n</head>"
        );
    }

    #[test]
    fn test_style_inside_script_untouched() {
        let html = "<script>const s = '<style> a { } </style>';</script>";
        assert_eq!(minify_html(html).unwrap(), html);
    }
}
