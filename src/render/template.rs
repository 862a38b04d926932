//! HTML shell templates.
//!
//! The bundler emits `index.ssr.html` / `index.spa.html` with placeholders:
//!
//! ```html
//! <!DOCTYPE html>
//! <html {{ HTML_ATTRS }}>
//!   <head {{ HEAD_ATTRS }}>{{ HEAD }}</head>
//!   <body {{ BODY_ATTRS }}>{{ APP }}</body>
//! </html>
//! ```
//!
//! Only placeholder substitution is supported. Keys are case-insensitive,
//! unknown keys render as empty strings.

use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Values substituted into a shell template.
#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    pub html_attrs: String,
    pub head_attrs: String,
    pub body_attrs: String,
    pub head: String,
    pub app: String,
    /// Error templates only.
    pub status: String,
    pub message: String,
}

impl TemplateParams {
    fn get(&self, key: &str) -> &str {
        match key {
            "HTML_ATTRS" => &self.html_attrs,
            "HEAD_ATTRS" => &self.head_attrs,
            "BODY_ATTRS" => &self.body_attrs,
            "HEAD" => &self.head,
            "APP" => &self.app,
            "STATUS" => &self.status,
            "MESSAGE" => &self.message,
            _ => "",
        }
    }
}

/// An HTML shell the pipeline renders its fragments into.
pub trait ShellTemplate: Send + Sync {
    fn render_template(&self, params: &TemplateParams) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Key(String),
}

/// Template with `{{ KEY }}` placeholders, split into segments once.
#[derive(Debug, Clone)]
pub struct PlaceholderTemplate {
    segments: Vec<Segment>,
    /// Sum of the literal text lengths, used as a capacity hint.
    text_len: usize,
}

impl PlaceholderTemplate {
    pub fn parse(src: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(src) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Text(src[last..whole.start()].to_string()));
            }
            segments.push(Segment::Key(key.as_str().to_ascii_uppercase()));
            last = whole.end();
        }
        if last < src.len() {
            segments.push(Segment::Text(src[last..].to_string()));
        }

        let text_len = segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => t.len(),
                Segment::Key(_) => 0,
            })
            .sum();

        Self { segments, text_len }
    }
}

impl ShellTemplate for PlaceholderTemplate {
    fn render_template(&self, params: &TemplateParams) -> String {
        let mut out = String::with_capacity(self.text_len + params.head.len() + params.app.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Key(key) => out.push_str(params.get(key)),
            }
        }
        out
    }
}

/// Error page used when the build output has no `error.html`.
pub(crate) fn fallback_error_page(status: u16, message: &str) -> String {
    let message = crate::utils::html::escape(message);
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{status}</title></head>\
         <body><h1>{status}</h1><p>{message}</p></body></html>"
    )
}
