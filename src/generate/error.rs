//! Per-route generation errors and run-level failures.

use crate::render::RenderError;
use owo_colors::OwoColorize;
use std::fmt;
use thiserror::Error;

/// Unhandled errors printed in full before the rest is summarized.
const MAX_PRINTED: usize = 20;

/// How a route failure affects its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The page reported an error but its HTML was still written.
    Handled,
    /// Nothing was written for the route.
    Unhandled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub route: String,
    pub error: String,
}

impl GenerationError {
    pub fn handled(route: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Handled,
            route: route.into(),
            error: error.into(),
        }
    }

    pub fn unhandled(route: impl Into<String>, error: &anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::Unhandled,
            route: route.into(),
            error: format!("{error:#}"),
        }
    }

    #[inline]
    pub fn is_unhandled(&self) -> bool {
        self.kind == ErrorKind::Unhandled
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.route, self.error)
    }
}

/// Failures that abort a run before or after the crawl.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("before-generate hook failed: {0:#}")]
    BeforeHook(anyhow::Error),

    #[error("failed to prepare output directory: {0:#}")]
    Dist(anyhow::Error),

    #[error("failed to resolve routes: {0:#}")]
    Routes(anyhow::Error),

    #[error("failed to write {0}: {1:#}")]
    Output(&'static str, anyhow::Error),

    #[error("after-generate hook failed: {0:#}")]
    AfterHook(anyhow::Error),
}

/// Print the aggregate error summary of a run.
///
/// ```text
/// [generate] 2 unhandled, 1 handled error(s):
///   ✗ /blog/draft: app render failed: exit status 1
///   ! /missing: This page could not be found
/// ```
pub fn print_report(errors: &[GenerationError]) {
    if errors.is_empty() {
        return;
    }

    let unhandled = errors.iter().filter(|e| e.is_unhandled()).count();
    let module = if unhandled > 0 { "error" } else { "warning" };
    crate::log!(
        module;
        "{} unhandled, {} handled error(s):",
        unhandled,
        errors.len() - unhandled
    );

    let (mut shown, mut hidden) = (0, 0);
    // unhandled first: those are the missing pages
    let ordered = errors
        .iter()
        .filter(|e| e.is_unhandled())
        .chain(errors.iter().filter(|e| !e.is_unhandled()));
    for error in ordered {
        if shown == MAX_PRINTED {
            hidden += 1;
            continue;
        }
        shown += 1;
        let marker = match error.kind {
            ErrorKind::Unhandled => "✗".red().bold().to_string(),
            ErrorKind::Handled => "!".yellow().bold().to_string(),
        };
        eprintln!("  {} {}: {}", marker, error.route, error.error.dimmed());
    }

    if hidden > 0 {
        eprintln!("... and {} more error(s)", hidden);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhandled_keeps_error_chain() {
        let err = anyhow::anyhow!("exit status 1").context("app render failed");
        let error = GenerationError::unhandled("/a", &err);
        assert!(error.is_unhandled());
        assert_eq!(error.to_string(), "/a: app render failed: exit status 1");
    }

    #[test]
    fn test_handled() {
        let error = GenerationError::handled("/missing", "not found");
        assert_eq!(error.kind, ErrorKind::Handled);
        assert!(!error.is_unhandled());
    }
}
