//! `rendition generate`: pre-render the site.

use super::{command_renderer, runtime};
use crate::config::Config;
use crate::generate::{GenerateOptions, GenerateReport, Generator, print_report};
use crate::log;
use crate::utils::plural::plural_count;
use anyhow::{Result, bail};
use std::sync::Arc;

pub fn generate_site(config: &Arc<Config>) -> Result<()> {
    let renderer = command_renderer(config);
    let generator = Generator::new(Arc::clone(config), renderer);

    let report = runtime().block_on(generator.generate(GenerateOptions::default()))?;

    print_report(&report.errors);
    log_summary(&report);

    if report.has_unhandled() && config.generate.fail_on_error {
        bail!(
            "{} failed to render",
            plural_count(report.unhandled(), "route")
        );
    }
    Ok(())
}

fn log_summary(report: &GenerateReport) {
    let module = if report.interrupted { "warning" } else { "done" };
    let stopped = if report.interrupted { ", stopped early" } else { "" };
    log!(
        module;
        "generated {} in {:.2?}{}",
        plural_count(report.routes.len(), "route"),
        report.duration,
        stopped
    );
    if let Some(fallback) = &report.fallback {
        log!("generate"; "fallback {}", fallback.display());
    }
}
