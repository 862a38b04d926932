//! Rendition command-line entry point.

use anyhow::Result;
use std::sync::Arc;
use clap::{ColorChoice, Parser};
use rendition::cli::{self, Cli, Commands};
use rendition::config::Config;
use rendition::core;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(Config::load(cli)?);

    match &cli.command {
        Commands::Generate { .. } => cli::generate::generate_site(&config),
        Commands::Serve { .. } => cli::serve::serve_site(&config),
        Commands::Render { url, spa, modern } => {
            cli::render::render_url(&config, url, *spa, *modern)
        }
    }
}
