//! Command-line interface module.

mod args;
pub mod generate;
pub mod render;
pub mod serve;

pub use args::{Cli, Commands, GenerateArgs};

use crate::app::CommandApp;
use crate::config::Config;
use crate::manifest::ManifestStore;
use crate::render::Renderer;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Renderer backed by the configured app command.
pub fn command_renderer(config: &Arc<Config>) -> Arc<Renderer> {
    Arc::new(Renderer::new(
        Arc::clone(config),
        Arc::new(ManifestStore::new()),
        Arc::new(CommandApp::factory(Arc::clone(config))),
    ))
}

pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime")
}
