//! The application renderer seam.
//!
//! Rendering the component tree is not done here. The pipeline talks to an
//! [`AppRenderer`] built once per resource load by an [`AppFactory`] and
//! invoked for every render:
//!
//! ```ignore
//! let factory = |server: &Manifest| -> anyhow::Result<Arc<dyn AppRenderer>> {
//!     Ok(Arc::new(MyApp::new(server.entry())))
//! };
//! let renderer = Renderer::new(config, store, Arc::new(factory));
//! ```
//!
//! [`CommandApp`] is the built-in implementation that delegates to an
//! external process.

mod command;

pub use command::CommandApp;

use crate::manifest::Manifest;
use crate::render::RenderContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Markup fragments the app contributes outside its root element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetaFragments {
    pub html_attrs: String,
    pub head_attrs: String,
    pub body_attrs: String,
    pub title: String,
    pub meta: String,
    pub link: String,
    pub style: String,
    pub script: String,
    pub noscript: String,
    /// Inserted right after `<body>`, before the app markup.
    pub body_prepend: String,
    /// Inserted at the end of `<body>`.
    pub body_append: String,
}

/// What one `render_to_string` call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppOutput {
    pub html: String,
    pub meta: MetaFragments,
    /// Bundle files the rendered components used (lazy chunks included).
    pub preload_files: Vec<String>,
}

/// The component-tree renderer.
///
/// Implementations may record state, errors and redirects on the context.
/// Returning `Err` marks the render as crashed.
#[async_trait]
pub trait AppRenderer: Send + Sync {
    async fn render_to_string(&self, ctx: &mut RenderContext) -> anyhow::Result<AppOutput>;
}

/// Builds an [`AppRenderer`] from the server manifest.
pub trait AppFactory: Send + Sync {
    fn create(&self, server: &Manifest) -> anyhow::Result<Arc<dyn AppRenderer>>;
}

impl<F> AppFactory for F
where
    F: Fn(&Manifest) -> anyhow::Result<Arc<dyn AppRenderer>> + Send + Sync,
{
    fn create(&self, server: &Manifest) -> anyhow::Result<Arc<dyn AppRenderer>> {
        self(server)
    }
}
