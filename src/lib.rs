//! Rendition - server-side rendering and static generation for prebuilt
//! application bundles.
//!
//! The bundler writes manifests and shell templates into the build
//! directory; rendition turns them into HTML responses (`serve`), single
//! pages (`render`) or a complete static site (`generate`).
//!
//! ```text
//! build dir ─▶ manifest::ManifestStore ─▶ render::Renderer ─┬─▶ serve (tiny_http)
//!                                                           └─▶ generate::Generator
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod csp;
pub mod generate;
pub mod hooks;
pub mod logger;
pub mod manifest;
pub mod render;
pub mod serve;
pub mod utils;
