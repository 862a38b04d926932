//! Configuration section definitions.
//!
//! Each module corresponds to a section in `rendition.toml`:
//!
//! | Module     | TOML Section   | Purpose                                   |
//! |------------|----------------|-------------------------------------------|
//! | `build`    | `[build]`      | Build output location, public path        |
//! | `router`   | `[router]`     | Router base and trailing slash policy     |
//! | `render`   | `[render]`     | Render pipeline, CSP, HTTP/2, app command |
//! | `generate` | `[generate]`   | Static export (routes, crawler, output)   |
//! | `serve`    | `[serve]`      | HTTP server                               |

mod build;
mod generate;
mod render;
mod router;
mod serve;

pub use build::BuildConfig;
pub use generate::{
    ExcludePattern, Fallback, GenerateConfig, GenerateHookConfig, GenerateHooksConfig,
    RouteEntry, StaticAssetsConfig,
};
pub use render::{
    AppConfig, CspConfig, EtagConfig, GlobalsConfig, Http2Config, ModernMode, RenderConfig,
};
pub use router::RouterConfig;
pub use serve::ServeConfig;
