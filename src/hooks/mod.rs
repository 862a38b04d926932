//! External command hooks.
//!
//! Commands configured in `rendition.toml` (generation hooks, the app
//! renderer command) receive `$RENDITION_*` variables both substituted in
//! their arguments and set in their environment.

mod runner;

pub use runner::{build_vars, resolve_args, run_hook, run_hooks};
