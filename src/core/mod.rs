//! Process-wide state shared by the serve and generate commands.

mod state;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
