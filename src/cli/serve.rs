//! `rendition serve`: render routes on demand.

use super::{command_renderer, runtime};
use crate::config::Config;
use crate::serve::{PushPolicy, bind_server};
use crate::{debug, log};
use anyhow::Result;
use std::sync::Arc;

pub fn serve_site(config: &Arc<Config>) -> Result<()> {
    // Bind first so the port is taken while resources load
    let server = bind_server(config)?;
    let runtime = runtime();

    let renderer = command_renderer(config);
    let report = renderer.load_resources();
    if !renderer.is_ready() {
        log!("warning"; "waiting for build output in {}", config.build.dir.display());
    }
    debug!("serve"; "loaded {:?}", report.updated);

    let push = PushPolicy::from_config(&config.render);
    server.run(renderer, push, runtime.handle().clone())
}
