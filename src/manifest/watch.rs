//! Resource watcher.
//!
//! Watches the build directory and reloads resources after the bundler
//! finished writing. Events are debounced so that a rebuild emitting
//! several manifests triggers one load batch.
//!
//! ```text
//! notify → std channel → bridge thread → tokio channel → debounce → on_change()
//! ```

use super::ResourceKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const DEBOUNCE_MS: u64 = 300;

/// Watches resource files below a build directory.
pub struct ResourceWatcher {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
}

impl ResourceWatcher {
    /// Start watching immediately; events buffer until [`run`](Self::run).
    pub fn new(build_dir: &Path) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(build_dir, RecursiveMode::Recursive)?;

        Ok(Self {
            notify_rx,
            _watcher: watcher,
        })
    }

    /// Run the event loop, calling `on_change` once per debounced batch.
    pub async fn run<F: FnMut()>(self, mut on_change: F) {
        let notify_rx = self.notify_rx;
        let _watcher = self._watcher;
        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        let debounce = Duration::from_millis(DEBOUNCE_MS);
        let mut deadline: Option<Instant> = None;

        loop {
            let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) if is_resource_event(&event) => {
                        deadline = Some(Instant::now() + debounce);
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    deadline = None;
                    on_change();
                }
            }
        }
    }
}

/// Whether an event touches one of the files the render pipeline loads.
fn is_resource_event(event: &notify::Event) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    event.paths.iter().any(|path| is_resource_file(path))
}

fn is_resource_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    ResourceKind::ALL.iter().any(|kind| kind.file_name() == name) || name == "routes.json"
}
