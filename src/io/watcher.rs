use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::file_store::list_id_from_path;
use crate::model::ListId;

/// Change feed of a file-backed store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A list document was written, created or removed
    Changed(ListId),
}

/// Watches the `lists/` directory of a [`FileStore`](crate::io::file_store::FileStore)
/// so a panel can re-hydrate when another client commits.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<StoreEvent>,
}

impl StoreWatcher {
    pub fn start(lists_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                // temp files from atomic writes have no .json extension
                for id in event.paths.iter().filter_map(|p| list_id_from_path(p)) {
                    let _ = tx.send(StoreEvent::Changed(id));
                }
            },
            Config::default(),
        )?;

        watcher.watch(lists_dir, RecursiveMode::NonRecursive)?;
        Ok(StoreWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain queued events without blocking. One write often produces several
    /// filesystem events, so repeats of the same list are collapsed.
    pub fn poll(&self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if !events.contains(&event) {
                events.push(event);
            }
        }
        events
    }

    /// Block up to `timeout` for the next event.
    pub fn wait(&self, timeout: Duration) -> Option<StoreEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}
