//! Certificate-file watcher
//!
//! Watches the parent directories of the TLS material files and coalesces
//! change notifications into a capacity-1 channel. Kubernetes secret mounts
//! rotate files through symlink swaps, so the watch covers the whole
//! directory rather than the files themselves.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub struct FsWatcher {
    // Kept alive for the duration of the watch; dropping it releases the
    // underlying notify handles.
    _watcher: Option<RecommendedWatcher>,
    // Holds the sender open when there is nothing to watch, so the channel
    // stays pending instead of closing.
    _tx: Option<mpsc::Sender<()>>,
    pub events: mpsc::Receiver<()>,
}

impl FsWatcher {
    /// Watch the given files for creation, modification or removal. Files
    /// that do not exist yet are covered through their parent directory.
    /// An empty file list yields a watcher that never fires.
    pub fn new(paths: &[PathBuf]) -> Result<Self> {
        let (tx, events) = mpsc::channel(1);

        let dirs: BTreeSet<PathBuf> = paths
            .iter()
            .filter_map(|path| path.parent().map(Path::to_path_buf))
            .collect();
        if dirs.is_empty() {
            return Ok(Self {
                _watcher: None,
                _tx: Some(tx),
                events,
            });
        }

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| {
                let Ok(event) = result else { return };
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    // A full channel means a notification is already
                    // pending; coalesce.
                    let _ = tx.try_send(());
                }
            })
            .context("failed to create filesystem watcher")?;

        for dir in &dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("failed to watch {dir:?}"))?;
        }

        Ok(Self {
            _watcher: Some(watcher),
            _tx: None,
            events,
        })
    }
}
