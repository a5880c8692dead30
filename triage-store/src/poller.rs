//! Background reload of a task source.
//!
//! A tokio task re-reads the source on a fixed interval and publishes the
//! result on a `watch` channel, but only when it differs from what was last
//! published. Failed reloads are logged and the previous snapshot stays.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use triage_core::{Clock, Point, Task};

use crate::markdown::parse_markdown;
use crate::store::load_tasks;

pub type Snapshot = Arc<Vec<Task>>;

/// Anything that can produce the current task list.
pub trait SnapshotSource: Send + 'static {
    fn load(&mut self) -> Result<Vec<Task>>;

    fn describe(&self) -> String {
        "task source".to_string()
    }
}

/// The JSON file written by [`crate::TaskStore`].
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for JsonFileSource {
    fn load(&mut self) -> Result<Vec<Task>> {
        load_tasks(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A markdown task list. Tasks without a start begin at midnight of the
/// clock's current day, so rereading an unchanged file yields equal tasks.
pub struct MarkdownFileSource {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl MarkdownFileSource {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }
}

impl SnapshotSource for MarkdownFileSource {
    fn load(&mut self) -> Result<Vec<Task>> {
        let md = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        parse_markdown(&md, Point::now(self.clock.as_ref()).start_of_day())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub struct SnapshotPoller {
    rx: watch::Receiver<Snapshot>,
    handle: JoinHandle<()>,
}

impl SnapshotPoller {
    /// Load once synchronously, then keep reloading every `interval`.
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: SnapshotSource>(mut source: S, interval: Duration) -> Self {
        let name = source.describe();
        let initial = source.load().unwrap_or_else(|e| {
            warn!(source = %name, error = %e, "initial load failed, starting empty");
            Vec::new()
        });
        info!(source = %name, count = initial.len(), ?interval, "snapshot poller started");

        let (tx, rx) = watch::channel(Arc::new(initial));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match source.load() {
                    Ok(next) => {
                        let changed = tx.send_if_modified(|current| {
                            if **current == next {
                                false
                            } else {
                                *current = Arc::new(next);
                                true
                            }
                        });
                        if changed {
                            debug!(source = %name, "snapshot changed");
                        }
                    }
                    Err(e) => warn!(source = %name, error = %e, "reload failed, keeping previous snapshot"),
                }
            }
        });

        Self { rx, handle }
    }

    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.rx.clone()
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
