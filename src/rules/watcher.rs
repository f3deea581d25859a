//! Hot-reload of the rule document.
//!
//! [`ConfigWatcher`] polls the document's modification time and size on
//! its own thread.  When either changes it parses the whole document and,
//! only if that succeeds, hands the new snapshot to the daemon loop.  A
//! document that fails to parse is logged and ignored, so the daemon keeps
//! running on the previous rules.

use super::{load, RuleSet};
use crate::daemon::DaemonMessage;
use crate::shutdown::Shutdown;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::{Duration, SystemTime};

/// Cheap change fingerprint of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = std::fs::metadata(path).ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

/// Watches the rule document for modification.
pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
    shutdown: Shutdown,
    last: Option<Fingerprint>,
}

impl ConfigWatcher {
    /// Create a watcher.  The file's current state is taken as the
    /// baseline, so only later edits trigger a reload.
    pub fn new(path: impl AsRef<Path>, interval: Duration, shutdown: Shutdown) -> Self {
        let path = path.as_ref().to_path_buf();
        let last = fingerprint(&path);
        Self {
            path,
            interval,
            shutdown,
            last,
        }
    }

    /// Check the file once.  Returns a freshly loaded snapshot if the
    /// file changed and parsed cleanly.
    pub fn poll(&mut self) -> Option<Arc<RuleSet>> {
        let current = fingerprint(&self.path);
        if current == self.last {
            return None;
        }
        self.last = current;

        if current.is_none() {
            error!(
                "rule file {} disappeared, keeping current rules",
                self.path.display()
            );
            return None;
        }

        debug!("{} changed, reloading", self.path.display());
        match load(&self.path) {
            Ok(set) => Some(set),
            Err(e) => {
                error!("{}; keeping current rules", e);
                None
            }
        }
    }

    /// Poll until shutdown, sending every good reload into `sink`.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    pub fn run(&mut self, sink: mpsc::Sender<DaemonMessage>) {
        info!(
            "watching {} every {:?}",
            self.path.display(),
            self.interval
        );
        while self.shutdown.sleep(self.interval) {
            if let Some(set) = self.poll() {
                if sink.send(DaemonMessage::RulesReloaded(set)).is_err() {
                    break;
                }
            }
        }
        info!("config watcher stopped");
    }
}
