//! The active rule set owned by the daemon loop.

use super::{load, ConfigError, RuleSet};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Holds the currently active [`RuleSet`] snapshot.
///
/// A failed load never touches the active set, so a broken edit to the
/// rule document leaves the daemon running on the last good rules.
#[derive(Debug)]
pub struct RuleStore {
    path: PathBuf,
    active: Arc<RuleSet>,
    last_reload: Option<DateTime<Utc>>,
}

impl RuleStore {
    /// Create an empty store for the document at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            active: Arc::new(RuleSet::default()),
            last_reload: None,
        }
    }

    /// Create a store and try an initial load.  A failure is logged and
    /// the store starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut store = Self::new(path);
        if let Err(e) = store.reload() {
            error!("{}", e);
        }
        store
    }

    /// Cheap handle to the current snapshot.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.active)
    }

    pub fn last_reload(&self) -> Option<DateTime<Utc>> {
        self.last_reload
    }

    /// Re-read the document and swap it in on success.
    pub fn reload(&mut self) -> Result<usize, ConfigError> {
        let set = load(&self.path)?;
        let count = set.len();
        self.replace(set);
        Ok(count)
    }

    /// Swap in a fully parsed snapshot.
    pub fn replace(&mut self, set: Arc<RuleSet>) {
        info!(
            "loaded {} rule(s) ({} enabled) from {}",
            set.len(),
            set.enabled_count(),
            self.path.display()
        );
        self.active = set;
        self.last_reload = Some(Utc::now());
    }
}
