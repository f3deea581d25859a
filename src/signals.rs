//! Process signals.
//!
//! `SIGHUP` re-reads the rule document, `SIGINT` and `SIGTERM` stop the
//! daemon.  Signals are received on their own thread through
//! [`signal_hook::iterator::Signals`] and turned into
//! [`DaemonMessage`]s like every other source.

use crate::daemon::DaemonMessage;
use crate::rules;
use crate::shutdown::Shutdown;
use log::{error, info};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// What the daemon does on a given signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalAction {
    Reload,
    Shutdown,
}

fn action_for(signal: c_int) -> Option<SignalAction> {
    match signal {
        SIGHUP => Some(SignalAction::Reload),
        SIGINT | SIGTERM => Some(SignalAction::Shutdown),
        _ => None,
    }
}

pub struct SignalListener {
    signals: Signals,
    rules_path: PathBuf,
    shutdown: Shutdown,
}

impl SignalListener {
    /// Install handlers for `SIGHUP`, `SIGINT` and `SIGTERM`.
    pub fn new(rules_path: impl AsRef<Path>, shutdown: Shutdown) -> std::io::Result<Self> {
        Self::with_signals(&[SIGHUP, SIGINT, SIGTERM], rules_path, shutdown)
    }

    fn with_signals(
        signals: &[c_int],
        rules_path: impl AsRef<Path>,
        shutdown: Shutdown,
    ) -> std::io::Result<Self> {
        Ok(Self {
            signals: Signals::new(signals)?,
            rules_path: rules_path.as_ref().to_path_buf(),
            shutdown,
        })
    }

    /// Closing the handle ends [`run`](Self::run).
    pub fn handle(&self) -> Handle {
        self.signals.handle()
    }

    /// Handle signals until a terminating one arrives, the handle is
    /// closed, or the daemon loop goes away.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    pub fn run(&mut self, sink: mpsc::Sender<DaemonMessage>) {
        for signal in self.signals.forever() {
            match action_for(signal) {
                Some(SignalAction::Reload) => {
                    info!("received SIGHUP, reloading {}", self.rules_path.display());
                    if let Some(msg) = reload_message(&self.rules_path) {
                        if sink.send(msg).is_err() {
                            break;
                        }
                    }
                }
                Some(SignalAction::Shutdown) => {
                    info!("received termination signal");
                    self.shutdown.trigger();
                    let _ = sink.send(DaemonMessage::Shutdown);
                    break;
                }
                None => {}
            }
        }
    }
}

/// A fresh rule set for the daemon loop, or `None` if the document is
/// invalid and the current rules stay active.
fn reload_message(path: &Path) -> Option<DaemonMessage> {
    match rules::load(path) {
        Ok(set) => Some(DaemonMessage::RulesReloaded(set)),
        Err(e) => {
            error!("{}; keeping current rules", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TWO: &str = r#"[
        { "id": "a", "trigger": { "type": "workspace" } },
        { "id": "b", "trigger": { "type": "openwindow" } }
    ]"#;

    #[test]
    fn hangup_reloads_and_termination_stops() {
        assert_eq!(action_for(SIGHUP), Some(SignalAction::Reload));
        assert_eq!(action_for(SIGINT), Some(SignalAction::Shutdown));
        assert_eq!(action_for(SIGTERM), Some(SignalAction::Shutdown));
        assert_eq!(action_for(signal_hook::consts::signal::SIGUSR1), None);
    }

    #[test]
    fn sighup_sends_reloaded_rules_and_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.json");
        std::fs::write(&path, TWO).unwrap();

        let shutdown = Shutdown::new();
        let mut listener = SignalListener::with_signals(&[SIGHUP], &path, shutdown.clone()).unwrap();
        let handle = listener.handle();
        let (tx, rx) = mpsc::channel();
        let thread = std::thread::spawn(move || listener.run(tx));

        signal_hook::low_level::raise(SIGHUP).unwrap();
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            DaemonMessage::RulesReloaded(set) => assert_eq!(set.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!shutdown.is_requested());

        handle.close();
        thread.join().unwrap();
    }

    #[test]
    fn invalid_document_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(reload_message(&path).is_none());
        assert!(reload_message(&dir.path().join("missing.json")).is_none());
    }

    #[test]
    fn valid_document_yields_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.json");
        std::fs::write(&path, TWO).unwrap();
        match reload_message(&path) {
            Some(DaemonMessage::RulesReloaded(set)) => assert_eq!(set.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
