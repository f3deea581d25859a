//! Unix-socket control interface.
//!
//! Binds a Unix stream socket and accepts one connection at a time.  Each
//! line received is parsed as a JSON-encoded [`ControlRequest`] and
//! answered with exactly one JSON [`ControlResponse`] line.
//!
//! # Wire format
//!
//! ```json
//! "Status"
//! "Reload"
//! "Shutdown"
//! ```
//!
//! Responses:
//!
//! ```json
//! {"Status":{"alive":true,"pid":4242,"connection":"connected","rule_count":3,...}}
//! {"Reloaded":{"rule_count":3}}
//! "Ok"
//! {"Error":"config error: ..."}
//! ```

use crate::daemon::{DaemonMessage, DaemonStatus};
use crate::rules;
use crate::shutdown::Shutdown;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// How long to wait for the daemon loop to answer a status request.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// A request sent by the CLI or the rule editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlRequest {
    Status,
    Reload,
    Shutdown,
}

/// The single reply to a [`ControlRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlResponse {
    Status(DaemonStatus),
    Reloaded { rule_count: usize },
    Ok,
    Error(String),
}

/// Errors produced by the control listener.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Listens on a Unix socket for control requests and relays them to the
/// daemon loop.
pub struct ControlListener {
    path: PathBuf,
    rules_path: PathBuf,
    shutdown: Shutdown,
}

impl ControlListener {
    /// Create a listener bound to `path`.  `Reload` requests re-read the
    /// document at `rules_path`.
    ///
    /// The socket file is created when [`run`](Self::run) is called and
    /// removed when it returns.
    pub fn new(path: impl AsRef<Path>, rules_path: impl AsRef<Path>, shutdown: Shutdown) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rules_path: rules_path.as_ref().to_path_buf(),
            shutdown,
        }
    }

    /// Bind the socket and serve requests until shutdown.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    pub fn run(&mut self, sink: mpsc::Sender<DaemonMessage>) -> Result<(), ControlError> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("control socket listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("control client connected");
                    if let Err(e) = self.serve(stream, &sink) {
                        warn!("control client error: {}", e);
                    }
                    debug!("control client disconnected");
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
            if self.shutdown.is_requested() {
                break;
            }
        }

        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }

    fn serve(
        &self,
        stream: UnixStream,
        sink: &mpsc::Sender<DaemonMessage>,
    ) -> Result<(), ControlError> {
        let mut writer = stream.try_clone()?;
        let reader = BufReader::new(stream);

        for line in reader.lines() {
            let text = line?;
            if text.trim().is_empty() {
                continue;
            }
            let (response, stop) = match serde_json::from_str::<ControlRequest>(&text) {
                Ok(request) => {
                    debug!("control request {:?}", request);
                    self.respond(request, sink)
                }
                Err(e) => {
                    error!("bad request: {} ({})", text, e);
                    (ControlResponse::Error(format!("bad request: {}", e)), false)
                }
            };
            let mut json = serde_json::to_string(&response)?;
            json.push('\n');
            writer.write_all(json.as_bytes())?;

            if stop {
                let _ = sink.send(DaemonMessage::Shutdown);
                self.shutdown.trigger();
                break;
            }
        }
        Ok(())
    }

    /// Build the response for one request.  The flag is `true` when the
    /// daemon should stop after replying.
    fn respond(
        &self,
        request: ControlRequest,
        sink: &mpsc::Sender<DaemonMessage>,
    ) -> (ControlResponse, bool) {
        match request {
            ControlRequest::Status => {
                let (tx, rx) = mpsc::channel();
                if sink.send(DaemonMessage::Status(tx)).is_err() {
                    return (ControlResponse::Error("daemon loop is gone".into()), false);
                }
                match rx.recv_timeout(STATUS_TIMEOUT) {
                    Ok(status) => (ControlResponse::Status(status), false),
                    Err(e) => (ControlResponse::Error(format!("no status: {}", e)), false),
                }
            }
            ControlRequest::Reload => match rules::load(&self.rules_path) {
                Ok(set) => {
                    let rule_count = set.len();
                    if sink.send(DaemonMessage::RulesReloaded(set)).is_err() {
                        return (ControlResponse::Error("daemon loop is gone".into()), false);
                    }
                    (ControlResponse::Reloaded { rule_count }, false)
                }
                Err(e) => {
                    error!("{}; keeping current rules", e);
                    (ControlResponse::Error(e.to_string()), false)
                }
            },
            ControlRequest::Shutdown => (ControlResponse::Ok, true),
        }
    }
}

//  Tests
