//! [`EventSource`] backed by Hyprland's event socket.
//!
//! Hyprland broadcasts every state change on `socket2` at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`,
//! one `EVENT>>DATA\n` record per line.  Any number of clients may connect
//! and the socket is write-only from Hyprland's side: we never send
//! anything.

use crate::shutdown::Shutdown;
use crate::traits::{EventSource, SourceError};
use log::info;
use std::io::BufReader;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Resolve the Hyprland event socket path from the environment.
pub fn socket2_path() -> Result<PathBuf, SourceError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| SourceError::Connection("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| SourceError::Connection("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket2.sock",
        runtime_dir, his
    )))
}

/// Connects to Hyprland's event socket.
///
/// Without an explicit path the socket path is resolved from the
/// environment on every connect, so a Hyprland restart under a new
/// instance signature is still an error rather than a stale path.
pub struct HyprlandEventSource {
    path: Option<PathBuf>,
    shutdown: Shutdown,
}

impl HyprlandEventSource {
    pub fn new(path: Option<PathBuf>, shutdown: Shutdown) -> Self {
        Self { path, shutdown }
    }

    fn resolve(&self) -> Result<PathBuf, SourceError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => socket2_path(),
        }
    }
}

impl EventSource for HyprlandEventSource {
    type Stream = BufReader<UnixStream>;

    fn connect(&mut self) -> Result<Self::Stream, SourceError> {
        let path = self.resolve()?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| SourceError::Connection(format!("connect to {}: {}", path.display(), e)))?;
        self.shutdown.register_stream(&stream);
        info!("connected to event socket {}", path.display());
        Ok(BufReader::new(stream))
    }
}
