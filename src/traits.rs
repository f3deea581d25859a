//! Core traits that decouple the daemon from Hyprland and from the
//! operating system's process launcher.
//!
//! The [`Daemon`](crate::daemon::Daemon) and the reconnect loop in
//! [`source`](crate::source) only depend on these abstractions, so tests
//! can drive them with scripted streams and recording launchers.

use std::io::BufRead;

/// Errors from the event socket.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The endpoint is absent or refused the connection.
    #[error("connection error: {0}")]
    Connection(String),
    /// The peer closed the stream or a read failed.
    #[error("event stream closed: {0}")]
    StreamClosed(String),
}

/// Something that can open a fresh stream of newline-delimited event
/// records.
///
/// # Contract
///
/// * Every call to [`connect`](EventSource::connect) yields a brand-new
///   stream; nothing read from an earlier stream is carried over.
/// * Implementations must be [`Send`] so they can run on a dedicated
///   thread.
pub trait EventSource: Send {
    type Stream: BufRead;

    /// Open a new connection to the event endpoint.
    fn connect(&mut self) -> Result<Self::Stream, SourceError>;
}

/// Error launching an action's command.
#[derive(Debug, thiserror::Error)]
#[error("failed to launch {command:?}: {reason}")]
pub struct LaunchError {
    pub command: String,
    pub reason: String,
}

/// Starts external commands without waiting for them.
pub trait Launcher {
    /// Launch `command` and return as soon as it has been started.
    fn launch(&self, command: &str) -> Result<(), LaunchError>;
}
