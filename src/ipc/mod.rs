//! Control socket for the CLI and the rule editor.
//!
//! External tools connect to the socket and send newline-delimited JSON
//! requests to query status, force a reload, or stop the daemon.

pub mod listener;
