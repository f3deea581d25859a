//! **hyperflow** — rule-driven automation for Hyprland.
//!
//! The daemon listens to Hyprland's event socket and, for every event,
//! runs the user's rules: a rule names the event type that triggers it, an
//! optional debounce window, a list of property conditions and a list of
//! shell commands to launch when everything matches.
//!
//! # Architecture
//!
//! Background threads feed a single channel of
//! [`DaemonMessage`](daemon::DaemonMessage)s into the
//! [`Daemon`](daemon::Daemon), which processes them strictly in order:
//!
//! * [`source::Reconnecting`] keeps an [`traits::EventSource`] (normally
//!   [`hyprland::events::HyprlandEventSource`]) connected and forwards raw
//!   records.
//! * [`rules::watcher::ConfigWatcher`] reloads the rule document when it
//!   changes on disk.
//! * [`ipc::listener::ControlListener`] answers status and reload requests.
//! * [`signals::SignalListener`] reloads on `SIGHUP` and stops on
//!   `SIGINT`/`SIGTERM`.
//!
//! Matching lives in [`event`], [`condition`] and [`debounce`]; commands
//! are launched through the [`traits::Launcher`] trait by [`dispatch`].

pub mod condition;
pub mod config;
pub mod daemon;
pub mod debounce;
pub mod dispatch;
pub mod event;
pub mod hyprland;
pub mod ipc;
pub mod rules;
pub mod shutdown;
pub mod signals;
pub mod source;
pub mod traits;
