//! The event-processing loop.
//!
//! Every background thread (event source, config watcher, control socket,
//! signal handler) talks to the [`Daemon`] through one
//! [`mpsc`](std::sync::mpsc) channel of [`DaemonMessage`]s.  The daemon
//! consumes them one at a time on the main thread, so rules always see
//! events in arrival order and the debounce state needs no locking.
//!
//! ```text
//! Disconnected ──Connected──▶ Connected ──Event──▶ Matching ──▶ Dispatching
//!      ▲                          │  ▲                  │             │
//!      └──────Disconnected────────┘  └──────────────────┴─────────────┘
//! ```

use crate::condition;
use crate::debounce::DebounceGate;
use crate::dispatch;
use crate::event::Event;
use crate::rules::store::RuleStore;
use crate::rules::RuleSet;
use crate::traits::Launcher;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

/// Messages delivered to the daemon loop.
#[derive(Debug)]
pub enum DaemonMessage {
    /// The event socket connected.
    Connected,
    /// The event socket dropped; the source is backing off.
    Disconnected,
    /// One raw record from the event socket.
    Event(String),
    /// A fully parsed rule set to swap in.
    RulesReloaded(Arc<RuleSet>),
    /// Reply with the current status on the given channel.
    Status(mpsc::Sender<DaemonStatus>),
    /// Stop the loop.
    Shutdown,
}

/// Whether the event socket is currently connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Snapshot of the daemon's state for the control socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub alive: bool,
    pub pid: u32,
    pub connection: ConnectionState,
    pub rule_count: usize,
    pub enabled_rule_count: usize,
    pub events_processed: u64,
    pub last_reload: Option<DateTime<Utc>>,
}

/// Owns the rule store, the debounce state and the launcher.
pub struct Daemon<L: Launcher> {
    store: RuleStore,
    gate: DebounceGate,
    launcher: L,
    connection: ConnectionState,
    events_processed: u64,
}

impl<L: Launcher> Daemon<L> {
    pub fn new(store: RuleStore, launcher: L) -> Self {
        Self {
            store,
            gate: DebounceGate::new(),
            launcher,
            connection: ConnectionState::Disconnected,
            events_processed: 0,
        }
    }

    /// Consume messages until a [`DaemonMessage::Shutdown`] arrives or
    /// every sender is gone.
    pub fn run(&mut self, rx: mpsc::Receiver<DaemonMessage>) {
        info!("hyperflow running");
        for msg in rx {
            if !self.handle(msg) {
                info!("shutting down");
                return;
            }
        }
        info!("all message sources closed, exiting");
    }

    /// Apply one message.  Returns `false` when the loop should stop.
    pub fn handle(&mut self, msg: DaemonMessage) -> bool {
        match msg {
            DaemonMessage::Connected => {
                self.connection = ConnectionState::Connected;
            }
            DaemonMessage::Disconnected => {
                self.connection = ConnectionState::Disconnected;
            }
            DaemonMessage::Event(line) => {
                self.process_line(&line, Instant::now());
            }
            DaemonMessage::RulesReloaded(set) => {
                self.gate.retain_rules(&set);
                self.store.replace(set);
            }
            DaemonMessage::Status(reply) => {
                let _ = reply.send(self.status());
            }
            DaemonMessage::Shutdown => return false,
        }
        true
    }

    /// Parse one raw record and run it through the rules.
    ///
    /// Returns the ids of the rules that fired.
    pub fn process_line(&mut self, line: &str, now: Instant) -> Vec<String> {
        match Event::parse(line) {
            Ok(event) => self.process_event(&event, now),
            Err(e) => {
                warn!("dropping event: {}", e);
                Vec::new()
            }
        }
    }

    /// Match `event` against every enabled rule, in stored order.
    pub fn process_event(&mut self, event: &Event, now: Instant) -> Vec<String> {
        self.events_processed += 1;
        debug!("event {} {:?}", event.kind, event.properties);

        let rules = self.store.snapshot();
        let mut fired = Vec::new();

        for rule in rules.rules() {
            if !rule.enabled || rule.trigger.kind != event.kind {
                continue;
            }
            let fires = self.gate.should_fire(&rule.id, rule.trigger.debounce, now, || {
                condition::matches(&rule.conditions, event)
            });
            if !fires {
                continue;
            }

            info!("rule '{}' matched", rule.label());
            dispatch::dispatch(&self.launcher, &rule.actions);
            fired.push(rule.id.clone());
        }
        fired
    }

    pub fn status(&self) -> DaemonStatus {
        let rules = self.store.snapshot();
        DaemonStatus {
            alive: true,
            pid: std::process::id(),
            connection: self.connection,
            rule_count: rules.len(),
            enabled_rule_count: rules.enabled_count(),
            events_processed: self.events_processed,
            last_reload: self.store.last_reload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LaunchError;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Recording {
        log: RefCell<Vec<String>>,
    }

    impl Launcher for Recording {
        fn launch(&self, command: &str) -> Result<(), LaunchError> {
            self.log.borrow_mut().push(command.to_string());
            Ok(())
        }
    }

    const RULES: &str = r#"[
        {
            "id": "wf_001",
            "name": "Auto-move Spotify to workspace 5",
            "enabled": true,
            "trigger": { "type": "openwindow", "debounce": 100 },
            "conditions": [ { "property": "class", "operator": "equals", "value": "spotify" } ],
            "actions": [ { "command": "hyprctl dispatch movetoworkspace 5" } ]
        },
        {
            "id": "wf_002",
            "name": "Code theme",
            "trigger": { "type": "workspace" },
            "conditions": [ { "property": "name", "operator": "equals", "value": "Code" } ],
            "actions": [ { "command": "switch-theme dark" } ]
        },
        {
            "id": "wf_003",
            "name": "Log every window",
            "trigger": { "type": "openwindow" },
            "actions": [ { "command": "log-window" }, { "command": "count-window" } ]
        },
        {
            "id": "wf_004",
            "name": "Disabled",
            "enabled": false,
            "trigger": { "type": "workspace" },
            "actions": [ { "command": "never" } ]
        }
    ]"#;

    fn daemon_with(json: &str) -> Daemon<Recording> {
        let mut store = RuleStore::new("/unused/workflows.json");
        store.replace(Arc::new(RuleSet::from_json(json).unwrap()));
        Daemon::new(store, Recording::default())
    }

    fn launched(d: &Daemon<Recording>) -> Vec<String> {
        d.launcher.log.borrow().clone()
    }

    #[test]
    fn spotify_window_moves_to_workspace_5() {
        let mut d = daemon_with(RULES);
        let fired = d.process_line("openwindow>>0x1,1,spotify,Spotify", Instant::now());
        assert_eq!(fired, vec!["wf_001", "wf_003"]);
        assert_eq!(
            launched(&d),
            vec!["hyprctl dispatch movetoworkspace 5", "log-window", "count-window"]
        );
    }

    #[test]
    fn firefox_window_does_not_trigger_spotify_rule() {
        let mut d = daemon_with(RULES);
        let fired = d.process_line("openwindow>>0x2,1,firefox,Mozilla Firefox", Instant::now());
        assert_eq!(fired, vec!["wf_003"]);
        assert!(!launched(&d).contains(&"hyprctl dispatch movetoworkspace 5".to_string()));
    }

    #[test]
    fn workspace_code_switches_theme() {
        let mut d = daemon_with(RULES);
        let fired = d.process_line("workspace>>Code", Instant::now());
        assert_eq!(fired, vec!["wf_002"]);
        assert_eq!(launched(&d), vec!["switch-theme dark"]);
    }

    #[test]
    fn unknown_event_matches_nothing() {
        let mut d = daemon_with(RULES);
        assert!(d.process_line("screencast>>1,0", Instant::now()).is_empty());
        assert!(launched(&d).is_empty());
        assert_eq!(d.status().events_processed, 1);
    }

    #[test]
    fn malformed_line_is_dropped() {
        let mut d = daemon_with(RULES);
        assert!(d.process_line("no separator here", Instant::now()).is_empty());
        assert_eq!(d.status().events_processed, 0);
    }

    #[test]
    fn debounce_suppresses_rapid_refire() {
        let mut d = daemon_with(RULES);
        let t0 = Instant::now();
        let line = "openwindow>>0x1,1,spotify,Spotify";

        assert!(d.process_line(line, t0).contains(&"wf_001".to_string()));
        assert!(!d
            .process_line(line, t0 + Duration::from_millis(50))
            .contains(&"wf_001".to_string()));
        assert!(d
            .process_line(line, t0 + Duration::from_millis(150))
            .contains(&"wf_001".to_string()));
    }

    #[test]
    fn failed_condition_does_not_consume_debounce_window() {
        let mut d = daemon_with(RULES);
        let t0 = Instant::now();

        d.process_line("openwindow>>0x2,1,firefox,Firefox", t0);
        let fired = d.process_line(
            "openwindow>>0x1,1,spotify,Spotify",
            t0 + Duration::from_millis(10),
        );
        assert!(fired.contains(&"wf_001".to_string()));
    }

    #[test]
    fn disabled_rules_never_fire() {
        let mut d = daemon_with(RULES);
        d.process_line("workspace>>Other", Instant::now());
        assert!(!launched(&d).contains(&"never".to_string()));
    }

    #[test]
    fn reload_swaps_rules_between_events() {
        let mut d = daemon_with(RULES);
        let next = r#"[{ "id": "x", "trigger": { "type": "workspace" },
            "actions": [ { "command": "new-rule" } ] }]"#;
        assert!(d.handle(DaemonMessage::RulesReloaded(Arc::new(
            RuleSet::from_json(next).unwrap()
        ))));
        d.process_line("workspace>>Code", Instant::now());
        assert_eq!(launched(&d), vec!["new-rule"]);
        assert_eq!(d.status().rule_count, 1);
    }

    #[test]
    fn reload_forgets_debounce_of_removed_rules() {
        let mut d = daemon_with(RULES);
        let t0 = Instant::now();
        let line = "openwindow>>0x1,1,spotify,Spotify";
        assert!(d.process_line(line, t0).contains(&"wf_001".to_string()));

        let without = r#"[{ "id": "wf_003", "trigger": { "type": "openwindow" } }]"#;
        d.handle(DaemonMessage::RulesReloaded(Arc::new(
            RuleSet::from_json(without).unwrap(),
        )));
        d.handle(DaemonMessage::RulesReloaded(Arc::new(
            RuleSet::from_json(RULES).unwrap(),
        )));

        let fired = d.process_line(line, t0 + Duration::from_millis(10));
        assert!(fired.contains(&"wf_001".to_string()));
    }

    #[test]
    fn reload_keeps_debounce_of_surviving_rules() {
        let mut d = daemon_with(RULES);
        let t0 = Instant::now();
        let line = "openwindow>>0x1,1,spotify,Spotify";
        assert!(d.process_line(line, t0).contains(&"wf_001".to_string()));

        d.handle(DaemonMessage::RulesReloaded(Arc::new(
            RuleSet::from_json(RULES).unwrap(),
        )));
        let fired = d.process_line(line, t0 + Duration::from_millis(10));
        assert!(!fired.contains(&"wf_001".to_string()));
    }

    #[test]
    fn connection_state_follows_messages() {
        let mut d = daemon_with("[]");
        assert_eq!(d.connection, ConnectionState::Disconnected);
        d.handle(DaemonMessage::Connected);
        assert_eq!(d.connection, ConnectionState::Connected);
        d.handle(DaemonMessage::Disconnected);
        assert_eq!(d.connection, ConnectionState::Disconnected);
    }

    #[test]
    fn status_reply_and_shutdown() {
        let mut d = daemon_with(RULES);
        let (tx, rx) = mpsc::channel();
        assert!(d.handle(DaemonMessage::Status(tx)));
        let status = rx.try_recv().unwrap();
        assert!(status.alive);
        assert_eq!(status.rule_count, 4);
        assert_eq!(status.enabled_rule_count, 3);
        assert!(status.last_reload.is_some());

        assert!(!d.handle(DaemonMessage::Shutdown));
    }

    #[test]
    fn run_processes_messages_in_order_until_shutdown() {
        let mut d = daemon_with(RULES);
        let (tx, rx) = mpsc::channel();
        tx.send(DaemonMessage::Connected).unwrap();
        tx.send(DaemonMessage::Event("workspace>>Code".into())).unwrap();
        tx.send(DaemonMessage::Shutdown).unwrap();
        tx.send(DaemonMessage::Event("workspace>>Code".into())).unwrap();
        d.run(rx);
        assert_eq!(launched(&d), vec!["switch-theme dark"]);
    }
}
