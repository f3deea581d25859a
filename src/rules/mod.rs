//! Automation rules and the JSON document they are stored in.
//!
//! The rule document is a JSON array written by the rule editor:
//!
//! ```json
//! [
//!   {
//!     "id": "wf_001",
//!     "name": "Auto-move Spotify to workspace 5",
//!     "enabled": true,
//!     "trigger": { "type": "openwindow", "debounce": 100 },
//!     "conditions": [
//!       { "property": "class", "operator": "equals", "value": "spotify" }
//!     ],
//!     "actions": [
//!       { "command": "hyprctl dispatch movetoworkspace 5" }
//!     ]
//!   }
//! ]
//! ```
//!
//! `enabled`, `conditions`, `actions` and `trigger.debounce` are optional.

pub mod store;
pub mod watcher;

use crate::event;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// A single automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Human-readable label for log lines.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// The event type that activates a rule, with an optional debounce window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: String,
    /// Minimum time between two fires of the rule, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce: Option<u64>,
}

/// A predicate over one event property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub property: String,
    pub operator: Operator,
    pub value: String,
}

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Greater,
    Less,
}

/// A shell command line run when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub command: String,
}

/// An immutable, ordered set of rules.
///
/// Shared as `Arc<RuleSet>`; a reload builds a new set and swaps the
/// pointer, it never mutates one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

/// Error from reading or validating a rule document.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);

impl RuleSet {
    /// Build a set from already parsed rules, rejecting duplicate ids.
    pub fn new(rules: Vec<Rule>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ConfigError(format!("duplicate rule id {:?}", rule.id)));
            }
            if !event::is_supported(&rule.trigger.kind) {
                warn!(
                    "rule {:?} triggers on unsupported event type {:?}; it will never match",
                    rule.id, rule.trigger.kind
                );
            }
        }
        Ok(Self { rules })
    }

    /// Parse a rule document from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let rules: Vec<Rule> =
            serde_json::from_str(json).map_err(|e| ConfigError(format!("invalid rules: {}", e)))?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }
}

/// Load the rule document at `path` into a fresh snapshot.
pub fn load(path: &Path) -> Result<Arc<RuleSet>, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
    let set = RuleSet::from_json(&contents)
        .map_err(|e| ConfigError(format!("{}: {}", path.display(), e.0)))?;
    Ok(Arc::new(set))
}

/// The document written when no rule file exists yet.
pub fn default_rules() -> Vec<Rule> {
    vec![Rule {
        id: "wf_001".into(),
        name: "Auto-move Spotify to workspace 5".into(),
        enabled: true,
        trigger: Trigger {
            kind: "openwindow".into(),
            debounce: Some(100),
        },
        conditions: vec![Condition {
            property: "class".into(),
            operator: Operator::Equals,
            value: "spotify".into(),
        }],
        actions: vec![Action {
            command: "hyprctl dispatch movetoworkspace 5".into(),
        }],
    }]
}

/// Write the default rule document to `path` unless something is already
/// there.  Returns `true` if a file was created.
pub fn write_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| ConfigError(format!("failed to create {}: {}", dir.display(), e)))?;
    }
    let json = serde_json::to_string_pretty(&default_rules())
        .map_err(|e| ConfigError(format!("failed to encode default rules: {}", e)))?;
    std::fs::write(path, json)
        .map_err(|e| ConfigError(format!("failed to write {}: {}", path.display(), e)))?;
    Ok(true)
}
