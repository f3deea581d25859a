//! Per-rule debounce windows.
//!
//! A rule with `trigger.debounce = N` fires at most once every `N`
//! milliseconds.  Only a full match (trigger type plus every condition)
//! records a fire; an event that fails a condition leaves the window
//! untouched.

use crate::rules::RuleSet;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Last-fire timestamps keyed by rule id.
///
/// Lives on the event-processing thread only, so no locking is needed.
#[derive(Debug, Default)]
pub struct DebounceGate {
    last_fire: HashMap<String, Instant>,
}

impl DebounceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `rule_id` fires at `now`.
    ///
    /// `full_match` is evaluated only while the window is open, and the
    /// fire is recorded only if it returns `true`.
    pub fn should_fire(
        &mut self,
        rule_id: &str,
        debounce_ms: Option<u64>,
        now: Instant,
        full_match: impl FnOnce() -> bool,
    ) -> bool {
        if !self.is_open(rule_id, debounce_ms, now) {
            debug!("rule {:?} debounced", rule_id);
            return false;
        }
        if !full_match() {
            return false;
        }
        self.record(rule_id, debounce_ms, now);
        true
    }

    /// Forget rules that are no longer in `rules`.
    pub fn retain_rules(&mut self, rules: &RuleSet) {
        let live: HashSet<&str> = rules.rules().iter().map(|r| r.id.as_str()).collect();
        self.last_fire.retain(|id, _| live.contains(id.as_str()));
    }

    fn is_open(&self, rule_id: &str, debounce_ms: Option<u64>, now: Instant) -> bool {
        let window = match debounce_ms {
            None | Some(0) => return true,
            Some(ms) => Duration::from_millis(ms),
        };
        match self.last_fire.get(rule_id) {
            None => true,
            Some(&last) => now.saturating_duration_since(last) >= window,
        }
    }

    fn record(&mut self, rule_id: &str, debounce_ms: Option<u64>, now: Instant) {
        if matches!(debounce_ms, None | Some(0)) {
            return;
        }
        self.last_fire.insert(rule_id.to_string(), now);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.last_fire.len()
    }
}
