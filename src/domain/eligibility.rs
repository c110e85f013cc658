use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{LiveEvent, OncePerScope, RuleId, TriggerRule};

/// Why a rule did not fire. Each gate in the evaluation order has its own
/// reason so the log can tell them apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    Disabled,
    EventTypeMismatch,
    RoundFilter,
    OncePerRound,
    OncePerMatch,
    Debounce,
    Cooldown,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuppressReason::Disabled => "disabled",
            SuppressReason::EventTypeMismatch => "event_type_mismatch",
            SuppressReason::RoundFilter => "round_filter",
            SuppressReason::OncePerRound => "once_per_round",
            SuppressReason::OncePerMatch => "once_per_match",
            SuppressReason::Debounce => "debounce",
            SuppressReason::Cooldown => "cooldown",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    Suppressed { reason: SuppressReason },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Engine-private transient state for one rule. Authoring never sees this;
/// it survives rule edits (keyed by id) and is dropped with the rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct FiringState {
    /// Last time the executor was actually invoked for this rule,
    /// regardless of outcome. Arms debounce.
    pub last_attempt: Option<Instant>,
    /// Last confirmed success. Arms cooldown.
    pub last_success: Option<Instant>,
    pub fired_this_round: bool,
    pub fired_this_match: bool,
}

/// Side table of firing state, keyed by rule id.
#[derive(Debug, Default)]
pub struct FiringTable {
    states: HashMap<RuleId, FiringState>,
}

impl FiringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &RuleId) -> FiringState {
        self.states.get(id).copied().unwrap_or_default()
    }

    pub fn record_attempt(&mut self, id: &RuleId, now: Instant) {
        self.states.entry(id.clone()).or_default().last_attempt = Some(now);
    }

    pub fn record_success(&mut self, id: &RuleId, scope: Option<OncePerScope>, now: Instant) {
        let state = self.states.entry(id.clone()).or_default();
        state.last_success = Some(now);
        match scope {
            Some(OncePerScope::Round) => state.fired_this_round = true,
            Some(OncePerScope::Match) => state.fired_this_match = true,
            None => {}
        }
    }

    /// Clears all once-per flags of the given scope, for every rule at once.
    /// Invoked exactly at the round/match boundary, never partially.
    pub fn reset_scope(&mut self, scope: OncePerScope) {
        for state in self.states.values_mut() {
            match scope {
                OncePerScope::Round => state.fired_this_round = false,
                OncePerScope::Match => state.fired_this_match = false,
            }
        }
    }

    pub fn remove(&mut self, id: &RuleId) {
        self.states.remove(id);
    }
}

/// Decides whether a rule may fire for an event right now. Pure: consults
/// only its arguments, mutates nothing.
///
/// Gates are checked in a fixed order and short-circuit on the first
/// failure: enabled, event type, round filter, once-per flag, debounce,
/// cooldown. Delay rows pass through after the first two gates.
pub fn evaluate(
    rule: &TriggerRule,
    event: &LiveEvent,
    current_round: u32,
    state: &FiringState,
    now: Instant,
) -> Eligibility {
    if !rule.enabled {
        return suppressed(SuppressReason::Disabled);
    }
    if rule.event_type.is_empty() || rule.event_type != event.event_type {
        return suppressed(SuppressReason::EventTypeMismatch);
    }
    if rule.action.is_delay() {
        return Eligibility::Eligible;
    }
    if let Some(round) = rule.conditions.round {
        if round != current_round {
            return suppressed(SuppressReason::RoundFilter);
        }
    }
    match rule.conditions.once_per {
        Some(OncePerScope::Round) if state.fired_this_round => {
            return suppressed(SuppressReason::OncePerRound);
        }
        Some(OncePerScope::Match) if state.fired_this_match => {
            return suppressed(SuppressReason::OncePerMatch);
        }
        _ => {}
    }
    if let (Some(debounce_ms), Some(last_attempt)) =
        (rule.conditions.debounce_ms, state.last_attempt)
    {
        if now.duration_since(last_attempt) < Duration::from_millis(debounce_ms) {
            return suppressed(SuppressReason::Debounce);
        }
    }
    if let (Some(cooldown_ms), Some(last_success)) =
        (rule.conditions.cooldown_ms, state.last_success)
    {
        if now.duration_since(last_success) < Duration::from_millis(cooldown_ms) {
            return suppressed(SuppressReason::Cooldown);
        }
    }
    Eligibility::Eligible
}

fn suppressed(reason: SuppressReason) -> Eligibility {
    Eligibility::Suppressed { reason }
}
