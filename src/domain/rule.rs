use serde::{Deserialize, Serialize};

use super::{ConnectionRef, OncePerScope, OverlayRef, RuleId, SceneRef};

/// What a rule does when it fires. Closed set; each variant carries exactly
/// the target fields it needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    SceneChange { scene: SceneRef },
    OverlayShow { overlay: OverlayRef },
    RecordingStart,
    RecordingStop,
    ReplaySave,
    /// Pipeline pass-through row: wait before dispatching the next row of
    /// the same event. Not an action against the broadcast system.
    Delay { wait_ms: u64 },
}

impl RuleAction {
    pub fn is_delay(&self) -> bool {
        matches!(self, RuleAction::Delay { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RuleAction::SceneChange { .. } => "scene_change",
            RuleAction::OverlayShow { .. } => "overlay_show",
            RuleAction::RecordingStart => "recording_start",
            RuleAction::RecordingStop => "recording_stop",
            RuleAction::ReplaySave => "replay_save",
            RuleAction::Delay { .. } => "delay",
        }
    }
}

/// Timing and scope gates, all optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConditions {
    /// Rule is eligible only when the current round equals this exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    /// At most one successful firing per round/match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub once_per: Option<OncePerScope>,
    /// Minimum gap after the previous *attempt* (success or failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    /// Minimum gap after the previous *successful* firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
}

impl RuleConditions {
    pub fn is_empty(&self) -> bool {
        self.round.is_none()
            && self.once_per.is_none()
            && self.debounce_ms.is_none()
            && self.cooldown_ms.is_none()
    }
}

/// One authored trigger rule. Configuration is immutable from the engine's
/// point of view; transient firing state lives in a side table keyed by `id`
/// (see `domain::eligibility::FiringTable`), never on the rule itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub id: RuleId,
    /// Event category this rule reacts to. An empty string never matches.
    #[serde(default)]
    pub event_type: String,
    pub action: RuleAction,
    /// None = default connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionRef>,
    /// Lower fires first; ties broken by creation order.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: RuleConditions,
}

fn default_enabled() -> bool {
    true
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum RuleConfigError {
    #[error("rule id must not be empty")]
    EmptyId,
    #[error("rule {0}: scene reference must not be empty")]
    EmptyScene(RuleId),
    #[error("rule {0}: overlay reference must not be empty")]
    EmptyOverlay(RuleId),
    #[error("rule {0}: delay must wait a positive number of milliseconds")]
    ZeroDelay(RuleId),
    #[error("rule {0}: delay rows cannot carry conditions")]
    ConditionsOnDelay(RuleId),
    #[error("rule {0}: connection reference must not be empty")]
    EmptyConnection(RuleId),
}

impl TriggerRule {
    /// Upsert-time validation; malformed rules are rejected and never stored.
    pub fn validate(&self) -> Result<(), RuleConfigError> {
        if self.id.is_empty() {
            return Err(RuleConfigError::EmptyId);
        }
        if let Some(conn) = &self.connection {
            if conn.0.is_empty() {
                return Err(RuleConfigError::EmptyConnection(self.id.clone()));
            }
        }
        match &self.action {
            RuleAction::SceneChange { scene } if scene.0.is_empty() => {
                Err(RuleConfigError::EmptyScene(self.id.clone()))
            }
            RuleAction::OverlayShow { overlay } if overlay.0.is_empty() => {
                Err(RuleConfigError::EmptyOverlay(self.id.clone()))
            }
            RuleAction::Delay { wait_ms: 0 } => Err(RuleConfigError::ZeroDelay(self.id.clone())),
            RuleAction::Delay { .. } if !self.conditions.is_empty() => {
                Err(RuleConfigError::ConditionsOnDelay(self.id.clone()))
            }
            _ => Ok(()),
        }
    }
}
