use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{ConnectionRef, LiveEvent, RuleAction, RuleId, SuppressReason, TriggerRule};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid rule config: {0}")]
    Config(String),
    #[error("rule not found: {0}")]
    NotFound(RuleId),
    #[error("executor error: {0}")]
    Executor(String),
    #[error("engine closed")]
    Closed,
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<crate::domain::RuleConfigError> for EngineError {
    fn from(e: crate::domain::RuleConfigError) -> Self {
        EngineError::Config(e.to_string())
    }
}

/// Everything the executor needs to perform one action: what to do, where,
/// and the untouched payload of the event that triggered it.
#[derive(Clone, Debug, Serialize)]
pub struct ActionRequest {
    pub rule_id: RuleId,
    pub action: RuleAction,
    /// None = adapter's default connection.
    pub connection: Option<ConnectionRef>,
    pub event_type: String,
    pub context: Map<String, Value>,
}

impl ActionRequest {
    pub fn for_rule(rule: &TriggerRule, event: &LiveEvent) -> Self {
        Self {
            rule_id: rule.id.clone(),
            action: rule.action.clone(),
            connection: rule.connection.clone(),
            event_type: event.event_type.clone(),
            context: event.payload.clone(),
        }
    }
}

/// Perform scene/overlay/recording operations against the broadcast system.
/// Call timeouts are the adapter's responsibility, not the dispatcher's.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ActionRequest) -> EngineResult<()>;
}

/// Supplies the current round number (monotonic within a match, reset to 1
/// at match start). Boundary notifications travel separately, through the
/// engine handle.
pub trait RoundSource: Send + Sync {
    fn current_round(&self) -> u32;
}

/// Terminal result of one firing attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { reason: String },
    Suppressed { reason: SuppressReason },
}

/// One row of the audit log. Immutable after append.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule_id: RuleId,
    pub event_type: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub latency_ms: u64,
}
