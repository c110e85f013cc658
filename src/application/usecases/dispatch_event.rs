use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::application::{ActionExecutor, ActionRequest, ExecutionLogEntry, Outcome};
use crate::domain::{evaluate, Eligibility, FiringTable, LiveEvent, RuleAction, TriggerRule};

/// One candidate produced by the Collecting phase.
struct Candidate {
    rule: TriggerRule,
    verdict: Eligibility,
}

/// Runs one event through Collect -> Order -> Dispatch.
///
/// The rule snapshot is taken by the caller (the engine loop) and is already
/// in firing order, so Ordering is implicit here. Dispatch is strictly
/// sequential: a candidate's executor call must return before the next one
/// starts, and delay rows suspend the walk without blocking the caller's
/// other work.
pub struct DispatchEventUseCase<'a> {
    pub executor: &'a dyn ActionExecutor,
    pub current_round: u32,
}

impl<'a> DispatchEventUseCase<'a> {
    pub async fn execute(
        &self,
        event: &LiveEvent,
        rules: &[TriggerRule],
        states: &mut FiringTable,
        sink: &mut (dyn FnMut(ExecutionLogEntry) + Send),
    ) {
        // Collecting: disabled rules and non-matching event types are not
        // candidates at all; everything else is annotated with a verdict.
        let now = Instant::now();
        let mut candidates = Vec::new();
        for rule in rules {
            if !rule.enabled || rule.event_type != event.event_type {
                continue;
            }
            let verdict = evaluate(rule, event, self.current_round, &states.get(&rule.id), now);
            candidates.push(Candidate {
                rule: rule.clone(),
                verdict,
            });
        }

        // Dispatching: suppressed candidates only get a log entry; eligible
        // ones run in snapshot order, failures never block siblings.
        for candidate in candidates {
            match candidate.verdict {
                Eligibility::Suppressed { reason } => {
                    tracing::debug!(
                        rule = %candidate.rule.id,
                        event_type = %event.event_type,
                        %reason,
                        "rule suppressed"
                    );
                    sink(log_entry(
                        &candidate.rule,
                        event,
                        Outcome::Suppressed { reason },
                        0,
                    ));
                }
                Eligibility::Eligible => {
                    if let RuleAction::Delay { wait_ms } = candidate.rule.action {
                        tracing::debug!(rule = %candidate.rule.id, wait_ms, "delay step");
                        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                        continue;
                    }
                    self.fire(&candidate.rule, event, states, sink).await;
                }
            }
        }
    }

    async fn fire(
        &self,
        rule: &TriggerRule,
        event: &LiveEvent,
        states: &mut FiringTable,
        sink: &mut (dyn FnMut(ExecutionLogEntry) + Send),
    ) {
        let request = ActionRequest::for_rule(rule, event);
        let started = Instant::now();
        states.record_attempt(&rule.id, started);

        let result = self.executor.execute(&request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                states.record_success(&rule.id, rule.conditions.once_per, Instant::now());
                tracing::info!(
                    rule = %rule.id,
                    action = rule.action.kind_name(),
                    event_type = %event.event_type,
                    latency_ms,
                    "action fired"
                );
                sink(log_entry(rule, event, Outcome::Success, latency_ms));
            }
            Err(e) => {
                tracing::warn!(
                    rule = %rule.id,
                    action = rule.action.kind_name(),
                    event_type = %event.event_type,
                    error = %e,
                    "action failed"
                );
                sink(log_entry(
                    rule,
                    event,
                    Outcome::Failure {
                        reason: e.to_string(),
                    },
                    latency_ms,
                ));
            }
        }
    }
}

fn log_entry(
    rule: &TriggerRule,
    event: &LiveEvent,
    outcome: Outcome,
    latency_ms: u64,
) -> ExecutionLogEntry {
    ExecutionLogEntry {
        timestamp: Utc::now(),
        rule_id: rule.id.clone(),
        event_type: event.event_type.clone(),
        outcome,
        latency_ms,
    }
}
