use tokio::time::Instant;

use crate::application::RoundSource;
use crate::domain::{evaluate, Eligibility, FiringState, LiveEvent, TriggerRule};

/// Authoring-time "Test" action: answers whether the supplied rule (stored
/// or not) would match a synthetic event as configured. Never invokes the
/// executor, never appends to the log, never touches firing state.
pub struct PreviewRuleUseCase<'a> {
    pub rounds: &'a dyn RoundSource,
}

impl<'a> PreviewRuleUseCase<'a> {
    pub fn execute(&self, rule: &TriggerRule, event: &LiveEvent) -> Eligibility {
        evaluate(
            rule,
            event,
            self.rounds.current_round(),
            &FiringState::default(),
            Instant::now(),
        )
    }
}
