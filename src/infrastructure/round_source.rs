use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::application::RoundSource;

/// Round counter shared with the host: the match tracker bumps it, the
/// engine reads it during evaluation. Starts at round 1.
#[derive(Clone)]
pub struct SharedRoundSource {
    round: Arc<AtomicU32>,
}

impl Default for SharedRoundSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRoundSource {
    pub fn new() -> Self {
        Self {
            round: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn set(&self, round: u32) {
        self.round.store(round, Ordering::SeqCst);
    }

    pub fn advance(&self) -> u32 {
        self.round.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Back to round 1 at match start.
    pub fn reset(&self) {
        self.set(1);
    }
}

impl RoundSource for SharedRoundSource {
    fn current_round(&self) -> u32 {
        self.round.load(Ordering::SeqCst)
    }
}
