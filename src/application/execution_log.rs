use std::collections::VecDeque;

use crate::application::ExecutionLogEntry;

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Bounded FIFO of recent firing attempts. Append-only from the engine's
/// side; oldest entry evicted first; reads are newest-first.
#[derive(Debug)]
pub struct ExecutionLog {
    entries: VecDeque<ExecutionLogEntry>,
    capacity: usize,
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ExecutionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&mut self, entry: ExecutionLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Most recent `max` entries, newest first.
    pub fn recent(&self, max: usize) -> Vec<ExecutionLogEntry> {
        self.entries.iter().rev().take(max).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Outcome;
    use crate::domain::RuleId;

    fn entry(n: u64) -> ExecutionLogEntry {
        ExecutionLogEntry {
            timestamp: chrono::Utc::now(),
            rule_id: RuleId::new(format!("r{n}")),
            event_type: "point".into(),
            outcome: Outcome::Success,
            latency_ms: n,
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut log = ExecutionLog::with_capacity(3);
        for n in 0..5 {
            log.append(entry(n));
        }
        let recent = log.recent(10);
        assert_eq!(recent.len(), 3);
        let ids: Vec<&str> = recent.iter().map(|e| e.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["r4", "r3", "r2"]);
    }

    #[test]
    fn recent_is_newest_first_and_capped() {
        let mut log = ExecutionLog::default();
        for n in 0..4 {
            log.append(entry(n));
        }
        let recent = log.recent(2);
        assert_eq!(recent[0].rule_id, RuleId::new("r3"));
        assert_eq!(recent[1].rule_id, RuleId::new("r2"));
    }
}
