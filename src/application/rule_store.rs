use crate::application::{EngineError, EngineResult};
use crate::domain::{RuleId, TriggerRule};

/// Ordered set of trigger rules. Pure data: no locks, no side effects; the
/// engine loop serializes every mutation (spec of ownership lives there).
///
/// `list()` order is (priority asc, creation order asc) and is the firing
/// order. Replacing a rule via upsert keeps its original creation slot so
/// an edit cannot silently reshuffle ties.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: Vec<StoredRule>,
    next_seq: u64,
}

#[derive(Clone, Debug)]
struct StoredRule {
    rule: TriggerRule,
    seq: u64,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<TriggerRule>) -> EngineResult<Self> {
        let mut store = Self::new();
        for rule in rules {
            store.upsert(rule)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in firing order: priority ascending, ties by creation order.
    pub fn list(&self) -> Vec<TriggerRule> {
        let mut ordered: Vec<&StoredRule> = self.rules.iter().collect();
        ordered.sort_by_key(|s| (s.rule.priority, s.seq));
        ordered.into_iter().map(|s| s.rule.clone()).collect()
    }

    pub fn get(&self, id: &RuleId) -> EngineResult<TriggerRule> {
        self.rules
            .iter()
            .find(|s| &s.rule.id == id)
            .map(|s| s.rule.clone())
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    /// Validates and inserts or replaces. Id uniqueness is the store's
    /// invariant: a matching id always replaces in place.
    pub fn upsert(&mut self, rule: TriggerRule) -> EngineResult<()> {
        rule.validate()?;
        match self.rules.iter_mut().find(|s| s.rule.id == rule.id) {
            Some(existing) => existing.rule = rule,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.rules.push(StoredRule { rule, seq });
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &RuleId) -> EngineResult<TriggerRule> {
        let idx = self
            .rules
            .iter()
            .position(|s| &s.rule.id == id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        Ok(self.rules.remove(idx).rule)
    }
}
