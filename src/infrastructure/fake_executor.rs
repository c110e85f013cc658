use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::application::{ActionExecutor, ActionRequest, EngineError, EngineResult};
use crate::domain::RuleId;

/// One recorded executor call, with enough timing to assert on sequencing.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub rule_id: RuleId,
    pub action_kind: &'static str,
    pub event_type: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct Inner {
    calls: Vec<RecordedCall>,
    fail_rules: HashSet<RuleId>,
    in_flight: usize,
    overlapped: bool,
}

/// Test double: records every call, can be told to fail for specific rules,
/// and notices if two calls ever overlap (which the dispatcher must never
/// allow within one event).
#[derive(Clone, Default)]
pub struct FakeActionExecutor {
    inner: Arc<Mutex<Inner>>,
}

impl FakeActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, id: RuleId) {
        self.inner.lock().unwrap().fail_rules.insert(id);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn saw_overlap(&self) -> bool {
        self.inner.lock().unwrap().overlapped
    }
}

#[async_trait]
impl ActionExecutor for FakeActionExecutor {
    async fn execute(&self, request: &ActionRequest) -> EngineResult<()> {
        let started = Instant::now();
        let should_fail;
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.in_flight > 0 {
                inner.overlapped = true;
            }
            inner.in_flight += 1;
            should_fail = inner.fail_rules.contains(&request.rule_id);
        }

        // Yield so that an incorrectly concurrent dispatcher would actually
        // interleave here and trip the overlap flag.
        tokio::task::yield_now().await;

        let finished = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.in_flight -= 1;
        inner.calls.push(RecordedCall {
            rule_id: request.rule_id.clone(),
            action_kind: request.action.kind_name(),
            event_type: request.event_type.clone(),
            started,
            finished,
        });

        if should_fail {
            Err(EngineError::Executor(format!(
                "scripted failure for rule {}",
                request.rule_id
            )))
        } else {
            Ok(())
        }
    }
}
