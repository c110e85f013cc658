use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::application::usecases::{DispatchEventUseCase, PreviewRuleUseCase};
use crate::application::{
    ActionExecutor, EngineError, EngineResult, ExecutionLog, ExecutionLogEntry, RoundSource,
    RuleStore, DEFAULT_LOG_CAPACITY,
};
use crate::domain::{Eligibility, FiringTable, LiveEvent, OncePerScope, RuleId, TriggerRule};
use crate::infrastructure::outcome_bus::OutcomeBus;

const DEFAULT_QUEUE_DEPTH: usize = 256;
const DEFAULT_BUS_BUFFER: usize = 64;

pub struct EngineOptions {
    pub rules: Vec<TriggerRule>,
    pub log_capacity: usize,
    pub queue_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rules: vec![],
            log_capacity: DEFAULT_LOG_CAPACITY,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

enum EngineCommand {
    Event(LiveEvent),
    Upsert(TriggerRule, oneshot::Sender<EngineResult<()>>),
    Delete(RuleId, oneshot::Sender<EngineResult<()>>),
    RoundEnded,
    MatchEnded,
    /// Resolves once every command queued before it was handled.
    Barrier(oneshot::Sender<()>),
}

struct EngineShared {
    rules: RwLock<RuleStore>,
    log: RwLock<ExecutionLog>,
}

impl EngineShared {
    fn rules_read(&self) -> RwLockReadGuard<'_, RuleStore> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn rules_write(&self) -> RwLockWriteGuard<'_, RuleStore> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_read(&self) -> RwLockReadGuard<'_, ExecutionLog> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_write(&self) -> RwLockWriteGuard<'_, ExecutionLog> {
        self.log.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The trigger engine: a single-consumer command loop.
///
/// One mpsc queue carries events, boundary notifications and rule
/// mutations; the loop task is the only holder of the dispatch token and of
/// the firing-state table, so two events are never evaluated concurrently
/// and mutations apply only between dispatch cycles. Reads (rule list,
/// recent logs, preview) go straight through the handle and stay responsive
/// while a dispatch or delay row is in flight.
pub struct TriggerEngine;

impl TriggerEngine {
    pub fn spawn(
        executor: Arc<dyn ActionExecutor>,
        rounds: Arc<dyn RoundSource>,
        options: EngineOptions,
    ) -> EngineResult<EngineHandle> {
        let store = RuleStore::with_rules(options.rules)?;
        let shared = Arc::new(EngineShared {
            rules: RwLock::new(store),
            log: RwLock::new(ExecutionLog::with_capacity(options.log_capacity)),
        });
        let bus = OutcomeBus::new(DEFAULT_BUS_BUFFER);
        let (tx, rx) = mpsc::channel(options.queue_depth.max(1));

        let task = EngineTask {
            shared: shared.clone(),
            executor,
            rounds: rounds.clone(),
            bus: bus.clone(),
            states: FiringTable::new(),
        };
        tokio::spawn(task.run(rx));

        Ok(EngineHandle {
            shared,
            tx,
            rounds,
            bus,
        })
    }
}

struct EngineTask {
    shared: Arc<EngineShared>,
    executor: Arc<dyn ActionExecutor>,
    rounds: Arc<dyn RoundSource>,
    bus: OutcomeBus,
    states: FiringTable,
}

impl EngineTask {
    async fn run(mut self, mut rx: mpsc::Receiver<EngineCommand>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                EngineCommand::Event(event) => self.dispatch(event).await,
                EngineCommand::Upsert(rule, ack) => {
                    let result = self.shared.rules_write().upsert(rule);
                    let _ = ack.send(result);
                }
                EngineCommand::Delete(id, ack) => {
                    let result = self.shared.rules_write().remove(&id).map(|_| ());
                    if result.is_ok() {
                        self.states.remove(&id);
                    }
                    let _ = ack.send(result);
                }
                EngineCommand::RoundEnded => {
                    tracing::info!("round ended, resetting once-per-round flags");
                    self.states.reset_scope(OncePerScope::Round);
                }
                EngineCommand::MatchEnded => {
                    // A match boundary is also a round boundary.
                    tracing::info!("match ended, resetting once-per flags");
                    self.states.reset_scope(OncePerScope::Match);
                    self.states.reset_scope(OncePerScope::Round);
                }
                EngineCommand::Barrier(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        tracing::debug!("engine loop stopped, all handles dropped");
    }

    async fn dispatch(&mut self, event: LiveEvent) {
        let snapshot = self.shared.rules_read().list();
        let usecase = DispatchEventUseCase {
            executor: self.executor.as_ref(),
            current_round: self.rounds.current_round(),
        };

        let shared = &self.shared;
        let bus = &self.bus;
        let mut sink = |entry: ExecutionLogEntry| {
            shared.log_write().append(entry.clone());
            bus.publish(entry);
        };
        usecase
            .execute(&event, &snapshot, &mut self.states, &mut sink)
            .await;
    }
}

/// Cheap-to-clone facade held by the authoring/UI layer and the event feed.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
    tx: mpsc::Sender<EngineCommand>,
    rounds: Arc<dyn RoundSource>,
    bus: OutcomeBus,
}

impl EngineHandle {
    /// Rules in firing order, a read snapshot.
    pub fn list_rules(&self) -> Vec<TriggerRule> {
        self.shared.rules_read().list()
    }

    pub fn get_rule(&self, id: &RuleId) -> EngineResult<TriggerRule> {
        self.shared.rules_read().get(id)
    }

    /// Queued behind any in-flight dispatch; applied between events.
    pub async fn upsert_rule(&self, rule: TriggerRule) -> EngineResult<()> {
        // Reject malformed rules up front so the caller gets the error even
        // while a long dispatch is running.
        rule.validate()?;
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Upsert(rule, ack_tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        ack_rx.await.map_err(|_| EngineError::Closed)?
    }

    pub async fn delete_rule(&self, id: RuleId) -> EngineResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Delete(id, ack_tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        ack_rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Enqueue one inbound event; processed strictly in arrival order.
    pub async fn submit_event(&self, event: LiveEvent) -> EngineResult<()> {
        self.tx
            .send(EngineCommand::Event(event))
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub async fn round_ended(&self) -> EngineResult<()> {
        self.tx
            .send(EngineCommand::RoundEnded)
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub async fn match_ended(&self) -> EngineResult<()> {
        self.tx
            .send(EngineCommand::MatchEnded)
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub fn recent_logs(&self, max: usize) -> Vec<ExecutionLogEntry> {
        self.shared.log_read().recent(max)
    }

    /// Evaluate-only "Test rule": no executor call, no log entry, no firing
    /// state involved.
    pub fn preview(&self, rule: &TriggerRule, event: &LiveEvent) -> Eligibility {
        let usecase = PreviewRuleUseCase {
            rounds: self.rounds.as_ref(),
        };
        usecase.execute(rule, event)
    }

    pub fn current_round(&self) -> u32 {
        self.rounds.current_round()
    }

    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<ExecutionLogEntry> {
        self.bus.subscribe()
    }

    /// Waits until every command queued before the call has been handled.
    pub async fn flush(&self) -> EngineResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Barrier(ack_tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        ack_rx.await.map_err(|_| EngineError::Closed)
    }
}
