use tokio::sync::broadcast;

use crate::application::ExecutionLogEntry;

/// Live feed of execution log entries for the UI (SSE) and any other
/// observer. Lossy by design: slow subscribers may miss entries and can
/// catch up from the execution log.
#[derive(Clone)]
pub struct OutcomeBus {
    tx: broadcast::Sender<ExecutionLogEntry>,
}

impl OutcomeBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionLogEntry> {
        self.tx.subscribe()
    }

    pub fn publish(&self, entry: ExecutionLogEntry) {
        // ignore lag errors; consumers may miss some entries if slow
        let _ = self.tx.send(entry);
    }
}
