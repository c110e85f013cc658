pub mod ports;
pub mod rule_store;
pub mod execution_log;
pub mod usecases;

pub use ports::*;
pub use rule_store::RuleStore;
pub use execution_log::{ExecutionLog, DEFAULT_LOG_CAPACITY};
