pub mod engine;
pub mod outcome_bus;
pub mod console_executor;
pub mod http_executor;
pub mod fake_executor;
pub mod round_source;
