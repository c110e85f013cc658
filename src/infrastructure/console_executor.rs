use async_trait::async_trait;

use crate::application::{ActionExecutor, ActionRequest, EngineResult};

/// Dry-run executor: prints what would be sent to the broadcast system.
pub struct ConsoleActionExecutor;

impl ConsoleActionExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for ConsoleActionExecutor {
    async fn execute(&self, request: &ActionRequest) -> EngineResult<()> {
        println!(
            "EXECUTE: rule={} action={} connection={} event={}",
            request.rule_id,
            request.action.kind_name(),
            request
                .connection
                .as_ref()
                .map(|c| c.0.clone())
                .unwrap_or_else(|| "(default)".into()),
            request.event_type,
        );
        Ok(())
    }
}
