use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::application::{ActionExecutor, ActionRequest, EngineError, EngineResult};
use crate::domain::{ConnectionRef, RuleAction};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts actions to a broadcast-control bridge (the process that owns the
/// OBS-style websocket sessions), one base URL per named connection. The
/// call timeout lives here, not in the dispatcher: a hung bridge call only
/// stalls the in-flight event's remaining candidates.
pub struct HttpActionExecutor {
    client: reqwest::Client,
    connections: HashMap<ConnectionRef, String>,
    default_connection: ConnectionRef,
}

impl HttpActionExecutor {
    pub fn new(
        connections: HashMap<ConnectionRef, String>,
        default_connection: ConnectionRef,
    ) -> EngineResult<Self> {
        if !connections.contains_key(&default_connection) {
            return Err(EngineError::Config(format!(
                "default connection '{default_connection}' has no configured url"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Executor(e.to_string()))?;
        Ok(Self {
            client,
            connections,
            default_connection,
        })
    }

    fn base_url(&self, connection: &Option<ConnectionRef>) -> EngineResult<&str> {
        let name = connection.as_ref().unwrap_or(&self.default_connection);
        self.connections
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| EngineError::Executor(format!("unknown connection '{name}'")))
    }
}

#[derive(Debug, Serialize)]
struct BridgeCommand<'a> {
    op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<&'a str>,
    event_type: &'a str,
    context: &'a Map<String, Value>,
}

impl<'a> BridgeCommand<'a> {
    fn from_request(request: &'a ActionRequest) -> Option<Self> {
        let (op, scene, overlay) = match &request.action {
            RuleAction::SceneChange { scene } => ("scene.change", Some(scene.0.as_str()), None),
            RuleAction::OverlayShow { overlay } => {
                ("overlay.show", None, Some(overlay.0.as_str()))
            }
            RuleAction::RecordingStart => ("recording.start", None, None),
            RuleAction::RecordingStop => ("recording.stop", None, None),
            RuleAction::ReplaySave => ("replay.save", None, None),
            // Delay rows never reach the executor.
            RuleAction::Delay { .. } => return None,
        };
        Some(Self {
            op,
            scene,
            overlay,
            event_type: &request.event_type,
            context: &request.context,
        })
    }
}

#[async_trait]
impl ActionExecutor for HttpActionExecutor {
    async fn execute(&self, request: &ActionRequest) -> EngineResult<()> {
        let Some(command) = BridgeCommand::from_request(request) else {
            return Err(EngineError::Executor(
                "delay rows are not executable".into(),
            ));
        };
        let base = self.base_url(&request.connection)?;
        let url = format!("{}/commands", base.trim_end_matches('/'));

        self.client
            .post(&url)
            .json(&command)
            .send()
            .await
            .map_err(|e| EngineError::Executor(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::Executor(e.to_string()))?;

        Ok(())
    }
}
