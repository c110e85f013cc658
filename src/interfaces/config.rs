use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{
    ConnectionRef, OncePerScope, OverlayRef, RuleAction, RuleConditions, RuleId, SceneRef,
    TriggerRule,
};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Bearer token for the authoring API; unset disables auth.
    pub api_token: Option<String>,
    pub log_capacity: Option<usize>,
    pub queue_depth: Option<usize>,
    #[serde(default = "default_connection_name")]
    pub default_connection: String,
    /// connection name -> bridge base url
    #[serde(default)]
    pub connections: HashMap<String, String>,
    #[serde(default)]
    pub rules: Vec<RuleCfg>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_connection_name() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RuleCfg {
    /// Assigned on creation when omitted.
    pub id: Option<String>,
    pub event: String,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
    pub connection: Option<String>,
    pub round: Option<u32>,
    pub once_per: Option<OncePerScope>,
    pub debounce_ms: Option<u64>,
    pub cooldown_ms: Option<u64>,
    #[serde(flatten)]
    pub action: ActionCfg,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionCfg {
    SceneChange { scene: String },
    OverlayShow { overlay: String },
    RecordingStart {},
    RecordingStop {},
    ReplaySave {},
    Delay { wait_ms: u64 },
}

impl Config {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let raw = expand_env(&raw);
        let cfg: Config = serde_yaml::from_str(&raw)?;
        Ok(cfg)
    }

    pub fn to_rules(&self) -> anyhow::Result<Vec<TriggerRule>> {
        let mut out = Vec::new();

        for cfg in &self.rules {
            let action = match &cfg.action {
                ActionCfg::SceneChange { scene } => RuleAction::SceneChange {
                    scene: SceneRef(scene.clone()),
                },
                ActionCfg::OverlayShow { overlay } => RuleAction::OverlayShow {
                    overlay: OverlayRef(overlay.clone()),
                },
                ActionCfg::RecordingStart {} => RuleAction::RecordingStart,
                ActionCfg::RecordingStop {} => RuleAction::RecordingStop,
                ActionCfg::ReplaySave {} => RuleAction::ReplaySave,
                ActionCfg::Delay { wait_ms } => RuleAction::Delay { wait_ms: *wait_ms },
            };

            let rule = TriggerRule {
                id: RuleId::new(
                    cfg.id
                        .clone()
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                ),
                event_type: cfg.event.clone(),
                action,
                connection: cfg.connection.clone().map(ConnectionRef),
                priority: cfg.priority.unwrap_or(0),
                enabled: cfg.enabled.unwrap_or(true),
                conditions: RuleConditions {
                    round: cfg.round,
                    once_per: cfg.once_per,
                    debounce_ms: cfg.debounce_ms,
                    cooldown_ms: cfg.cooldown_ms,
                },
            };
            rule.validate()?;
            out.push(rule);
        }
        Ok(out)
    }

    pub fn connection_urls(&self) -> HashMap<ConnectionRef, String> {
        self.connections
            .iter()
            .map(|(name, url)| (ConnectionRef(name.clone()), url.clone()))
            .collect()
    }
}

/// very small ${VAR} expansion to keep config simple
fn expand_env(s: &str) -> String {
    let mut out = s.to_string();
    for (k, v) in std::env::vars() {
        out = out.replace(&format!("${{{}}}", k), &v);
    }
    out
}
