use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;

use crate::state::DEFAULT_MAX_ACTIVITY;

/// Complete hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
}

/// HTTP/WebSocket listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8081".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Observer fan-out configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Frames queued per observer before it is dropped as too slow
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
}

fn default_observer_buffer() -> usize {
    256
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            observer_buffer: default_observer_buffer(),
        }
    }
}

/// Activity log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ACTIVITY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Chat dispatch configuration.
///
/// The reply dependency is run as `command args... <message>`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Agent whose thinking/action state reflects chat handling
    #[serde(default = "default_assistant_agent")]
    pub assistant_agent: String,
    #[serde(default = "default_chat_command")]
    pub command: String,
    #[serde(default = "default_chat_args")]
    pub args: Vec<String>,
    #[serde(default = "default_chat_timeout")]
    pub timeout_seconds: u64,
}

fn default_assistant_agent() -> String {
    "itombot".to_string()
}

fn default_chat_command() -> String {
    "openclaw".to_string()
}

fn default_chat_args() -> Vec<String> {
    ["sessions", "send", "--timeout", "120", "--message"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_chat_timeout() -> u64 {
    130
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            assistant_agent: default_assistant_agent(),
            command: default_chat_command(),
            args: default_chat_args(),
            timeout_seconds: default_chat_timeout(),
        }
    }
}

/// One declared agent
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub id: String,
    #[serde(default)]
    pub floor: i32,
}

fn default_agents() -> Vec<AgentConfig> {
    [
        ("tom", 5),
        ("itombot", 4),
        ("research", 3),
        ("marketing", 2),
        ("support", 1),
    ]
    .iter()
    .map(|(id, floor)| AgentConfig {
        id: id.to_string(),
        floor: *floor,
    })
    .collect()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            broadcast: BroadcastConfig::default(),
            history: HistoryConfig::default(),
            chat: ChatConfig::default(),
            agents: default_agents(),
        }
    }
}

impl HubConfig {
    /// Load from `AGENT_HUB_CONFIG` (if set), apply env overrides, validate.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("AGENT_HUB_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `AGENT_HUB_*` overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AGENT_HUB_BIND") {
            if !v.is_empty() {
                self.server.bind_address = v;
            }
        }
        if let Some(v) = lookup("AGENT_HUB_CHAT_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                self.chat.timeout_seconds = n;
            }
        }
        if let Some(v) = lookup("AGENT_HUB_CHAT_COMMAND") {
            if !v.is_empty() {
                self.chat.command = v;
            }
        }
    }

    /// Reject configurations the hub cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            bail!("at least one agent must be declared");
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.is_empty() {
                bail!("agent id must not be empty");
            }
            if !seen.insert(agent.id.as_str()) {
                bail!("duplicate agent id '{}'", agent.id);
            }
        }

        if !seen.contains(self.chat.assistant_agent.as_str()) {
            bail!(
                "assistant agent '{}' is not a declared agent",
                self.chat.assistant_agent
            );
        }
        if self.history.max_entries == 0 {
            bail!("history.max_entries must be at least 1");
        }
        if self.broadcast.observer_buffer == 0 {
            bail!("broadcast.observer_buffer must be at least 1");
        }
        if self.chat.timeout_seconds == 0 {
            bail!("chat.timeout_seconds must be at least 1");
        }

        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<HubConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path))?;
    let config: HubConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path))?;
    Ok(config)
}
