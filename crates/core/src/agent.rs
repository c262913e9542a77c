//! Agent run configuration.

use serde::{Deserialize, Serialize};

/// Default cap on oracle calls per run.
pub const DEFAULT_MAX_TURNS: u32 = 20;

/// Everything one agent run needs to know, passed explicitly to the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model name sent with every oracle call
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temp")]
    pub temperature: f32,

    /// Max tokens per oracle response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Maximum oracle calls before the run is reported as exhausted
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Prepended as the first transcript turn when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Per tool call timeout; `None` waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,
}

fn default_temp() -> f32 {
    0.7
}
fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temp(),
            max_tokens: None,
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: None,
            tool_timeout_secs: None,
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}
