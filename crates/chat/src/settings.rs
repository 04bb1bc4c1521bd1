use std::fmt;
use std::path::PathBuf;

use folio_llm::{
    DEFAULT_GEMINI_MODEL, DEFAULT_THINKING_BUDGET, ModelConfig, ProviderConfig,
    RIG_GEMINI_PROVIDER_ID,
};
use serde::{Deserialize, Serialize};

use crate::error::ChatResult;
use crate::prompt::PromptComposer;

/// Chat section of the application settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider base URL; blank means the provider default.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
    #[serde(default)]
    pub preamble_file: Option<PathBuf>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: String::new(),
            endpoint: String::new(),
            model: default_model(),
            thinking_budget: default_thinking_budget(),
            preamble_file: None,
        }
    }
}

impl fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSettings")
            .field("provider_id", &self.provider_id)
            .field("api_key", &redacted(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("thinking_budget", &self.thinking_budget)
            .field("preamble_file", &self.preamble_file)
            .finish()
    }
}

impl ChatSettings {
    pub fn normalized(mut self) -> Self {
        self.provider_id = non_blank_or(self.provider_id, default_provider_id);
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = self.endpoint.trim().to_string();
        self.model = non_blank_or(self.model, default_model);
        self.preamble_file = self
            .preamble_file
            .filter(|path| !path.as_os_str().is_empty());
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.provider_id, &self.api_key, &self.endpoint)
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(&self.model).with_thinking_budget(self.thinking_budget)
    }

    /// Builds the composer, reading the preamble override when one is set.
    pub fn composer(&self) -> ChatResult<PromptComposer> {
        match &self.preamble_file {
            Some(path) => PromptComposer::from_file(path),
            None => Ok(PromptComposer::default()),
        }
    }
}

/// Masks a secret for display, keeping only whether it is set.
pub fn redacted(secret: &str) -> &'static str {
    if secret.trim().is_empty() {
        "<unset>"
    } else {
        "[REDACTED]"
    }
}

fn non_blank_or(value: String, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_provider_id() -> String {
    RIG_GEMINI_PROVIDER_ID.to_string()
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_thinking_budget() -> u32 {
    DEFAULT_THINKING_BUDGET
}
