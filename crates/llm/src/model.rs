pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// A thinking budget of zero disables extended reasoning.
pub const DEFAULT_THINKING_BUDGET: u32 = 0;

/// Fixed configuration a backend handle is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub model_id: String,
    pub thinking_budget: u32,
}

impl ModelConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into().trim().to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
        }
    }

    pub fn with_thinking_budget(mut self, thinking_budget: u32) -> Self {
        self.thinking_budget = thinking_budget;
        self
    }

    pub fn reasoning_enabled(&self) -> bool {
        self.thinking_budget > 0
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GEMINI_MODEL)
    }
}
