use std::path::Path;
use std::sync::Arc;

use snafu::{ResultExt, ensure};

use crate::error::{ChatResult, EmptyPreambleSnafu, ReadPreambleSnafu};
use crate::message::{Role, Turn};

/// Built-in system preamble with the reference material about the subject.
pub const SYSTEM_PREAMBLE: &str = include_str!("preamble.md");

/// Joins the preamble and the first user text.
pub const PREAMBLE_SEPARATOR: &str = "\n\nUser: ";

/// Outbound payload for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub text: String,
    pub includes_preamble: bool,
}

/// Builds outbound payloads.
///
/// Only the new turn's text is sent; the backend handle keeps the
/// conversation context, so assistant turns are never read here.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    preamble: Arc<str>,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(SYSTEM_PREAMBLE)
    }
}

impl PromptComposer {
    pub fn new(preamble: impl Into<Arc<str>>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }

    /// Loads a replacement preamble from disk.
    pub fn from_file(path: &Path) -> ChatResult<Self> {
        let preamble = std::fs::read_to_string(path).context(ReadPreambleSnafu {
            stage: "read-preamble-file",
            path: path.to_path_buf(),
        })?;
        let preamble = preamble.trim();
        ensure!(
            !preamble.is_empty(),
            EmptyPreambleSnafu {
                stage: "validate-preamble-file",
                path: path.to_path_buf(),
            }
        );

        Ok(Self::new(preamble))
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// True when `history` holds no user turn yet, i.e. the next submission
    /// opens the session.
    pub fn is_first_user_turn(history: &[Turn]) -> bool {
        !history.iter().any(|turn| turn.role == Role::User)
    }

    pub fn compose(
        &self,
        history: &[Turn],
        is_first_user_turn: bool,
        raw_text: &str,
    ) -> ComposedPrompt {
        tracing::trace!(
            prior_turns = history.len(),
            is_first_user_turn,
            "composing outbound payload"
        );

        if !is_first_user_turn {
            return ComposedPrompt {
                text: raw_text.to_string(),
                includes_preamble: false,
            };
        }

        let mut text =
            String::with_capacity(self.preamble.len() + PREAMBLE_SEPARATOR.len() + raw_text.len());
        text.push_str(&self.preamble);
        text.push_str(PREAMBLE_SEPARATOR);
        text.push_str(raw_text);

        ComposedPrompt {
            text,
            includes_preamble: true,
        }
    }
}
