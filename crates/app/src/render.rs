use folio_chat::{Role, SUGGESTED_QUESTIONS, Turn, TurnId};

pub const ASSISTANT_LABEL: &str = "assistant> ";

/// Turns transcript mutations into terminal output.
///
/// Streaming text only grows, so only the unseen suffix is written; a turn
/// whose text was replaced (the failure sentinel) is rewritten on a new line.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    turn_id: Option<TurnId>,
    rendered: String,
    finished: bool,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns what must be written to bring the terminal up to date with
    /// `turn`, if anything.
    pub fn render_update(&mut self, turn: &Turn) -> Option<String> {
        if turn.role != Role::Assistant {
            return None;
        }

        let mut output = String::new();
        if self.turn_id != Some(turn.id) {
            self.turn_id = Some(turn.id);
            self.rendered.clear();
            self.finished = false;
            output.push_str(ASSISTANT_LABEL);
        }
        if self.finished {
            return None;
        }

        if let Some(suffix) = turn.text.strip_prefix(self.rendered.as_str()) {
            output.push_str(suffix);
        } else {
            output.push('\n');
            output.push_str(&turn.text);
        }
        self.rendered.clone_from(&turn.text);

        if !turn.is_open() {
            self.finished = true;
            output.push('\n');
        }

        (!output.is_empty()).then_some(output)
    }
}

pub fn welcome_banner(initialized: bool) -> String {
    let mut banner = String::from(
        "Ask about projects, skills or experience. Commands: /ask N, /reset, /help, /quit\n",
    );
    for (index, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        banner.push_str(&format!("  [{}] {question}\n", index + 1));
    }
    if !initialized {
        banner.push_str("(assistant unavailable: check the Gemini API key in settings)\n");
    }
    banner
}

#[cfg(test)]
mod tests {
    use folio_chat::{STREAM_ERROR_SENTINEL, TurnStatus};
    use folio_llm::SubmissionId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn assistant(id: u64, text: &str, status: TurnStatus) -> Turn {
        Turn::new(TurnId::new(id), Role::Assistant, text, status)
    }

    fn open() -> TurnStatus {
        TurnStatus::Open(SubmissionId::new(1))
    }

    #[test]
    fn streaming_writes_only_new_suffixes() {
        let mut renderer = TranscriptRenderer::new();

        assert_eq!(
            renderer.render_update(&assistant(2, "", open())),
            Some(ASSISTANT_LABEL.to_string())
        );
        assert_eq!(
            renderer.render_update(&assistant(2, "NLP", open())).as_deref(),
            Some("NLP")
        );
        assert_eq!(
            renderer
                .render_update(&assistant(2, "NLP, Computer Vision", open()))
                .as_deref(),
            Some(", Computer Vision")
        );
        assert_eq!(
            renderer
                .render_update(&assistant(2, "NLP, Computer Vision", TurnStatus::Closed))
                .as_deref(),
            Some("\n")
        );
        assert_eq!(
            renderer.render_update(&assistant(2, "NLP, Computer Vision", TurnStatus::Closed)),
            None
        );
    }

    #[test]
    fn replaced_text_is_rewritten_on_a_new_line() {
        let mut renderer = TranscriptRenderer::new();
        renderer.render_update(&assistant(2, "Hello", open()));

        let output = renderer
            .render_update(&assistant(2, STREAM_ERROR_SENTINEL, TurnStatus::Errored))
            .unwrap();
        assert_eq!(output, format!("\n{STREAM_ERROR_SENTINEL}\n"));
    }

    #[test]
    fn user_turns_are_not_echoed() {
        let mut renderer = TranscriptRenderer::new();
        assert_eq!(renderer.render_update(&Turn::user(TurnId::new(1), "hi")), None);
    }

    #[test]
    fn banner_lists_suggestions() {
        let banner = welcome_banner(false);
        assert!(banner.contains("[1] What are his AI specializations?"));
        assert!(banner.contains("[4] What is his experience in AI Infrastructure?"));
        assert!(banner.contains("assistant unavailable"));
    }
}
