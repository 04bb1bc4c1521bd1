use folio_chat::{IgnoreReason, SUGGESTED_QUESTIONS, SessionController, SubmitOutcome};
use snafu::{ResultExt, ensure};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};

use crate::error::{AppResult, AssistantUnavailableSnafu, TerminalSnafu};
use crate::render::{TranscriptRenderer, welcome_banner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Message(String),
    Ask(usize),
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("quit" | "exit"), None) => Self::Quit,
            (Some("reset" | "new"), None) => Self::Reset,
            (Some("help"), None) => Self::Help,
            (Some("ask"), Some(index)) => match index.parse::<usize>() {
                Ok(index) if (1..=SUGGESTED_QUESTIONS.len()).contains(&index) => Self::Ask(index),
                _ => Self::Unknown(trimmed.to_string()),
            },
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// Interactive loop: stdin lines and provider events are multiplexed on the
/// task that owns the controller.
pub async fn run_repl(controller: &mut SessionController) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut renderer = TranscriptRenderer::new();

    write(&mut stdout, &welcome_banner(controller.is_initialized())).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context(TerminalSnafu { stage: "read-stdin-line" })? else {
                    break;
                };
                match ReplCommand::parse(&line) {
                    ReplCommand::Quit => break,
                    ReplCommand::Reset => {
                        controller.reset();
                        renderer.reset();
                        write(&mut stdout, "-- new chat --\n").await?;
                        write(&mut stdout, &welcome_banner(controller.is_initialized())).await?;
                    }
                    ReplCommand::Help => {
                        write(&mut stdout, &welcome_banner(controller.is_initialized())).await?;
                    }
                    ReplCommand::Ask(index) => {
                        let question = SUGGESTED_QUESTIONS[index - 1];
                        write(&mut stdout, &format!("you> {question}\n")).await?;
                        controller.set_input(question);
                        submit(controller, &mut renderer, &mut stdout).await?;
                    }
                    ReplCommand::Message(text) => {
                        controller.set_input(text);
                        submit(controller, &mut renderer, &mut stdout).await?;
                    }
                    ReplCommand::Unknown(command) => {
                        write(&mut stdout, &format!("unknown command: {command}\n")).await?;
                    }
                }
            }
            Some(_) = controller.pump(), if controller.is_busy() => {
                render_last(controller, &mut renderer, &mut stdout).await?;
            }
        }
    }

    Ok(())
}

/// Asks a single question and streams the reply to stdout.
pub async fn ask_once(controller: &mut SessionController, question: &str) -> AppResult<()> {
    ensure!(
        controller.is_initialized(),
        AssistantUnavailableSnafu {
            stage: "ask-once",
        }
    );

    let mut stdout = tokio::io::stdout();
    let mut renderer = TranscriptRenderer::new();
    controller.set_input(question);
    submit(controller, &mut renderer, &mut stdout).await?;
    while controller.pump().await.is_some() {
        render_last(controller, &mut renderer, &mut stdout).await?;
    }
    Ok(())
}

async fn submit(
    controller: &mut SessionController,
    renderer: &mut TranscriptRenderer,
    stdout: &mut Stdout,
) -> AppResult<()> {
    match controller.submit_input() {
        SubmitOutcome::Accepted(_) => render_last(controller, renderer, stdout).await,
        SubmitOutcome::Ignored(IgnoreReason::BlankInput) => Ok(()),
        SubmitOutcome::Ignored(IgnoreReason::NotInitialized) => {
            write(stdout, "(assistant unavailable; /reset after fixing settings)\n").await
        }
        SubmitOutcome::Ignored(IgnoreReason::Busy) => {
            write(stdout, "(still answering; wait for the reply)\n").await
        }
    }
}

async fn render_last(
    controller: &SessionController,
    renderer: &mut TranscriptRenderer,
    stdout: &mut Stdout,
) -> AppResult<()> {
    let Some(output) = controller
        .turns()
        .last()
        .and_then(|turn| renderer.render_update(turn))
    else {
        return Ok(());
    };
    write(stdout, &output).await
}

async fn write(stdout: &mut Stdout, text: &str) -> AppResult<()> {
    stdout
        .write_all(text.as_bytes())
        .await
        .context(TerminalSnafu {
            stage: "write-stdout",
        })?;
    stdout.flush().await.context(TerminalSnafu {
        stage: "flush-stdout",
    })
}
