use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Portfolio chat assistant and activity calendar.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
pub struct Cli {
    /// Settings file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chat with the assistant (default).
    Chat(ChatArgs),
    /// Print the contribution calendar as JSON.
    Calendar(CalendarArgs),
    /// Manage the settings file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Ask one question, print the streamed reply and exit.
    #[arg(long)]
    pub ask: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct CalendarArgs {
    /// Print only the response body instead of the full envelope.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a settings file with defaults.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings with secrets redacted.
    Show,
}
