//! folio: terminal front end for the portfolio chat assistant and the
//! contribution-calendar proxy.

mod cli;
mod error;
mod render;
mod repl;
mod settings;

use clap::Parser;
use folio_calendar::CalendarProxy;
use folio_chat::SessionController;
use snafu::{ResultExt, ensure};
use tracing_subscriber::EnvFilter;

use crate::cli::{CalendarArgs, ChatArgs, Cli, Command, ConfigAction};
use crate::error::{
    AppResult, CalendarFailedSnafu, CalendarSetupSnafu, CreateBackendSnafu, EncodeOutputSnafu,
    LoadPreambleSnafu, SettingsExistSnafu, SettingsSnafu,
};
use crate::settings::{AppSettings, SettingsStore};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(error) = run(Cli::parse()).await {
        eprintln!("folio: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    let store = match cli.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };

    match cli.command.unwrap_or(Command::Chat(ChatArgs::default())) {
        Command::Chat(args) => run_chat(&store, args).await,
        Command::Calendar(args) => run_calendar(&store, args).await,
        Command::Config { action } => run_config(&store, action),
    }
}

async fn run_chat(store: &SettingsStore, args: ChatArgs) -> AppResult<()> {
    let settings = store.settings();
    let backend = folio_llm::create_backend(settings.chat.provider_config()).context(
        CreateBackendSnafu {
            stage: "create-chat-backend",
        },
    )?;
    let composer = settings.chat.composer().context(LoadPreambleSnafu {
        stage: "load-chat-preamble",
    })?;

    let mut controller = SessionController::new(backend, settings.chat.model_config(), composer);
    controller.initialize();

    match args.ask {
        Some(question) => repl::ask_once(&mut controller, &question).await,
        None => repl::run_repl(&mut controller).await,
    }
}

async fn run_calendar(store: &SettingsStore, args: CalendarArgs) -> AppResult<()> {
    let settings = store.settings();
    let proxy = CalendarProxy::new(&settings.calendar).context(CalendarSetupSnafu {
        stage: "create-calendar-proxy",
    })?;

    let response = proxy.respond().await;
    if let Some(warning) = &response.warning {
        eprintln!("folio: serving cached calendar: {warning}");
    }
    let output = if args.raw {
        serde_json::to_string_pretty(&response.body)
    } else {
        serde_json::to_string_pretty(&response)
    }
    .context(EncodeOutputSnafu {
        stage: "encode-calendar-response",
    })?;
    println!("{output}");

    ensure!(
        response.is_success(),
        CalendarFailedSnafu {
            stage: "calendar-response-status",
            status: response.status,
        }
    );
    Ok(())
}

fn run_config(store: &SettingsStore, action: ConfigAction) -> AppResult<()> {
    match action {
        ConfigAction::Init { force } => {
            let path = store.config_path();
            ensure!(
                force || !path.exists(),
                SettingsExistSnafu {
                    stage: "init-settings-file",
                    path: path.to_path_buf(),
                }
            );
            store
                .update(AppSettings::default())
                .context(SettingsSnafu {
                    stage: "init-settings-file",
                })?;
            println!("wrote {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let settings = store.settings().redacted();
            let output = serde_json::to_string_pretty(&settings).context(EncodeOutputSnafu {
                stage: "encode-settings",
            })?;
            println!("path: {}", store.config_path().display());
            println!("{output}");
            Ok(())
        }
    }
}
