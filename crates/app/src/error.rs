use snafu::Snafu;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("settings failed on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("settings file already exists at {path:?}; pass --force to overwrite"))]
    SettingsExist {
        stage: &'static str,
        path: std::path::PathBuf,
    },
    #[snafu(display("failed to create chat backend on `{stage}`: {source}"))]
    CreateBackend {
        stage: &'static str,
        source: folio_llm::ProviderError,
    },
    #[snafu(display("failed to load preamble on `{stage}`: {source}"))]
    LoadPreamble {
        stage: &'static str,
        source: folio_chat::ChatError,
    },
    #[snafu(display("assistant is unavailable; configure an API key (GEMINI_API_KEY)"))]
    AssistantUnavailable { stage: &'static str },
    #[snafu(display("failed to set up calendar proxy on `{stage}`: {source}"))]
    CalendarSetup {
        stage: &'static str,
        source: folio_calendar::CalendarError,
    },
    #[snafu(display("calendar request failed with status {status}"))]
    CalendarFailed { stage: &'static str, status: u16 },
    #[snafu(display("failed to encode output on `{stage}`: {source}"))]
    EncodeOutput {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("terminal io failed on `{stage}`: {source}"))]
    Terminal {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;
