use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use folio_calendar::CalendarSettings;
use folio_chat::{ChatSettings, redacted};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "folio";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "FOLIO_";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub calendar: CalendarSettings,
}

impl AppSettings {
    pub fn normalized(self) -> Self {
        Self {
            chat: self.chat.normalized(),
            calendar: self.calendar.normalized(),
        }
    }

    /// Fills blank secrets from the conventional environment variables.
    pub fn with_env_fallbacks(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.chat.api_key.trim().is_empty() {
            if let Some(api_key) = lookup(GEMINI_API_KEY_ENV) {
                self.chat.api_key = api_key;
            }
        }
        if self.calendar.github_token.trim().is_empty() {
            if let Some(token) = lookup(GITHUB_TOKEN_ENV) {
                self.calendar.github_token = token;
            }
        }
        self
    }

    /// Copy that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        settings.chat.api_key = redacted(&self.chat.api_key).to_string();
        settings.calendar.github_token = redacted(&self.calendar.github_token).to_string();
        settings
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".folio"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        Self::with_sources(config_path, Env::prefixed(ENV_PREFIX).split("__"), |name| {
            std::env::var(name).ok()
        })
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    fn with_sources(
        config_path: PathBuf,
        env: Env,
        fallback: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let settings = Self::load_from_sources(&config_path, env)
            .with_env_fallbacks(fallback)
            .normalized();
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_sources(path: &Path, env: Env) -> AppSettings {
        if !path.exists() {
            tracing::debug!(path = ?path, "settings file not found; using defaults and environment");
        }

        let figment = Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Json::file(path))
            .merge(env);

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(path = ?path, error = %error, "failed to parse settings; using defaults");
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = ?self.config_path, "saved settings");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn isolated_env() -> Env {
        Env::prefixed("FOLIO_SETTINGS_TEST_UNSET_").split("__")
    }

    fn no_fallback(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            SettingsStore::with_sources(dir.path().join("settings.json"), isolated_env(), no_fallback);

        assert_eq!(*store.settings(), AppSettings::default().normalized());
        assert_eq!(store.settings().chat.model, "gemini-2.5-flash");
    }

    #[test]
    fn file_values_are_merged_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"chat":{"api_key":" key ","model":"  "},"calendar":{"login":"octocat"}}"#,
        )
        .unwrap();

        let settings = SettingsStore::with_sources(path, isolated_env(), no_fallback).settings();

        assert_eq!(settings.chat.api_key, "key");
        assert_eq!(settings.chat.model, "gemini-2.5-flash");
        assert_eq!(settings.calendar.login, "octocat");
        assert_eq!(settings.calendar.endpoint, "https://api.github.com/graphql");
    }

    #[test]
    fn fallbacks_only_fill_blank_secrets() {
        let settings = AppSettings {
            chat: ChatSettings {
                api_key: "from-file".to_string(),
                ..ChatSettings::default()
            },
            calendar: CalendarSettings::default(),
        }
        .with_env_fallbacks(|name| Some(format!("env-{name}")));

        assert_eq!(settings.chat.api_key, "from-file");
        assert_eq!(settings.calendar.github_token, "env-GITHUB_TOKEN");
    }

    #[test]
    fn update_persists_atomically_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::with_sources(path.clone(), isolated_env(), no_fallback);

        let mut settings = (*store.settings()).clone();
        settings.chat.thinking_budget = 128;
        store.update(settings).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.settings().chat.thinking_budget, 128);

        let reloaded = SettingsStore::with_sources(path, isolated_env(), no_fallback);
        assert_eq!(reloaded.settings().chat.thinking_budget, 128);
    }

    #[test]
    fn redacted_copy_hides_secrets() {
        let settings = AppSettings::default().with_env_fallbacks(|_| Some("secret".to_string()));
        let shown = serde_json::to_string(&settings.redacted()).unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("[REDACTED]"));
    }
}
