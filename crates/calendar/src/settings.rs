use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::GITHUB_GRAPHQL_ENDPOINT;

pub const DEFAULT_GITHUB_LOGIN: &str = "shahdivax";

/// Calendar section of the application settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    #[serde(default)]
    pub github_token: String,
    #[serde(default = "default_login")]
    pub login: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            login: default_login(),
            endpoint: default_endpoint(),
        }
    }
}

impl fmt::Debug for CalendarSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarSettings")
            .field("has_github_token", &self.has_token())
            .field("login", &self.login)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl CalendarSettings {
    pub fn has_token(&self) -> bool {
        !self.github_token.trim().is_empty()
    }

    pub fn normalized(mut self) -> Self {
        self.github_token = self.github_token.trim().to_string();
        self.login = match self.login.trim() {
            "" => default_login(),
            login => login.to_string(),
        };
        self.endpoint = match self.endpoint.trim() {
            "" => default_endpoint(),
            endpoint => endpoint.to_string(),
        };
        self
    }
}

fn default_login() -> String {
    DEFAULT_GITHUB_LOGIN.to_string()
}

fn default_endpoint() -> String {
    GITHUB_GRAPHQL_ENDPOINT.to_string()
}
