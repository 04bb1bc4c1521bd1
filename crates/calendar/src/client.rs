use std::time::Duration;

use snafu::{OptionExt, ResultExt, ensure};

use crate::error::{
    BuildClientSnafu, CalendarResult, DecodeResponseSnafu, GraphqlSnafu, MissingCalendarSnafu,
    MissingTokenSnafu, RequestSnafu, UpstreamStatusSnafu,
};
use crate::settings::CalendarSettings;
use crate::types::{ContributionCalendar, GraphqlRequest, GraphqlResponse, GraphqlVariables};

pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";
pub const USER_AGENT: &str = "portfolio-app";

const CONTRIBUTIONS_QUERY: &str = r#"
  query($login: String!) {
    user(login: $login) {
      contributionsCollection {
        contributionCalendar {
          totalContributions
          weeks {
            contributionDays {
              contributionCount
              date
              color
            }
          }
        }
      }
    }
  }
"#;

/// GraphQL client for one account's contribution calendar.
pub struct GithubCalendarClient {
    http: reqwest::Client,
    endpoint: String,
    login: String,
    token: String,
}

impl std::fmt::Debug for GithubCalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubCalendarClient")
            .field("endpoint", &self.endpoint)
            .field("login", &self.login)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl GithubCalendarClient {
    pub fn new(settings: &CalendarSettings) -> CalendarResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context(BuildClientSnafu {
                stage: "build-calendar-http-client",
            })?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            login: settings.login.clone(),
            token: settings.github_token.trim().to_string(),
        })
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub async fn fetch(&self) -> CalendarResult<ContributionCalendar> {
        ensure!(
            self.has_token(),
            MissingTokenSnafu {
                stage: "check-github-token",
            }
        );

        tracing::debug!(endpoint = %self.endpoint, login = %self.login, "fetching contribution calendar");

        let request = GraphqlRequest {
            query: CONTRIBUTIONS_QUERY,
            variables: GraphqlVariables { login: &self.login },
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .context(RequestSnafu {
                stage: "send-contributions-query",
            })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            UpstreamStatusSnafu {
                stage: "check-response-status",
                status: status.as_u16(),
            }
        );

        let body: GraphqlResponse = response.json().await.context(DecodeResponseSnafu {
            stage: "decode-contributions-response",
        })?;

        // A present `errors` field fails the request even when it is empty.
        if let Some(errors) = body.errors {
            let message = errors
                .into_iter()
                .next()
                .and_then(|error| error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "GraphQL error".to_string());
            return GraphqlSnafu {
                stage: "check-graphql-errors",
                message,
            }
            .fail();
        }

        body.into_calendar().context(MissingCalendarSnafu {
            stage: "extract-contribution-calendar",
        })
    }
}
