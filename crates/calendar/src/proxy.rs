use serde::Serialize;
use snafu::ensure;

use crate::cache::{CalendarCache, CalendarSource};
use crate::client::GithubCalendarClient;
use crate::error::{CalendarResult, MissingTokenSnafu};
use crate::settings::CalendarSettings;
use crate::types::ContributionCalendar;

/// Caching directive attached to every successful calendar response.
pub const CACHE_CONTROL: &str = "public, s-maxage=10800, stale-while-revalidate=3600";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSnapshot {
    pub calendar: ContributionCalendar,
    pub source: CalendarSource,
    pub warning: Option<String>,
}

/// Transport-neutral response: status code, caching header and JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<&'static str>,
    /// Set when the body is a stale copy served after a failed refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub body: serde_json::Value,
}

impl CalendarResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct CalendarProxy {
    client: GithubCalendarClient,
    cache: CalendarCache,
}

impl CalendarProxy {
    pub fn new(settings: &CalendarSettings) -> CalendarResult<Self> {
        Ok(Self::with_cache(
            GithubCalendarClient::new(settings)?,
            CalendarCache::default(),
        ))
    }

    pub fn with_cache(client: GithubCalendarClient, cache: CalendarCache) -> Self {
        Self { client, cache }
    }

    /// Serves the cached calendar, refreshing it from GitHub once expired.
    pub async fn calendar(&self) -> CalendarResult<CalendarSnapshot> {
        ensure!(
            self.client.has_token(),
            MissingTokenSnafu {
                stage: "check-proxy-token",
            }
        );

        if let Some(calendar) = self.cache.get_fresh().await {
            return Ok(CalendarSnapshot {
                calendar,
                source: CalendarSource::CacheFresh,
                warning: None,
            });
        }

        match self.client.fetch().await {
            Ok(calendar) => {
                self.cache.set(calendar.clone()).await;
                tracing::info!(
                    login = %self.client.login(),
                    total_contributions = calendar.total_contributions,
                    "contribution calendar refreshed"
                );
                Ok(CalendarSnapshot {
                    calendar,
                    source: CalendarSource::Upstream,
                    warning: None,
                })
            }
            Err(error) => match self.cache.get_stale().await {
                Some(calendar) => {
                    tracing::warn!(error = %error, "calendar refresh failed; serving stale copy");
                    Ok(CalendarSnapshot {
                        calendar,
                        source: CalendarSource::CacheStaleFallback,
                        warning: Some(error.to_string()),
                    })
                }
                None => {
                    tracing::error!(error = %error, "failed to fetch contribution calendar");
                    Err(error)
                }
            },
        }
    }

    pub async fn respond(&self) -> CalendarResponse {
        match self.calendar().await {
            Ok(snapshot) => match serde_json::to_value(&snapshot.calendar) {
                Ok(body) => CalendarResponse {
                    status: 200,
                    cache_control: Some(CACHE_CONTROL),
                    warning: snapshot.warning,
                    body,
                },
                Err(error) => error_response(error.to_string()),
            },
            Err(error) => error_response(error.to_string()),
        }
    }
}

fn error_response(message: String) -> CalendarResponse {
    CalendarResponse {
        status: 500,
        cache_control: None,
        warning: None,
        body: serde_json::json!({ "error": message }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn missing_token_is_a_server_error() {
        let proxy = CalendarProxy::new(&CalendarSettings::default()).unwrap();
        let response = proxy.respond().await;

        assert_eq!(response.status, 500);
        assert_eq!(response.cache_control, None);
        assert_eq!(
            response.body,
            serde_json::json!({ "error": "GitHub token not configured on server." })
        );
    }

    #[test]
    fn envelope_uses_camel_case_and_omits_missing_header() {
        let response = error_response("boom".to_string());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "status": 500, "body": { "error": "boom" } })
        );
    }
}
