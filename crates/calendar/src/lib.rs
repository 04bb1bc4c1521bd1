//! Cached proxy for a GitHub account's public contribution calendar.

mod cache;
mod client;
mod error;
mod proxy;
mod settings;
mod types;

pub use cache::{CALENDAR_TTL, CalendarCache, CalendarSource, STALE_WHILE_REVALIDATE};
pub use client::{GITHUB_GRAPHQL_ENDPOINT, GithubCalendarClient, USER_AGENT};
pub use error::{CalendarError, CalendarResult};
pub use proxy::{CACHE_CONTROL, CalendarProxy, CalendarResponse, CalendarSnapshot};
pub use settings::{CalendarSettings, DEFAULT_GITHUB_LOGIN};
pub use types::{ContributionCalendar, ContributionDay, ContributionWeek};
