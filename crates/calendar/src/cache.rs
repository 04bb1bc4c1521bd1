use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::types::ContributionCalendar;

/// How long a fetched calendar is served without asking GitHub again.
pub const CALENDAR_TTL: Duration = Duration::from_secs(10_800);

/// Extra time an expired calendar may still be served when a refresh fails.
pub const STALE_WHILE_REVALIDATE: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSource {
    Upstream,
    CacheFresh,
    CacheStaleFallback,
}

struct CacheEntry {
    calendar: ContributionCalendar,
    fetched_at: Instant,
}

/// Single-entry calendar cache.
pub struct CalendarCache {
    entry: RwLock<Option<CacheEntry>>,
    ttl: Duration,
    stale_window: Duration,
}

impl Default for CalendarCache {
    fn default() -> Self {
        Self::new(CALENDAR_TTL, STALE_WHILE_REVALIDATE)
    }
}

impl CalendarCache {
    pub fn new(ttl: Duration, stale_window: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
            stale_window,
        }
    }

    pub async fn get_fresh(&self) -> Option<ContributionCalendar> {
        self.get_within(self.ttl).await
    }

    /// Returns the entry while it is inside the TTL plus the stale window.
    pub async fn get_stale(&self) -> Option<ContributionCalendar> {
        self.get_within(self.ttl.saturating_add(self.stale_window))
            .await
    }

    pub async fn set(&self, calendar: ContributionCalendar) {
        let mut entry = self.entry.write().await;
        *entry = Some(CacheEntry {
            calendar,
            fetched_at: Instant::now(),
        });
    }

    async fn get_within(&self, max_age: Duration) -> Option<ContributionCalendar> {
        let entry = self.entry.read().await;
        entry.as_ref().and_then(|entry| {
            if entry.fetched_at.elapsed() < max_age {
                Some(entry.calendar.clone())
            } else {
                None
            }
        })
    }
}
