//! Event source adapter: upcoming events and the calendars they belong to.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{SyncError, SyncResult};
use crate::gate;
use crate::model::{Calendar, Event};
use crate::provider::Provider;
use crate::window::SyncWindow;

pub const DEFAULT_COLOR_RETRY_ATTEMPTS: u32 = 10;
pub const DEFAULT_COLOR_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Bounds on waiting for calendar colors right after authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRetry {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ColorRetry {
    fn default() -> Self {
        ColorRetry {
            max_attempts: DEFAULT_COLOR_RETRY_ATTEMPTS,
            delay: DEFAULT_COLOR_RETRY_DELAY,
        }
    }
}

/// Events in the window plus the calendars discovered among them.
#[derive(Debug, Clone, Default)]
pub struct Upcoming {
    pub events: Vec<Event>,
    /// In order of first appearance among `events`
    pub calendars: Vec<Calendar>,
}

impl Upcoming {
    pub fn calendar_titled(&self, title: &str) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.title == title)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventSource {
    retry: ColorRetry,
}

impl EventSource {
    pub fn new(retry: ColorRetry) -> Self {
        EventSource { retry }
    }

    /// Read-only query of the events in `window`.
    ///
    /// Re-queries everything until every discovered calendar reports a color,
    /// at most `max_attempts` times with `delay` between attempts.
    #[tracing::instrument(
        skip(self, provider, cancel),
        fields(from = %window.from, to = %window.to)
    )]
    pub async fn fetch_upcoming<P: Provider + ?Sized>(
        &self,
        provider: &P,
        window: &SyncWindow,
        cancel: &CancelToken,
    ) -> SyncResult<Upcoming> {
        let authorized = gate::is_authorized(provider)
            .await
            .map_err(|e| SyncError::ProviderRead(e.to_string()))?;
        if !authorized {
            return Err(SyncError::PermissionDenied);
        }

        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            cancel.check()?;

            let events = provider
                .events(window.from, window.to)
                .await
                .map_err(|e| SyncError::ProviderRead(e.to_string()))?;
            let calendars = provider
                .calendars()
                .await
                .map_err(|e| SyncError::ProviderRead(e.to_string()))?;

            let discovered = discover_calendars(&events, &calendars);

            if discovered.iter().all(Calendar::color_resolved) {
                info!(
                    events = events.len(),
                    calendars = discovered.len(),
                    attempt,
                    "fetched upcoming events"
                );
                return Ok(Upcoming {
                    events,
                    calendars: discovered,
                });
            }

            debug!(attempt, "calendar colors not loaded yet");
            if attempt < max_attempts {
                cancel.check()?;
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        warn!(attempts = max_attempts, "gave up waiting for calendar colors");
        Err(SyncError::ColorResolutionTimeout {
            attempts: max_attempts,
        })
    }
}

/// Calendars referenced by `events`, deduplicated, in order of first reference.
/// References to calendars the provider does not know are skipped.
pub fn discover_calendars(events: &[Event], calendars: &[Calendar]) -> Vec<Calendar> {
    let mut seen = HashSet::new();

    events
        .iter()
        .filter_map(|e| e.calendar.as_ref())
        .filter(|id| seen.insert((*id).clone()))
        .filter_map(|id| calendars.iter().find(|c| &c.id == id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CalendarId, NativeColor};
    use crate::provider::memory::{MemoryProvider, Read};
    use chrono::{TimeZone, Utc};

    fn event(id: &str, calendar: &str, day: u32) -> Event {
        Event {
            id: id.into(),
            title: Some(id.into()),
            start: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            calendar: Some(CalendarId::new(calendar)),
        }
    }

    fn window() -> SyncWindow {
        SyncWindow::from_args("2024-03-01", "2024-03-07").unwrap()
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new()
            .with_calendar(
                Calendar::new("home", "Home").with_color(NativeColor::device_rgb(0.0, 1.0, 0.0)),
            )
            .with_calendar(
                Calendar::new("work", "Work").with_color(NativeColor::device_rgb(0.0, 0.0, 1.0)),
            )
            .with_event(event("e1", "work", 4))
            .with_event(event("e2", "home", 5))
            .with_event(event("e3", "work", 6))
            .with_event(event("late", "work", 20))
            .pre_authorized()
    }

    #[test]
    fn test_discovery_order_and_dedup() {
        let calendars = vec![Calendar::new("home", "Home"), Calendar::new("work", "Work")];
        let events = vec![
            event("e1", "work", 4),
            event("e2", "home", 5),
            event("e3", "work", 6),
            event("e4", "gone", 6),
        ];

        let titles: Vec<_> = discover_calendars(&events, &calendars)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Work", "Home"]);
    }

    #[tokio::test]
    async fn test_fetch_in_window() {
        let upcoming = EventSource::default()
            .fetch_upcoming(&provider(), &window(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(upcoming.events.len(), 3);
        assert_eq!(upcoming.calendars.len(), 2);
        assert!(upcoming.calendar_titled("Work").is_some());
    }

    #[tokio::test]
    async fn test_requires_authorization() {
        let provider = MemoryProvider::new();
        let result = EventSource::default()
            .fetch_upcoming(&provider, &window(), &CancelToken::new())
            .await;
        assert!(matches!(result, Err(SyncError::PermissionDenied)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_colors_resolve() {
        let provider = provider().colors_unavailable_for(2);
        let upcoming = EventSource::default()
            .fetch_upcoming(&provider, &window(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(provider.calendar_queries(), 3);
        assert!(upcoming.calendars.iter().all(Calendar::color_resolved));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_is_bounded() {
        let provider = provider().colors_unavailable_for(u32::MAX);
        let source = EventSource::new(ColorRetry {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        });

        let result = source
            .fetch_upcoming(&provider, &window(), &CancelToken::new())
            .await;
        assert!(matches!(
            result,
            Err(SyncError::ColorResolutionTimeout { attempts: 3 })
        ));
        assert_eq!(provider.calendar_queries(), 3);
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        for read in [Read::Events, Read::Calendars] {
            let result = EventSource::default()
                .fetch_upcoming(
                    &provider().fail_reads_of(read.clone()),
                    &window(),
                    &CancelToken::new(),
                )
                .await;
            assert!(
                matches!(result, Err(SyncError::ProviderRead(_))),
                "{:?} failure should abort the fetch",
                read
            );
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_query() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = EventSource::default()
            .fetch_upcoming(&provider(), &window(), &cancel)
            .await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
    }
}
