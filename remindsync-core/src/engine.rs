//! Sync engine: mirror events into one reminder list per calendar.
//!
//! A run works in two passes over the calendars, in the order given:
//!
//! 1. Prepare each calendar's list. An existing list with the same title is
//!    emptied (removals staged, then committed per calendar); otherwise a new
//!    list is created and saved right away. Failures here only affect that
//!    calendar.
//! 2. Stage one reminder per event for every prepared calendar and commit all
//!    of them as a single transaction.
//!
//! Removal commits never carry task creations, so a failed calendar cannot
//! drag another calendar's new reminders into or out of its transaction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::color;
use crate::error::{SyncError, SyncResult};
use crate::model::{Calendar, Event, ListId, NewTask, NewTaskList, SourceId, TaskList, due_date_for};
use crate::provider::Provider;

/// Outcome for a calendar whose list was prepared and whose reminders were staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOutcome {
    pub calendar: String,
    pub list: ListId,
    pub created_list: bool,
    /// Old reminders removed from the list
    pub removed: usize,
    /// Old reminders that could not be removed and were left in place
    pub skipped_removals: usize,
    pub tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFailure {
    pub calendar: String,
    pub reason: String,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: Vec<CalendarOutcome>,
    pub failed: Vec<CalendarFailure>,
    /// Reminders written by the final commit
    pub tasks_created: usize,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_titles(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.calendar.as_str()).collect()
    }

    pub fn outcome(&self, calendar: &str) -> Option<&CalendarOutcome> {
        self.synced.iter().find(|o| o.calendar == calendar)
    }

    /// (lists created, reminders removed, reminders created)
    pub fn counts(&self) -> (usize, usize, usize) {
        let created_lists = self.synced.iter().filter(|o| o.created_list).count();
        let removed = self.synced.iter().map(|o| o.removed).sum();
        (created_lists, removed, self.tasks_created)
    }
}

/// A reminder that a run would create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub title: String,
    pub due: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedList {
    pub calendar: Calendar,
    pub tasks: Vec<PlannedTask>,
}

/// Held while a run is in progress. Dropping it lets the next run start.
#[derive(Debug)]
pub struct RunHandle {
    running: Arc<AtomicBool>,
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    running: Arc<AtomicBool>,
    tz: Option<Tz>,
}

impl SyncEngine {
    pub fn new(tz: Option<Tz>) -> Self {
        SyncEngine {
            running: Arc::new(AtomicBool::new(false)),
            tz,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claim the engine for one run, or `AlreadyRunning` if another run holds it.
    pub fn begin(&self) -> SyncResult<RunHandle> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SyncError::AlreadyRunning)?;

        Ok(RunHandle {
            running: Arc::clone(&self.running),
        })
    }

    /// What `sync` would write, without touching the provider.
    pub fn plan(&self, events: &[Event], calendars: &[Calendar]) -> Vec<PlannedList> {
        calendars
            .iter()
            .map(|calendar| PlannedList {
                calendar: calendar.clone(),
                tasks: events_for(calendar, events)
                    .into_iter()
                    .map(|e| PlannedTask {
                        title: e.display_title().to_string(),
                        due: due_date_for(e.start, self.tz),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Mirror `events` into one list per calendar in `calendars`.
    ///
    /// `events` should already be filtered by the selection that produced
    /// `calendars`. On error or cancellation, staged writes are discarded.
    #[tracing::instrument(skip_all, fields(calendars = calendars.len(), events = events.len()))]
    pub async fn sync<P: Provider + ?Sized>(
        &self,
        events: &[Event],
        calendars: &[Calendar],
        provider: &P,
        cancel: &CancelToken,
    ) -> SyncResult<SyncReport> {
        let _run = self.begin()?;

        let result = self.run(events, calendars, provider, cancel).await;

        if result.is_err() {
            if let Err(e) = provider.discard().await {
                warn!(error = %e, "could not discard staged writes");
            }
        }

        result
    }

    async fn run<P: Provider + ?Sized>(
        &self,
        events: &[Event],
        calendars: &[Calendar],
        provider: &P,
        cancel: &CancelToken,
    ) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        cancel.check()?;
        let mut lists = provider
            .task_lists()
            .await
            .map_err(|e| SyncError::ProviderRead(e.to_string()))?;
        let mut source = None;
        let mut prepared = Vec::new();

        for calendar in calendars {
            cancel.check()?;

            match self
                .prepare_list(calendar, &mut lists, &mut source, provider, cancel)
                .await
            {
                Ok(outcome) => prepared.push((calendar, outcome)),
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!(calendar = %calendar.title, error = %e, "skipping calendar");
                    report.failed.push(CalendarFailure {
                        calendar: calendar.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for (calendar, mut outcome) in prepared {
            cancel.check()?;

            for event in events_for(calendar, events) {
                provider
                    .stage_task(NewTask::for_event(event, &outcome.list, self.tz))
                    .await?;
                outcome.tasks += 1;
            }

            info!(
                calendar = %calendar.title,
                tasks = outcome.tasks,
                removed = outcome.removed,
                "staged reminders"
            );
            report.synced.push(outcome);
        }

        cancel.check()?;
        report.tasks_created = provider.commit().await.map_err(into_commit_error)?;

        info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            tasks = report.tasks_created,
            "sync finished"
        );
        Ok(report)
    }

    /// Find or create the list for `calendar` and leave it empty.
    async fn prepare_list<P: Provider + ?Sized>(
        &self,
        calendar: &Calendar,
        lists: &mut Vec<TaskList>,
        source: &mut Option<SourceId>,
        provider: &P,
        cancel: &CancelToken,
    ) -> SyncResult<CalendarOutcome> {
        if let Some(list) = lists.iter().find(|l| l.title == calendar.title) {
            let (removed, skipped_removals) = clear_list(list, provider, cancel).await?;
            return Ok(CalendarOutcome {
                calendar: calendar.title.clone(),
                list: list.id.clone(),
                created_list: false,
                removed,
                skipped_removals,
                tasks: 0,
            });
        }

        let create_error = |e: SyncError| SyncError::TaskListCreate {
            calendar: calendar.title.clone(),
            reason: e.to_string(),
        };

        let source = match source.clone() {
            Some(source) => source,
            None => {
                let default = provider.default_source().await.map_err(create_error)?;
                *source = Some(default.clone());
                default
            }
        };

        let list = provider
            .create_task_list(NewTaskList {
                title: calendar.title.clone(),
                color: color::resolve(calendar.color.as_ref()),
                source,
            })
            .await
            .map_err(create_error)?;
        info!(calendar = %calendar.title, list = %list.id, "created reminder list");

        let outcome = CalendarOutcome {
            calendar: calendar.title.clone(),
            list: list.id.clone(),
            created_list: true,
            removed: 0,
            skipped_removals: 0,
            tasks: 0,
        };
        lists.push(list);
        Ok(outcome)
    }
}

/// Remove every reminder in `list` and commit the removals.
/// Returns (removed, skipped).
async fn clear_list<P: Provider + ?Sized>(
    list: &TaskList,
    provider: &P,
    cancel: &CancelToken,
) -> SyncResult<(usize, usize)> {
    let tasks = provider
        .tasks(&list.id)
        .await
        .map_err(|e| SyncError::ProviderRead(e.to_string()))?;

    let mut staged = 0;
    let mut skipped = 0;
    for task in &tasks {
        cancel.check()?;
        match provider.stage_task_removal(&task.id).await {
            Ok(()) => staged += 1,
            Err(e) => {
                warn!(list = %list.title, task = %task.id, error = %e, "leaving reminder in place");
                skipped += 1;
            }
        }
    }

    cancel.check()?;
    if staged > 0 {
        provider.commit().await.map_err(into_commit_error)?;
    }

    Ok((staged, skipped))
}

/// Events of `calendar`, by start time; equal starts keep their input order.
fn events_for<'a>(calendar: &Calendar, events: &'a [Event]) -> Vec<&'a Event> {
    let mut matching: Vec<&Event> = events.iter().filter(|e| e.belongs_to(&calendar.id)).collect();
    matching.sort_by_key(|e| e.start);
    matching
}

fn into_commit_error(e: SyncError) -> SyncError {
    match e {
        SyncError::Commit(_) => e,
        other => SyncError::Commit(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CalendarId, NativeColor, Rgb};
    use crate::provider::memory::{MemoryProvider, Read};
    use chrono::{TimeZone, Utc};

    fn event(id: &str, calendar: &str, day: u32, hour: u32) -> Event {
        Event {
            id: id.into(),
            title: Some(id.into()),
            start: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            calendar: Some(CalendarId::new(calendar)),
        }
    }

    fn work() -> Calendar {
        Calendar::new("work", "Work").with_color(NativeColor::device_rgb(0.0, 0.0, 1.0))
    }

    fn titles(provider: &MemoryProvider, list: &str) -> Vec<String> {
        provider.tasks_in(list).into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn test_begin_is_single_flight() {
        let engine = SyncEngine::default();
        let run = engine.begin().unwrap();
        assert!(engine.is_running());
        assert!(matches!(engine.begin(), Err(SyncError::AlreadyRunning)));

        drop(run);
        assert!(!engine.is_running());
        assert!(engine.begin().is_ok());
    }

    #[test]
    fn test_events_sorted_stably() {
        let events = vec![
            event("late", "work", 6, 9),
            event("tie-a", "work", 4, 9),
            event("other", "home", 3, 9),
            event("tie-b", "work", 4, 9),
        ];
        let ids: Vec<_> = events_for(&work(), &events).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["tie-a", "tie-b", "late"]);
    }

    #[test]
    fn test_plan_truncates_dates() {
        let events = vec![event("Review", "work", 6, 23)];
        let plan = SyncEngine::default().plan(&events, &[work()]);
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].tasks,
            vec![PlannedTask {
                title: "Review".into(),
                due: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            }]
        );
    }

    #[tokio::test]
    async fn test_new_list_gets_calendar_color_and_default_source() {
        let provider = MemoryProvider::new();
        let events = vec![event("Standup", "work", 4, 9)];

        let engine = SyncEngine::default();
        let report = engine
            .sync(&events, &[work()], &provider, &CancelToken::new())
            .await
            .unwrap();

        let list = provider.list_titled("Work").unwrap();
        assert_eq!(
            list.color,
            Some(Rgb {
                red: 0.0,
                green: 0.0,
                blue: 1.0
            })
        );
        assert_eq!(list.source, SourceId::new("local"));
        assert_eq!(report.counts(), (1, 0, 1));
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_existing_list_is_replaced() {
        let provider = MemoryProvider::new().with_task_list("Work");
        let list = provider.list_titled("Work").unwrap();
        let provider = provider.with_task(
            "Work",
            NewTask {
                title: "Stale".into(),
                due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                list: list.id.clone(),
            },
        );

        let events = vec![event("Review", "work", 6, 14), event("Standup", "work", 4, 9)];
        let report = SyncEngine::default()
            .sync(&events, &[work()], &provider, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(titles(&provider, "Work"), vec!["Standup", "Review"]);
        assert_eq!(provider.lists().len(), 1);
        let outcome = report.outcome("Work").unwrap();
        assert!(!outcome.created_list);
        assert_eq!(outcome.removed, 1);
    }

    #[tokio::test]
    async fn test_undeletable_reminder_is_skipped() {
        let provider = MemoryProvider::new().with_task_list("Work");
        let list = provider.list_titled("Work").unwrap();
        let provider = provider.with_task(
            "Work",
            NewTask {
                title: "Locked".into(),
                due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                list: list.id.clone(),
            },
        );
        let locked = provider.tasks_in("Work")[0].id.clone();
        provider.fail_removal_of(&locked);

        let events = vec![event("Standup", "work", 4, 9)];
        let report = SyncEngine::default()
            .sync(&events, &[work()], &provider, &CancelToken::new())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.outcome("Work").unwrap().skipped_removals, 1);
        assert_eq!(titles(&provider, "Work"), vec!["Locked", "Standup"]);
    }

    #[tokio::test]
    async fn test_final_commit_failure_is_aggregate_error() {
        let provider = MemoryProvider::new().fail_commits(1);
        let events = vec![event("Standup", "work", 4, 9)];

        let result = SyncEngine::default()
            .sync(&events, &[work()], &provider, &CancelToken::new())
            .await;

        assert!(matches!(result, Err(SyncError::Commit(_))));
        assert!(provider.all_tasks().is_empty());
        assert_eq!(provider.staged_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_lists_fail_the_run() {
        let provider = MemoryProvider::new().fail_reads_of(Read::TaskLists);
        let engine = SyncEngine::default();

        let result = engine
            .sync(&[event("Standup", "work", 4, 9)], &[work()], &provider, &CancelToken::new())
            .await;

        assert!(matches!(result, Err(SyncError::ProviderRead(_))));
        assert_eq!(provider.write_count(), 0);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_unreadable_list_fails_only_its_calendar() {
        let home = Calendar::new("home", "Home");
        let provider = MemoryProvider::new()
            .with_task_list("Home")
            .fail_reads_of(Read::TasksIn("Home".into()));
        let events = vec![event("Standup", "work", 4, 9), event("Dinner", "home", 5, 18)];

        let report = SyncEngine::default()
            .sync(&events, &[work(), home], &provider, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.failed_titles(), vec!["Home"]);
        assert!(report.failed[0].reason.contains("read"));
        assert_eq!(report.tasks_created, 1);
        assert_eq!(titles(&provider, "Work"), vec!["Standup"]);
        assert!(titles(&provider, "Home").is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let provider = MemoryProvider::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = SyncEngine::default()
            .sync(&[event("Standup", "work", 4, 9)], &[work()], &provider, &cancel)
            .await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert_eq!(provider.write_count(), 0);
    }

    #[tokio::test]
    async fn test_sync_rejected_while_running() {
        let engine = SyncEngine::default();
        let _run = engine.begin().unwrap();
        let provider = MemoryProvider::new();

        let result = engine
            .sync(&[], &[work()], &provider, &CancelToken::new())
            .await;
        assert!(matches!(result, Err(SyncError::AlreadyRunning)));
        assert_eq!(provider.write_count(), 0);
    }
}
