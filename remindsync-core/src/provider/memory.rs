//! In-process provider backed by plain vectors.
//!
//! Behaves like a transactional store: staged writes are applied all at once
//! on commit, or not at all. Failures can be injected per operation so the
//! partial-failure paths of a sync run can be exercised.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::model::{
    Calendar, Event, ListId, NativeColor, NewTask, NewTaskList, SourceId, Task, TaskId, TaskList,
};
use crate::provider::protocol::StagedWrite;
use crate::provider::{AccessGrant, AuthorizationStatus, Provider, Scope};

/// Store reads that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Read {
    Events,
    Calendars,
    TaskLists,
    /// Tasks of the list with this title
    TasksIn(String),
}

#[derive(Default)]
struct MemoryState {
    access: Option<AccessGrant>,
    deny_access: bool,
    calendars: Vec<Calendar>,
    events: Vec<Event>,
    lists: Vec<TaskList>,
    tasks: Vec<Task>,
    staged: Vec<StagedWrite>,
    default_source: SourceId,
    fail_list_creation: HashSet<String>,
    fail_removal: HashSet<TaskId>,
    fail_reads: HashSet<Read>,
    failing_commits: usize,
    colors_unavailable_for: u32,
    calendar_queries: u32,
    access_requests: u32,
    writes: usize,
}

pub struct MemoryProvider {
    state: Mutex<MemoryState>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        MemoryProvider {
            state: Mutex::new(MemoryState {
                default_source: SourceId::new("local"),
                ..MemoryState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_calendar(self, calendar: Calendar) -> Self {
        self.state().calendars.push(calendar);
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        self.state().events.push(event);
        self
    }

    /// Seed an existing task list, as left behind by an earlier run.
    pub fn with_task_list(self, title: &str) -> Self {
        {
            let mut state = self.state();
            let source = state.default_source.clone();
            state.lists.push(TaskList {
                id: ListId::new(Uuid::new_v4().to_string()),
                title: title.to_string(),
                color: None,
                source,
            });
        }
        self
    }

    /// Seed a committed task into the list titled `list_title`.
    pub fn with_task(self, list_title: &str, task: NewTask) -> Self {
        {
            let mut state = self.state();
            let list = state
                .lists
                .iter()
                .find(|l| l.title == list_title)
                .map(|l| l.id.clone())
                .unwrap_or(task.list);
            state.tasks.push(Task {
                id: TaskId::new(Uuid::new_v4().to_string()),
                title: task.title,
                due: task.due,
                list,
            });
        }
        self
    }

    pub fn deny_access(self) -> Self {
        self.state().deny_access = true;
        self
    }

    /// Treat access as already granted, as on a second launch.
    pub fn pre_authorized(self) -> Self {
        self.state().access = Some(AccessGrant::Granted);
        self
    }

    pub fn fail_list_creation_for(self, title: &str) -> Self {
        self.state().fail_list_creation.insert(title.to_string());
        self
    }

    pub fn fail_reads_of(self, read: Read) -> Self {
        self.state().fail_reads.insert(read);
        self
    }

    pub fn fail_removal_of(&self, task: &TaskId) {
        self.state().fail_removal.insert(task.clone());
    }

    /// Fail the next `count` commits.
    pub fn fail_commits(self, count: usize) -> Self {
        self.state().failing_commits = count;
        self
    }

    /// Report calendar colors as unavailable for the first `queries` calendar lookups.
    pub fn colors_unavailable_for(self, queries: u32) -> Self {
        self.state().colors_unavailable_for = queries;
        self
    }

    pub fn set_events(&self, events: Vec<Event>) {
        self.state().events = events;
    }

    pub fn lists(&self) -> Vec<TaskList> {
        self.state().lists.clone()
    }

    pub fn list_titled(&self, title: &str) -> Option<TaskList> {
        self.state().lists.iter().find(|l| l.title == title).cloned()
    }

    /// Committed tasks of the list titled `title`, in insertion order.
    pub fn tasks_in(&self, title: &str) -> Vec<Task> {
        let state = self.state();
        let Some(list) = state.lists.iter().find(|l| l.title == title) else {
            return Vec::new();
        };
        state
            .tasks
            .iter()
            .filter(|t| t.list == list.id)
            .cloned()
            .collect()
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    pub fn staged_count(&self) -> usize {
        self.state().staged.len()
    }

    /// Number of writes that reached the store (list creations and committed writes).
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    pub fn calendar_queries(&self) -> u32 {
        self.state().calendar_queries
    }

    pub fn access_requests(&self) -> u32 {
        self.state().access_requests
    }
}

impl MemoryState {
    fn read(&self, read: Read) -> SyncResult<()> {
        if self.fail_reads.contains(&read) {
            return Err(SyncError::Provider(format!("Store read failed: {:?}", read)));
        }
        Ok(())
    }
}

fn apply(
    lists: &[TaskList],
    tasks: &mut Vec<Task>,
    writes: &[StagedWrite],
) -> Result<(), String> {
    for write in writes {
        match write {
            StagedWrite::RemoveTask { task_id } => tasks.retain(|t| &t.id != task_id),
            StagedWrite::SaveTask { task } => {
                if !lists.iter().any(|l| l.id == task.list) {
                    return Err(format!("No reminder list with id {}", task.list));
                }
                tasks.push(Task {
                    id: TaskId::new(Uuid::new_v4().to_string()),
                    title: task.title.clone(),
                    due: task.due,
                    list: task.list.clone(),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn request_access(&self, _scopes: &[Scope]) -> SyncResult<AccessGrant> {
        let mut state = self.state();
        state.access_requests += 1;
        let grant = if state.deny_access {
            AccessGrant::Denied
        } else {
            AccessGrant::Granted
        };
        state.access = Some(grant);
        Ok(grant)
    }

    async fn authorization_status(&self, _scope: Scope) -> SyncResult<AuthorizationStatus> {
        Ok(match self.state().access {
            None => AuthorizationStatus::NotDetermined,
            Some(AccessGrant::Denied) => AuthorizationStatus::Denied,
            Some(AccessGrant::Granted) => AuthorizationStatus::Authorized,
        })
    }

    async fn events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> SyncResult<Vec<Event>> {
        let state = self.state();
        state.read(Read::Events)?;
        Ok(state
            .events
            .iter()
            .filter(|e| e.start >= from && e.start < to)
            .cloned()
            .collect())
    }

    async fn calendars(&self) -> SyncResult<Vec<Calendar>> {
        let mut state = self.state();
        state.read(Read::Calendars)?;
        state.calendar_queries += 1;
        let unavailable = state.calendar_queries <= state.colors_unavailable_for;

        Ok(state
            .calendars
            .iter()
            .cloned()
            .map(|mut cal| {
                if unavailable && cal.color.is_some() {
                    cal.color = Some(NativeColor::unavailable());
                }
                cal
            })
            .collect())
    }

    async fn task_lists(&self) -> SyncResult<Vec<TaskList>> {
        let state = self.state();
        state.read(Read::TaskLists)?;
        Ok(state.lists.clone())
    }

    async fn tasks(&self, list: &ListId) -> SyncResult<Vec<Task>> {
        let state = self.state();
        if let Some(found) = state.lists.iter().find(|l| &l.id == list) {
            state.read(Read::TasksIn(found.title.clone()))?;
        }
        Ok(state
            .tasks
            .iter()
            .filter(|t| &t.list == list)
            .cloned()
            .collect())
    }

    async fn default_source(&self) -> SyncResult<SourceId> {
        Ok(self.state().default_source.clone())
    }

    async fn create_task_list(&self, list: NewTaskList) -> SyncResult<TaskList> {
        let mut state = self.state();
        if state.fail_list_creation.contains(&list.title) {
            return Err(SyncError::Provider(format!(
                "Store refused to create list '{}'",
                list.title
            )));
        }

        let created = TaskList {
            id: ListId::new(Uuid::new_v4().to_string()),
            title: list.title,
            color: list.color,
            source: list.source,
        };
        state.lists.push(created.clone());
        state.writes += 1;
        Ok(created)
    }

    async fn stage_task_removal(&self, task: &TaskId) -> SyncResult<()> {
        let mut state = self.state();
        if state.fail_removal.contains(task) || !state.tasks.iter().any(|t| &t.id == task) {
            return Err(SyncError::TaskDelete {
                task: task.to_string(),
                reason: "reminder cannot be removed".into(),
            });
        }
        state.staged.push(StagedWrite::RemoveTask {
            task_id: task.clone(),
        });
        Ok(())
    }

    async fn stage_task(&self, task: NewTask) -> SyncResult<()> {
        self.state().staged.push(StagedWrite::SaveTask { task });
        Ok(())
    }

    async fn commit(&self) -> SyncResult<usize> {
        let mut state = self.state();
        let writes = std::mem::take(&mut state.staged);

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(SyncError::Commit("store rejected the transaction".into()));
        }

        let mut tasks = state.tasks.clone();
        apply(&state.lists, &mut tasks, &writes).map_err(SyncError::Commit)?;
        state.tasks = tasks;
        state.writes += writes.len();
        Ok(writes.len())
    }

    async fn discard(&self) -> SyncResult<()> {
        self.state().staged.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_task(list: &ListId, title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            due: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            list: list.clone(),
        }
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let provider = MemoryProvider::new().with_task_list("Work");
        let list = provider.list_titled("Work").unwrap();

        provider.stage_task(new_task(&list.id, "Standup")).await.unwrap();
        assert!(provider.tasks_in("Work").is_empty());

        assert_eq!(provider.commit().await.unwrap(), 1);
        assert_eq!(provider.tasks_in("Work").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_drops_staged_writes() {
        let provider = MemoryProvider::new().with_task_list("Work").fail_commits(1);
        let list = provider.list_titled("Work").unwrap();

        provider.stage_task(new_task(&list.id, "Standup")).await.unwrap();
        assert!(matches!(provider.commit().await, Err(SyncError::Commit(_))));
        assert_eq!(provider.staged_count(), 0);
        assert!(provider.tasks_in("Work").is_empty());
        assert_eq!(provider.write_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let provider = MemoryProvider::new().with_task_list("Work");
        let list = provider.list_titled("Work").unwrap();

        provider.stage_task(new_task(&list.id, "Standup")).await.unwrap();
        provider
            .stage_task(new_task(&ListId::new("missing"), "Lost"))
            .await
            .unwrap();

        assert!(provider.commit().await.is_err());
        assert!(provider.all_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_read_faults_are_per_operation() {
        let provider = MemoryProvider::new()
            .with_task_list("Work")
            .with_task_list("Home")
            .fail_reads_of(Read::TasksIn("Home".into()));
        let work = provider.list_titled("Work").unwrap();
        let home = provider.list_titled("Home").unwrap();

        assert!(provider.tasks(&work.id).await.is_ok());
        assert!(matches!(
            provider.tasks(&home.id).await,
            Err(SyncError::Provider(_))
        ));
        assert_eq!(provider.task_lists().await.unwrap().len(), 2);

        let provider = provider.fail_reads_of(Read::TaskLists);
        assert!(provider.task_lists().await.is_err());
    }

    #[tokio::test]
    async fn test_colors_unavailable_for_first_queries() {
        let provider = MemoryProvider::new()
            .with_calendar(
                Calendar::new("c1", "Work").with_color(NativeColor::device_rgb(0.0, 0.0, 1.0)),
            )
            .colors_unavailable_for(1);

        assert!(!provider.calendars().await.unwrap()[0].color_resolved());
        assert!(provider.calendars().await.unwrap()[0].color_resolved());
    }
}
