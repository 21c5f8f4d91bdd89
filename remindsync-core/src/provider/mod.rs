//! Calendar/reminder provider interface.
//!
//! The provider owns the actual calendar and reminder storage. Reads are
//! plain queries; task writes are staged and only become visible on
//! `commit`, which applies every staged write as one transaction.

pub mod memory;
pub mod protocol;
pub mod subprocess;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::model::{Calendar, Event, ListId, NewTask, NewTaskList, SourceId, Task, TaskId, TaskList};

/// Access scopes a run needs from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    EventsRead,
    TasksReadWrite,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::EventsRead, Scope::TasksReadWrite];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
}

/// Outcome of an access request. Denial of any scope is a denial overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessGrant {
    Granted,
    Denied,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Ask for every scope in `scopes` in a single request.
    async fn request_access(&self, scopes: &[Scope]) -> SyncResult<AccessGrant>;

    async fn authorization_status(&self, scope: Scope) -> SyncResult<AuthorizationStatus>;

    /// Events starting in `[from, to)`, recurrences already expanded.
    async fn events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> SyncResult<Vec<Event>>;

    async fn calendars(&self) -> SyncResult<Vec<Calendar>>;

    async fn task_lists(&self) -> SyncResult<Vec<TaskList>>;

    async fn tasks(&self, list: &ListId) -> SyncResult<Vec<Task>>;

    /// Where new task lists are created by default.
    async fn default_source(&self) -> SyncResult<SourceId>;

    /// Create and persist a task list immediately.
    async fn create_task_list(&self, list: NewTaskList) -> SyncResult<TaskList>;

    async fn stage_task_removal(&self, task: &TaskId) -> SyncResult<()>;

    async fn stage_task(&self, task: NewTask) -> SyncResult<()>;

    /// Apply all staged writes. Returns how many writes were applied.
    /// On failure the staged writes are dropped.
    async fn commit(&self) -> SyncResult<usize>;

    /// Drop all staged writes without applying them.
    async fn discard(&self) -> SyncResult<()>;
}
