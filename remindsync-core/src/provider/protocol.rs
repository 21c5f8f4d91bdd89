//! Defines the JSON protocol used for communication between remindsync
//! and provider binaries over stdin/stdout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::model::{Calendar, Event, ListId, NewTask, NewTaskList, SourceId, Task, TaskId, TaskList};
use crate::provider::{AccessGrant, AuthorizationStatus, Scope};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    RequestAccess,
    AuthorizationStatus,
    ListEvents,
    ListCalendars,
    ListTaskLists,
    ListTasks,
    DefaultSource,
    CreateTaskList,
    Commit,
}

/// Request sent from remindsync to provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from provider to remindsync.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

/// Ask for access to all listed scopes at once.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestAccess {
    pub scopes: Vec<Scope>,
}

impl ProviderCommand for RequestAccess {
    type Response = AccessGrant;
    fn command() -> Command {
        Command::RequestAccess
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetAuthorizationStatus {
    pub scope: Scope,
}

impl ProviderCommand for GetAuthorizationStatus {
    type Response = AuthorizationStatus;
    fn command() -> Command {
        Command::AuthorizationStatus
    }
}

/// List events within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<Event>;
    fn command() -> Command {
        Command::ListEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCalendars {}

impl ProviderCommand for ListCalendars {
    type Response = Vec<Calendar>;
    fn command() -> Command {
        Command::ListCalendars
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTaskLists {}

impl ProviderCommand for ListTaskLists {
    type Response = Vec<TaskList>;
    fn command() -> Command {
        Command::ListTaskLists
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTasks {
    pub list_id: ListId,
}

impl ProviderCommand for ListTasks {
    type Response = Vec<Task>;
    fn command() -> Command {
        Command::ListTasks
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DefaultSource {}

impl ProviderCommand for DefaultSource {
    type Response = SourceId;
    fn command() -> Command {
        Command::DefaultSource
    }
}

/// Create and persist a task list right away.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskList {
    pub list: NewTaskList,
}

impl ProviderCommand for CreateTaskList {
    type Response = TaskList;
    fn command() -> Command {
        Command::CreateTaskList
    }
}

/// A write buffered until the next commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StagedWrite {
    RemoveTask { task_id: TaskId },
    SaveTask { task: NewTask },
}

/// Apply a batch of writes as one transaction, in order.
#[derive(Debug, Serialize, Deserialize)]
pub struct Commit {
    pub writes: Vec<StagedWrite>,
}

impl ProviderCommand for Commit {
    type Response = usize;
    fn command() -> Command {
        Command::Commit
    }
}
