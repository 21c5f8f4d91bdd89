//! Provider subprocess protocol.
//!
//! This module handles communication with external provider binaries
//! (e.g., `remindsync-provider-eventkit`) using JSON over stdin/stdout.
//! Every call spawns the binary once, writes a single request line and
//! reads a single response.
//!
//! Task writes are buffered here and shipped to the provider in one
//! `commit` request, so the provider sees each batch as one transaction.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::model::{Calendar, Event, ListId, NewTask, NewTaskList, SourceId, Task, TaskId, TaskList};
use crate::provider::protocol::{
    Command, Commit, CreateTaskList, DefaultSource, GetAuthorizationStatus, ListCalendars,
    ListEvents, ListTaskLists, ListTasks, ProviderCommand, Request, RequestAccess, Response,
    StagedWrite,
};
use crate::provider::{AccessGrant, AuthorizationStatus, Provider, Scope};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
/// Access requests may wait on the user answering a system prompt.
const ACCESS_TIMEOUT: Duration = Duration::from_secs(300);

pub struct SubprocessProvider {
    name: String,
    staged: Mutex<Vec<StagedWrite>>,
}

impl SubprocessProvider {
    pub fn from_name(name: &str) -> Self {
        SubprocessProvider {
            name: name.to_string(),
            staged: Mutex::new(Vec::new()),
        }
    }

    fn binary_name(&self) -> String {
        format!("remindsync-provider-{}", self.name)
    }

    fn binary_path(&self) -> SyncResult<PathBuf> {
        which::which(self.binary_name())
            .map_err(|_| SyncError::ProviderNotInstalled(self.name.clone()))
    }

    /// Call a typed provider command and return the result.
    async fn call<C: ProviderCommand>(&self, cmd: C) -> SyncResult<C::Response> {
        self.call_within(PROVIDER_TIMEOUT, cmd).await
    }

    async fn call_within<C: ProviderCommand>(
        &self,
        limit: Duration,
        cmd: C,
    ) -> SyncResult<C::Response> {
        timeout(limit, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| SyncError::ProviderTimeout(limit.as_secs()))?
    }

    /// Low-level call that sends a command with params and deserializes the response.
    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> SyncResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| SyncError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json =
            serde_json::to_string(&request).map_err(|e| SyncError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        debug!(provider = %self.name, ?command, "calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SyncError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SyncError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(SyncError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(SyncError::Provider("Provider returned no response".into()));
        }

        parse_response(&response_str)
    }

    async fn stage(&self, write: StagedWrite) {
        self.staged.lock().await.push(write);
    }
}

fn parse_response<R: DeserializeOwned>(response_str: &str) -> SyncResult<R> {
    let response: Response<R> = serde_json::from_str(response_str)
        .map_err(|e| SyncError::Provider(format!("Failed to parse response: {}", e)))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(SyncError::Provider(error)),
    }
}

#[async_trait]
impl Provider for SubprocessProvider {
    async fn request_access(&self, scopes: &[Scope]) -> SyncResult<AccessGrant> {
        self.call_within(
            ACCESS_TIMEOUT,
            RequestAccess {
                scopes: scopes.to_vec(),
            },
        )
        .await
    }

    async fn authorization_status(&self, scope: Scope) -> SyncResult<AuthorizationStatus> {
        self.call(GetAuthorizationStatus { scope }).await
    }

    async fn events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> SyncResult<Vec<Event>> {
        self.call(ListEvents {
            from: from.to_rfc3339(),
            to: to.to_rfc3339(),
        })
        .await
    }

    async fn calendars(&self) -> SyncResult<Vec<Calendar>> {
        self.call(ListCalendars {}).await
    }

    async fn task_lists(&self) -> SyncResult<Vec<TaskList>> {
        self.call(ListTaskLists {}).await
    }

    async fn tasks(&self, list: &ListId) -> SyncResult<Vec<Task>> {
        self.call(ListTasks {
            list_id: list.clone(),
        })
        .await
    }

    async fn default_source(&self) -> SyncResult<SourceId> {
        self.call(DefaultSource {}).await
    }

    async fn create_task_list(&self, list: NewTaskList) -> SyncResult<TaskList> {
        self.call(CreateTaskList { list }).await
    }

    async fn stage_task_removal(&self, task: &TaskId) -> SyncResult<()> {
        self.stage(StagedWrite::RemoveTask {
            task_id: task.clone(),
        })
        .await;
        Ok(())
    }

    async fn stage_task(&self, task: NewTask) -> SyncResult<()> {
        self.stage(StagedWrite::SaveTask { task }).await;
        Ok(())
    }

    async fn commit(&self) -> SyncResult<usize> {
        let writes = std::mem::take(&mut *self.staged.lock().await);
        if writes.is_empty() {
            return Ok(0);
        }

        self.call(Commit { writes })
            .await
            .map_err(|e| SyncError::Commit(e.to_string()))
    }

    async fn discard(&self) -> SyncResult<()> {
        self.staged.lock().await.clear();
        Ok(())
    }
}
