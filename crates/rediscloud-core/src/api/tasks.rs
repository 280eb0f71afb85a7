//! Asynchronous task resources
//!
//! Every mutation (and a handful of reads) answers with a task that must be
//! polled at `/tasks/{taskId}` until it leaves the processing states.
//!
//! The `redis-cloud` task models type `response.error` as a string, while a
//! failed task reports an object (`type`, `status`, `description`). The
//! model here accepts both, so typed submissions are converted into it with
//! [`TaskStateUpdate::from_task`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::CloudClient;
use crate::error::{CoreError, ResourceFamily, Result};

/// A task as returned by the API, either on submission or when polled
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStateUpdate {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub command_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub response: Option<TaskResponse>,
}

/// Outcome payload of a finished task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(default)]
    pub resource_id: Option<i64>,
    #[serde(default)]
    pub additional_resource_id: Option<i64>,
    #[serde(default)]
    pub resource: Option<Value>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TaskErrorBody")]
pub struct TaskError {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskErrorBody {
    Message(String),
    Detail {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<TaskErrorBody> for TaskError {
    fn from(body: TaskErrorBody) -> Self {
        match body {
            TaskErrorBody::Message(message) => TaskError {
                kind: Some(message),
                ..TaskError::default()
            },
            TaskErrorBody::Detail {
                kind,
                status,
                description,
            } => TaskError {
                kind,
                status,
                description,
            },
        }
    }
}

impl TaskError {
    /// Server description, falling back to the error type
    pub fn message(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.kind.clone())
            .unwrap_or_else(|| "unknown task error".to_string())
    }

    /// True when the task failed because its target does not exist
    pub fn is_not_found(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.starts_with("404"))
            || self.kind.as_deref().is_some_and(|k| k.ends_with("NOT_FOUND"))
    }
}

impl TaskStateUpdate {
    /// Convert a task returned by a `redis-cloud` typed handler
    pub fn from_task<T: Serialize>(task: &T) -> Result<Self> {
        Self::from_submission(serde_json::to_value(task)?)
    }

    /// Extract the submitted task ID from a mutation response
    pub fn from_submission(response: Value) -> Result<Self> {
        let task: TaskStateUpdate = serde_json::from_value(response)?;
        if task.task_id.is_none() {
            return Err(CoreError::TaskFailed("No task ID returned".to_string()));
        }
        Ok(task)
    }

    /// ID of the resource the task created or modified
    pub fn resource_id(&self) -> Result<i64> {
        self.response
            .as_ref()
            .and_then(|r| r.resource_id)
            .ok_or_else(|| CoreError::TaskFailed("No resource ID in completed task".to_string()))
    }

    /// The resource body some read tasks return
    pub fn resource(&self) -> Value {
        self.response
            .as_ref()
            .and_then(|r| r.resource.clone())
            .unwrap_or(Value::Null)
    }
}

/// Handler for the task endpoint
#[derive(Debug, Clone)]
pub struct TaskHandler {
    client: CloudClient,
}

impl TaskHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn get_task_by_id(&self, task_id: &str) -> Result<TaskStateUpdate> {
        self.client
            .get(ResourceFamily::Task, &format!("/tasks/{}", task_id))
            .await
    }
}
