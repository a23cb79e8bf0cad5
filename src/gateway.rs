//! Remote task gateway
//!
//! The store only sees the API through [`TaskGateway`]. Implementations turn
//! every failure (transport error, non-2xx status, `success: false`) into an
//! [`Error`](crate::error::Error) carrying the best available message.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::task::{OrderAssignment, Task, TaskDraft, TaskId, TaskPatch};

/// Filter for list requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only tasks due on this date; `None` lists everything.
    pub date: Option<NaiveDate>,
    pub per_page: Option<u32>,
}

/// Pagination meta attached to list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Option<Pagination>,
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub meta: Option<Pagination>,
}

/// Body of a reorder request.
#[derive(Debug, Clone, Serialize)]
pub struct ReorderRequest<'a> {
    pub tasks: &'a [OrderAssignment],
}

/// Operations the task API offers.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// List tasks, optionally restricted to one due date
    async fn list(&self, query: ListQuery) -> Result<TaskPage>;

    /// Fetch a single task
    async fn get(&self, id: TaskId) -> Result<Task>;

    /// Create a task; the server assigns its id
    async fn create(&self, draft: &TaskDraft) -> Result<Task>;

    /// Apply a partial update
    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task>;

    /// Delete a task
    async fn delete(&self, id: TaskId) -> Result<()>;

    /// Flip the completion flag server-side
    async fn toggle_completion(&self, id: TaskId) -> Result<Task>;

    /// Apply a batch of order assignments and return the affected tasks
    async fn reorder(&self, assignments: &[OrderAssignment]) -> Result<Vec<Task>>;
}
