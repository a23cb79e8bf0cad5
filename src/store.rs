//! Task synchronization store
//!
//! Holds the client-side copy of a user's tasks, mirrored from a
//! [`TaskGateway`]. Toggle and reorder are applied locally before the
//! gateway answers and rolled back if it fails; create, update and delete
//! wait for the server.
//!
//! Mutating operations are serialized: each holds the operation lock from
//! its first local write until it has reconciled or rolled back. Dropping an
//! operation's future mid-request rolls back as a failure would. Reads never
//! wait for the network and see the latest optimistic or reconciled state.

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use chrono::NaiveDate;
use tokio::sync::{watch, Mutex};

use crate::config::TasksConfig;
use crate::error::{Error, Result};
use crate::gateway::{ListQuery, Pagination, TaskGateway};
use crate::task::{sort_tasks, OrderAssignment, Task, TaskDraft, TaskId, TaskPatch};

const FETCH_FAILED: &str = "Failed to fetch tasks";
const CREATE_FAILED: &str = "Failed to create task";
const UPDATE_FAILED: &str = "Failed to update task";
const DELETE_FAILED: &str = "Failed to delete task";
const TOGGLE_FAILED: &str = "Failed to toggle task completion";
const REORDER_FAILED: &str = "Failed to reorder tasks";

/// Tunables for a [`TaskStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Page size sent with list requests
    pub per_page: Option<u32>,
}

impl From<&TasksConfig> for StoreOptions {
    fn from(config: &TasksConfig) -> Self {
        Self {
            per_page: config.per_page,
        }
    }
}

/// Everything the store knows, as one cloneable value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub is_loading: bool,
    /// Message of the last failed operation
    pub error: Option<String>,
    /// Due date of the last successful scoped fetch
    pub last_fetched_date: Option<NaiveDate>,
    /// Last successful fetch covered all tasks
    pub loaded_all: bool,
    pub search_query: String,
    pub pagination: Option<Pagination>,
}

/// Optimistic, server-reconciled task collection.
pub struct TaskStore<G> {
    gateway: G,
    options: StoreOptions,
    state: RwLock<StoreState>,
    ops: Mutex<()>,
    revision: watch::Sender<u64>,
}

impl<G: TaskGateway> TaskStore<G> {
    pub fn new(gateway: G, options: StoreOptions) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            gateway,
            options,
            state: RwLock::new(StoreState::default()),
            ops: Mutex::new(()),
            revision,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Tasks in display order.
    pub fn tasks(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.read().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<Task> {
        self.collect(|task| task.is_due_on(date))
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.collect(|task| task.completed)
    }

    pub fn pending_tasks(&self) -> Vec<Task> {
        self.collect(|task| !task.completed)
    }

    /// Tasks matching the current search query; all tasks when it is blank.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        let state = self.read();
        let needle = state.search_query.trim().to_lowercase();
        if needle.is_empty() {
            return state.tasks.clone();
        }
        state
            .tasks
            .iter()
            .filter(|task| task.matches_query(&needle))
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn last_fetched_date(&self) -> Option<NaiveDate> {
        self.read().last_fetched_date
    }

    pub fn loaded_all(&self) -> bool {
        self.read().loaded_all
    }

    pub fn search_query(&self) -> String {
        self.read().search_query.clone()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.read().pagination.clone()
    }

    pub fn snapshot(&self) -> StoreState {
        self.read().clone()
    }

    /// Current state revision; bumped on every change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch state revisions to learn when to re-read.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Replace local state with the server's tasks, all of them or those due
    /// on `date`. Local state is untouched on failure.
    pub async fn fetch(&self, date: Option<NaiveDate>) -> Result<Vec<Task>> {
        let _op = self.ops.lock().await;
        let loading = self.begin_loading();

        let query = ListQuery {
            date,
            per_page: self.options.per_page,
        };
        tracing::debug!(?date, "fetching tasks");

        match self.gateway.list(query).await {
            Ok(page) => {
                loading.disarm();
                let mut tasks = page.tasks;
                sort_tasks(&mut tasks);
                tracing::debug!(count = tasks.len(), "fetched tasks");
                self.mutate(|state| {
                    state.tasks = tasks.clone();
                    state.last_fetched_date = date;
                    state.loaded_all = date.is_none();
                    state.pagination = page.pagination;
                    state.is_loading = false;
                });
                Ok(tasks)
            }
            Err(err) => {
                loading.disarm();
                Err(self.fail(err, FETCH_FAILED))
            }
        }
    }

    /// Create a task and insert the server's record.
    pub async fn create(&self, draft: &TaskDraft) -> Result<Task> {
        let _op = self.ops.lock().await;
        let loading = self.begin_loading();

        match self.gateway.create(draft).await {
            Ok(task) => {
                loading.disarm();
                tracing::debug!(id = task.id, "created task");
                self.mutate(|state| {
                    upsert(&mut state.tasks, task.clone());
                    sort_tasks(&mut state.tasks);
                    state.is_loading = false;
                });
                Ok(task)
            }
            Err(err) => {
                loading.disarm();
                Err(self.fail(err, CREATE_FAILED))
            }
        }
    }

    /// Patch a task; the local copy changes only once the server confirms.
    pub async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        let _op = self.ops.lock().await;
        let loading = self.begin_loading();

        match self.gateway.update(id, patch).await {
            Ok(task) => {
                loading.disarm();
                tracing::debug!(id, "updated task");
                self.mutate(|state| {
                    replace(&mut state.tasks, task.clone());
                    sort_tasks(&mut state.tasks);
                    state.is_loading = false;
                });
                Ok(task)
            }
            Err(err) => {
                loading.disarm();
                Err(self.fail(err, UPDATE_FAILED))
            }
        }
    }

    pub async fn delete(&self, id: TaskId) -> Result<()> {
        let _op = self.ops.lock().await;
        let loading = self.begin_loading();

        match self.gateway.delete(id).await {
            Ok(()) => {
                loading.disarm();
                tracing::debug!(id, "deleted task");
                self.mutate(|state| {
                    state.tasks.retain(|task| task.id != id);
                    state.is_loading = false;
                });
                Ok(())
            }
            Err(err) => {
                loading.disarm();
                Err(self.fail(err, DELETE_FAILED))
            }
        }
    }

    /// Flip a task's completion flag right away, then confirm with the
    /// server. Returns `Ok(None)` without calling the gateway when the task
    /// is not loaded.
    pub async fn toggle_completion(&self, id: TaskId) -> Result<Option<Task>> {
        let _op = self.ops.lock().await;

        let previous = self.mutate(|state| {
            state.error = None;
            let task = state.tasks.iter_mut().find(|task| task.id == id)?;
            let previous = task.completed;
            task.completed = !previous;
            Some(previous)
        });
        let Some(previous) = previous else {
            tracing::debug!(id, "toggle skipped, task not loaded");
            return Ok(None);
        };
        let rollback = Rollback::new(self, move |state: &mut StoreState| {
            if let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) {
                task.completed = previous;
            }
        });

        match self.gateway.toggle_completion(id).await {
            Ok(task) => {
                rollback.disarm();
                self.mutate(|state| {
                    replace(&mut state.tasks, task.clone());
                    sort_tasks(&mut state.tasks);
                });
                Ok(Some(task))
            }
            Err(err) => {
                tracing::warn!(id, "toggle failed, restoring completion flag");
                drop(rollback);
                Err(self.fail(err, TOGGLE_FAILED))
            }
        }
    }

    /// Apply new sort orders locally, then send them to the server.
    ///
    /// Assignments for tasks that are not loaded are sent but not applied
    /// locally. On failure the whole collection is restored.
    pub async fn reorder(&self, assignments: &[OrderAssignment]) -> Result<Vec<Task>> {
        let _op = self.ops.lock().await;

        let snapshot = self.mutate(|state| {
            state.error = None;
            let snapshot = state.tasks.clone();
            for assignment in assignments {
                match state.tasks.iter_mut().find(|task| task.id == assignment.id) {
                    Some(task) => task.order = Some(assignment.order),
                    None => tracing::debug!(id = assignment.id, "reorder target not loaded"),
                }
            }
            sort_tasks(&mut state.tasks);
            snapshot
        });
        let rollback = Rollback::new(self, move |state: &mut StoreState| state.tasks = snapshot);

        match self.gateway.reorder(assignments).await {
            Ok(updated) => {
                rollback.disarm();
                self.mutate(|state| {
                    for task in &updated {
                        replace(&mut state.tasks, task.clone());
                    }
                    sort_tasks(&mut state.tasks);
                });
                Ok(updated)
            }
            Err(err) => {
                tracing::warn!(count = assignments.len(), "reorder failed, restoring snapshot");
                drop(rollback);
                Err(self.fail(err, REORDER_FAILED))
            }
        }
    }

    /// Set the search query. A non-blank query needs every task loaded, so
    /// this fetches all tasks unless that already happened; a failure there
    /// is only recorded in [`error`](Self::error).
    pub async fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        let needs_all = !query.trim().is_empty() && !self.loaded_all();
        self.mutate(|state| state.search_query = query);

        if needs_all {
            if let Err(err) = self.fetch(None).await {
                tracing::debug!(error = %err, "search prefetch failed");
            }
        }
    }

    pub fn clear_search(&self) {
        self.mutate(|state| state.search_query.clear());
    }

    pub fn clear_error(&self) {
        self.mutate(|state| state.error = None);
    }

    /// Drop all loaded tasks.
    pub fn clear(&self) {
        self.mutate(|state| {
            state.tasks.clear();
            state.last_fetched_date = None;
            state.loaded_all = false;
            state.pagination = None;
        });
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn collect(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.read()
            .tasks
            .iter()
            .filter(|task| keep(task))
            .cloned()
            .collect()
    }

    /// Run `f` under the write lock and publish a new revision.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let result = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    /// Mark a request in flight. The returned guard clears the flag again if
    /// the operation is dropped before it settles.
    fn begin_loading(&self) -> Rollback<'_, G> {
        self.mutate(|state| {
            state.error = None;
            state.is_loading = true;
        });
        Rollback::new(self, |state: &mut StoreState| state.is_loading = false)
    }

    /// Record a failure and hand the error back for propagation.
    fn fail(&self, err: Error, fallback: &str) -> Error {
        let text = err.to_string();
        let message = if text.trim().is_empty() {
            fallback.to_string()
        } else {
            text
        };
        tracing::debug!(%message, "task operation failed");
        self.mutate(|state| {
            state.error = Some(message);
            state.is_loading = false;
        });
        err
    }
}

type Undo<'a> = Box<dyn FnOnce(&mut StoreState) + Send + 'a>;

/// Undoes a local write when dropped armed.
///
/// Operations arm one right after their optimistic write and disarm it once
/// the gateway has answered successfully. Any other exit, including the
/// caller dropping the future mid-request, runs the undo.
struct Rollback<'a, G: TaskGateway> {
    store: &'a TaskStore<G>,
    undo: Option<Undo<'a>>,
}

impl<'a, G: TaskGateway> Rollback<'a, G> {
    fn new(store: &'a TaskStore<G>, undo: impl FnOnce(&mut StoreState) + Send + 'a) -> Self {
        Self {
            store,
            undo: Some(Box::new(undo)),
        }
    }

    fn disarm(mut self) {
        self.undo = None;
    }
}

impl<G: TaskGateway> Drop for Rollback<'_, G> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            self.store.mutate(undo);
        }
    }
}

/// Replace the task with the same id, if loaded.
fn replace(tasks: &mut [Task], updated: Task) {
    if let Some(slot) = tasks.iter_mut().find(|task| task.id == updated.id) {
        *slot = updated;
    }
}

/// Replace the task with the same id, or append it.
fn upsert(tasks: &mut Vec<Task>, task: Task) {
    match tasks.iter_mut().find(|existing| existing.id == task.id) {
        Some(slot) => *slot = task,
        None => tasks.push(task),
    }
}
