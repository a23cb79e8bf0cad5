#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tasksync::error::{Error, Result};
use tasksync::gateway::{ListQuery, Pagination, TaskGateway, TaskPage};
use tasksync::task::{OrderAssignment, Task, TaskDraft, TaskId, TaskPatch};
use tokio::sync::Notify;

pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_757_000_000 + offset_secs, 0)
        .single()
        .expect("valid timestamp")
}

pub fn task(id: TaskId, order: Option<i64>, created_offset: i64) -> Task {
    Task {
        id,
        title: format!("Task {id}"),
        description: None,
        completed: false,
        created_at: ts(created_offset),
        updated_at: ts(created_offset),
        due_date: None,
        user_id: 1,
        order,
    }
}

pub fn ids(tasks: &[Task]) -> Vec<TaskId> {
    tasks.iter().map(|t| t.id).collect()
}

/// Asserts the local ordering rule: ascending order, missing last, then oldest first.
pub fn assert_sorted(tasks: &[Task]) {
    for pair in tasks.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let ok = match (a.order, b.order) {
            (Some(x), Some(y)) if x != y => x < y,
            (None, Some(_)) => false,
            (Some(_), None) => true,
            _ => a.created_at <= b.created_at,
        };
        assert!(ok, "tasks out of order: #{} before #{}", a.id, b.id);
    }
}

/// Pauses the next gateway call until released.
#[derive(Clone)]
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct Inner {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicU64,
    failures: Mutex<VecDeque<Error>>,
    hold: Mutex<Option<Hold>>,
    calls: Mutex<Vec<String>>,
    renumber_reorder: Mutex<bool>,
    pagination: Mutex<Option<Pagination>>,
}

/// In-memory stand-in for the task API.
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<Inner>,
}

impl FakeGateway {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let gateway = Self::default();
        let max_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        gateway.inner.next_id.store(max_id, Ordering::SeqCst);
        *gateway.inner.tasks.lock().unwrap() = tasks;
        gateway
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: Error) {
        self.inner.failures.lock().unwrap().push_back(err);
    }

    pub fn hold_next(&self) -> Hold {
        let hold = Hold {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        *self.inner.hold.lock().unwrap() = Some(hold.clone());
        hold
    }

    /// Server renumbers reordered tasks 10, 20, 30... instead of using the
    /// submitted values.
    pub fn renumber_reorder(&self) {
        *self.inner.renumber_reorder.lock().unwrap() = true;
    }

    pub fn set_pagination(&self, pagination: Pagination) {
        *self.inner.pagination.lock().unwrap() = Some(pagination);
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.inner.tasks.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: &str) -> Result<()> {
        self.inner.calls.lock().unwrap().push(call.to_string());
        let hold = self.inner.hold.lock().unwrap().take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        match self.inner.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_task<R>(&self, id: TaskId, f: impl FnOnce(&mut Task) -> R) -> Result<R> {
        let mut tasks = self.inner.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?;
        Ok(f(task))
    }
}

#[async_trait]
impl TaskGateway for FakeGateway {
    async fn list(&self, query: ListQuery) -> Result<TaskPage> {
        self.enter("list").await?;
        let mut tasks: Vec<Task> = self
            .inner
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| query.date.map(|d| t.due_date == Some(d)).unwrap_or(true))
            .cloned()
            .collect();
        // The real API sorts newest first; the store must re-sort.
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(TaskPage {
            tasks,
            pagination: self.inner.pagination.lock().unwrap().clone(),
        })
    }

    async fn get(&self, id: TaskId) -> Result<Task> {
        self.enter("get").await?;
        self.with_task(id, |t| t.clone())
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task> {
        self.enter("create").await?;
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = ts(1_000 + id as i64);
        let task = Task {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            completed: draft.completed.unwrap_or(false),
            created_at: created,
            updated_at: created,
            due_date: draft.due_date,
            user_id: 1,
            order: None,
        };
        self.inner.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        self.enter("update").await?;
        self.with_task(id, |t| {
            if let Some(title) = &patch.title {
                t.title = title.clone();
            }
            if let Some(description) = &patch.description {
                t.description = description.clone();
            }
            if let Some(due) = patch.due_date {
                t.due_date = due;
            }
            if let Some(completed) = patch.completed {
                t.completed = completed;
            }
            if let Some(order) = patch.order {
                t.order = Some(order);
            }
            t.updated_at = ts(5_000);
            t.clone()
        })
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        self.enter("delete").await?;
        let mut tasks = self.inner.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(Error::NotFound("Resource not found".to_string()));
        }
        Ok(())
    }

    async fn toggle_completion(&self, id: TaskId) -> Result<Task> {
        self.enter("toggle").await?;
        self.with_task(id, |t| {
            t.completed = !t.completed;
            t.updated_at = ts(6_000);
            t.clone()
        })
    }

    async fn reorder(&self, assignments: &[OrderAssignment]) -> Result<Vec<Task>> {
        self.enter("reorder").await?;
        let renumber = *self.inner.renumber_reorder.lock().unwrap();
        let mut tasks = self.inner.tasks.lock().unwrap();
        let mut updated = Vec::new();
        for (index, assignment) in assignments.iter().enumerate() {
            if let Some(t) = tasks.iter_mut().find(|t| t.id == assignment.id) {
                t.order = Some(if renumber {
                    (index as i64 + 1) * 10
                } else {
                    assignment.order
                });
                updated.push(t.clone());
            }
        }
        Ok(updated)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
