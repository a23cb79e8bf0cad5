//! tasksync task commands
//!
//! Every command goes through the task store so local ordering and rollback
//! behave exactly as they do for library users.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::gateway::{Pagination, TaskGateway};
use crate::output::{emit_success, format_task_line, HumanOutput, OutputOptions};
use crate::task::{parse_api_date, OrderAssignment, Task, TaskDraft, TaskId, TaskPatch};

use super::{AppContext, Commands};

#[derive(Serialize)]
struct ListReport {
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct DeleteReport {
    id: TaskId,
    deleted: bool,
}

#[derive(Serialize)]
struct ReorderReport {
    updated: Vec<Task>,
    skipped: Vec<TaskId>,
    tasks: Vec<Task>,
}

pub async fn run(command: Commands, context: &AppContext, output: OutputOptions) -> Result<()> {
    match command {
        Commands::List {
            date,
            completed,
            pending,
            search,
        } => {
            let date = date.as_deref().map(parse_api_date).transpose()?;
            run_list(context, output, date, completed, pending, search).await
        }
        Commands::Show { id } => run_show(context, output, id).await,
        Commands::Add {
            title,
            description,
            due,
            completed,
        } => {
            let draft = TaskDraft {
                title,
                description,
                due_date: due.as_deref().map(parse_api_date).transpose()?,
                completed: completed.then_some(true),
            };
            run_add(context, output, draft).await
        }
        Commands::Edit {
            id,
            title,
            description,
            clear_description,
            due,
            clear_due,
            order,
            completed,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            let due_date = if clear_due {
                Some(None)
            } else {
                due.as_deref().map(parse_api_date).transpose()?.map(Some)
            };
            let patch = TaskPatch {
                title,
                description,
                due_date,
                completed,
                order,
            };
            run_edit(context, output, id, patch).await
        }
        Commands::Rm { id } => run_rm(context, output, id).await,
        Commands::Toggle { id } => run_toggle(context, output, id).await,
        Commands::Reorder { assignments } => {
            let assignments = assignments
                .iter()
                .map(|raw| raw.parse::<OrderAssignment>())
                .collect::<Result<Vec<_>>>()?;
            run_reorder(context, output, assignments).await
        }
        Commands::Config(_) => Err(Error::InvalidArgument(
            "config commands do not talk to the task API".to_string(),
        )),
    }
}

async fn run_list(
    context: &AppContext,
    output: OutputOptions,
    date: Option<NaiveDate>,
    completed: bool,
    pending: bool,
    search: Option<String>,
) -> Result<()> {
    let store = &context.store;
    store.fetch(date).await?;

    let mut tasks = match search.as_deref() {
        Some(query) => {
            // Search spans every task; fetch them here so failures surface.
            if !store.loaded_all() {
                store.fetch(None).await?;
            }
            store.set_search_query(query).await;
            store.filtered_tasks()
        }
        None => store.tasks(),
    };
    if completed {
        tasks.retain(|task| task.completed);
    } else if pending {
        tasks.retain(|task| !task.completed);
    }

    let pagination = store.pagination();
    let mut human = HumanOutput::new(format!("tasksync list: {} task(s)", tasks.len()));
    if let Some(date) = date {
        human.push_summary("due", date.to_string());
    }
    if let Some(query) = &search {
        human.push_summary("search", query.clone());
    }
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if let Some(page) = pagination.as_ref().filter(|page| page.has_more()) {
        human.push_warning(format!(
            "showing page {} of {} ({} tasks total)",
            page.current_page, page.last_page, page.total
        ));
        human.push_next_step("raise tasks.per_page in tasksync.toml");
    }

    let report = ListReport {
        count: tasks.len(),
        date,
        search,
        pagination,
        tasks,
    };
    emit_success(output, "list", &report, Some(&human))
}

async fn run_show(context: &AppContext, output: OutputOptions, id: TaskId) -> Result<()> {
    let task = context.store.gateway().get(id).await?;

    let mut human = HumanOutput::new(format_task_line(&task));
    if let Some(description) = &task.description {
        human.push_summary("description", description.clone());
    }
    human.push_summary("created", task.created_at.to_rfc3339());
    human.push_summary("updated", task.updated_at.to_rfc3339());
    emit_success(output, "show", &task, Some(&human))
}

async fn run_add(context: &AppContext, output: OutputOptions, draft: TaskDraft) -> Result<()> {
    draft.validate()?;
    let task = context.store.create(&draft).await?;

    let mut human = HumanOutput::new(format!("tasksync add: created #{}", task.id));
    human.push_detail(format_task_line(&task));
    emit_success(output, "add", &task, Some(&human))
}

async fn run_edit(
    context: &AppContext,
    output: OutputOptions,
    id: TaskId,
    patch: TaskPatch,
) -> Result<()> {
    patch.validate()?;
    let task = context.store.update(id, &patch).await?;

    let mut human = HumanOutput::new(format!("tasksync edit: updated #{}", task.id));
    human.push_detail(format_task_line(&task));
    emit_success(output, "edit", &task, Some(&human))
}

async fn run_rm(context: &AppContext, output: OutputOptions, id: TaskId) -> Result<()> {
    context.store.delete(id).await?;

    let human = HumanOutput::new(format!("tasksync rm: deleted #{id}"));
    emit_success(output, "rm", &DeleteReport { id, deleted: true }, Some(&human))
}

async fn run_toggle(context: &AppContext, output: OutputOptions, id: TaskId) -> Result<()> {
    let store = &context.store;
    store.fetch(None).await?;

    let task = store
        .toggle_completion(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Task {id} is not in the loaded task list")))?;

    let state = if task.completed { "completed" } else { "pending" };
    let mut human = HumanOutput::new(format!("tasksync toggle: #{id} is now {state}"));
    human.push_detail(format_task_line(&task));
    emit_success(output, "toggle", &task, Some(&human))
}

async fn run_reorder(
    context: &AppContext,
    output: OutputOptions,
    assignments: Vec<OrderAssignment>,
) -> Result<()> {
    let store = &context.store;
    store.fetch(None).await?;

    let skipped: Vec<TaskId> = assignments
        .iter()
        .map(|assignment| assignment.id)
        .filter(|id| store.task(*id).is_none())
        .collect();
    let updated = store.reorder(&assignments).await?;
    let tasks = store.tasks();

    let mut human = HumanOutput::new(format!(
        "tasksync reorder: {} task(s) updated",
        updated.len()
    ));
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    for id in &skipped {
        human.push_warning(format!("#{id} was not loaded locally"));
    }

    let report = ReorderReport {
        updated,
        skipped,
        tasks,
    };
    emit_success(output, "reorder", &report, Some(&human))
}
