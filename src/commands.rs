use std::io::{BufRead, Write};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::{validate_form, validate_patch};
use crate::models::{FilterPatch, Task, TaskFormData, TaskPatch, TaskStatus};
use crate::state::{EmptyState, ListSummary, TaskService, TaskStore};
use crate::storage::KeyValueStore;

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn ok_value<T: Serialize>(data: T) -> CommandResult<Value> {
    match serde_json::to_value(data) {
        Ok(value) => ok(value),
        Err(error) => err(&format!("serialize error: {error}")),
    }
}

/// One request from the UI layer, tagged by `"command"`.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    AddTask { task: TaskFormData },
    UpdateTask { id: String, patch: TaskPatch },
    UpdateTaskStatus { id: String, status: TaskStatus },
    CycleTaskStatus { id: String },
    DeleteTask { id: String },
    SetFilters { filters: FilterPatch },
    ClearFilters,
    ToggleSortOrder,
    GetTask { id: String },
    ListTasks,
    ListFiltered,
    GetFilters,
}

/// A task as the list renders it: the stored fields plus display labels and
/// due-date flags relative to `today`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCard {
    #[serde(flatten)]
    pub task: Task,
    pub status_label: &'static str,
    pub priority_label: &'static str,
    pub overdue: bool,
    pub due_today: bool,
}

impl TaskCard {
    pub fn new(task: Task, today: NaiveDate) -> Self {
        Self {
            status_label: task.status.label(),
            priority_label: task.priority.label(),
            overdue: task.is_overdue(today),
            due_today: task.is_due_today(today),
            task,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilteredPayload {
    pub tasks: Vec<TaskCard>,
    pub summary: ListSummary,
    pub empty_state: EmptyState,
}

impl FilteredPayload {
    pub fn build<S: KeyValueStore>(store: &TaskStore<S>, today: NaiveDate) -> Self {
        Self {
            tasks: store
                .filtered_tasks()
                .iter()
                .cloned()
                .map(|task| TaskCard::new(task, today))
                .collect(),
            summary: store.summary(),
            empty_state: store.empty_state(),
        }
    }
}

pub fn handle_request<S: KeyValueStore>(
    store: &mut TaskStore<S>,
    request: Request,
) -> CommandResult<Value> {
    match request {
        Request::AddTask { task } => {
            if let Err(error) = validate_form(&task) {
                return err(&format!("invalid task: {error}"));
            }
            ok_value(store.add_task(task))
        }
        Request::UpdateTask { id, patch } => {
            if let Err(error) = validate_patch(&patch) {
                return err(&format!("invalid task: {error}"));
            }
            ok_value(store.update_task(&id, patch))
        }
        Request::UpdateTaskStatus { id, status } => {
            ok_value(store.update_task_status(&id, status))
        }
        Request::CycleTaskStatus { id } => ok_value(store.cycle_task_status(&id)),
        Request::DeleteTask { id } => ok_value(store.delete_task(&id)),
        Request::SetFilters { filters } => {
            store.set_filters(filters);
            ok_value(store.filters())
        }
        Request::ClearFilters => {
            store.clear_filters();
            ok_value(store.filters())
        }
        Request::ToggleSortOrder => {
            store.toggle_sort_order();
            ok_value(store.filters())
        }
        Request::GetTask { id } => ok_value(store.get_task_by_id(&id)),
        Request::ListTasks => ok_value(store.tasks()),
        Request::ListFiltered => {
            let today = chrono::Local::now().date_naive();
            ok_value(FilteredPayload::build(store, today))
        }
        Request::GetFilters => ok_value(store.filters()),
    }
}

pub fn handle_line<S: KeyValueStore>(
    store: &mut TaskStore<S>,
    line: &str,
) -> CommandResult<Value> {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(store, request),
        Err(error) => {
            log::warn!("commands: rejected request: {error}");
            err(&format!("invalid request: {error}"))
        }
    }
}

/// Answers one JSON request per input line with one JSON response line.
/// Blank lines are skipped. A line that is not UTF-8 gets an error response
/// like any other malformed request; only I/O failures end the loop.
pub fn serve<S: KeyValueStore>(
    store: &mut TaskStore<S>,
    mut input: impl BufRead,
    mut output: impl Write,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(store, line.trim_end_matches(['\r', '\n'])),
            Err(error) => {
                log::warn!("commands: rejected non-utf8 request: {error}");
                err(&format!("invalid request: {error}"))
            }
        };
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }
}
