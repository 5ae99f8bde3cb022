use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use serde::Serialize;

use crate::id::generate_id;
use crate::models::{
    parse_due_date, FilterPatch, FilterState, Task, TaskFormData, TaskPatch, TaskStatus,
};
use crate::storage::{KeyValueStore, Persistence};
use crate::view::ViewCache;

/// Mutations accepted by [`TaskStore::dispatch`].
#[derive(Debug, Clone)]
pub enum TaskCommand {
    /// Prepends a fully built task.
    Add(Task),
    /// Replaces the task with the same id in place.
    Update(Task),
    Delete(String),
    SetTasks(Vec<Task>),
}

/// Applies `command` to `tasks`; returns whether the collection changed.
pub fn reduce(tasks: &mut Vec<Task>, command: TaskCommand) -> bool {
    match command {
        TaskCommand::Add(task) => {
            tasks.insert(0, task);
            true
        }
        TaskCommand::Update(task) => match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => false,
        },
        TaskCommand::Delete(id) => {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            tasks.len() != before
        }
        TaskCommand::SetTasks(next) => {
            *tasks = next;
            true
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    NoTasks,
    NoMatches,
    Populated,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ListSummary {
    pub shown: usize,
    pub total: usize,
    pub filtered: bool,
}

/// Consumer-facing contract of the task store.
pub trait TaskService {
    fn add_task(&mut self, form: TaskFormData) -> Task;
    fn update_task(&mut self, id: &str, patch: TaskPatch) -> Option<Task>;
    fn update_task_status(&mut self, id: &str, status: TaskStatus) -> Option<Task>;
    fn delete_task(&mut self, id: &str) -> bool;
    fn set_filters(&mut self, patch: FilterPatch);
    fn get_task_by_id(&self, id: &str) -> Option<&Task>;

    fn tasks(&self) -> &[Task];
    fn filtered_tasks(&self) -> Rc<[Task]>;
    fn filters(&self) -> &FilterState;
}

pub struct TaskStore<S: KeyValueStore> {
    tasks: Vec<Task>,
    filters: FilterState,
    version: u64,
    hydrated: bool,
    view: RefCell<ViewCache>,
    persistence: Persistence<S>,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Empty store. Call [`TaskStore::hydrate`] before issuing commands, or use
    /// [`TaskStore::open`].
    pub fn new(persistence: Persistence<S>) -> Self {
        Self {
            tasks: Vec::new(),
            filters: FilterState::default(),
            version: 0,
            hydrated: false,
            view: RefCell::new(ViewCache::new()),
            persistence,
        }
    }

    pub fn open(persistence: Persistence<S>) -> Self {
        let mut store = Self::new(persistence);
        store.hydrate();
        store
    }

    /// Loads the persisted snapshot. Only the first call does anything, and
    /// the snapshot is only adopted while the in-memory collection is empty.
    pub fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }
        self.hydrated = true;
        let loaded = self.persistence.load();
        log::info!("store: hydrate loaded={}", loaded.len());
        if !loaded.is_empty() && self.tasks.is_empty() {
            self.dispatch(TaskCommand::SetTasks(loaded));
        }
    }

    /// Single mutation entry point. Persists the whole collection when the
    /// command changed it.
    pub fn dispatch(&mut self, command: TaskCommand) -> bool {
        let changed = reduce(&mut self.tasks, command);
        if changed {
            self.version += 1;
            self.persistence.save(&self.tasks);
        }
        changed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// Advances the task along todo -> in-progress -> done -> todo.
    pub fn cycle_task_status(&mut self, id: &str) -> Option<Task> {
        let next = self.get_task_by_id(id)?.status.next();
        self.update_task_status(id, next)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn toggle_sort_order(&mut self) {
        self.filters.sort_order = self.filters.sort_order.toggled();
    }

    pub fn empty_state(&self) -> EmptyState {
        if self.tasks.is_empty() {
            EmptyState::NoTasks
        } else if self.filtered_tasks().is_empty() {
            EmptyState::NoMatches
        } else {
            EmptyState::Populated
        }
    }

    pub fn summary(&self) -> ListSummary {
        ListSummary {
            shown: self.filtered_tasks().len(),
            total: self.tasks.len(),
            filtered: self.filters.has_active_filters(),
        }
    }
}

impl<S: KeyValueStore> TaskService for TaskStore<S> {
    /// Never fails. A non-empty `due_date` that is not a `YYYY-MM-DD` date
    /// is stored as no due date and logged at warn; callers that need to
    /// reject it run [`crate::form::validate_form`] first.
    fn add_task(&mut self, form: TaskFormData) -> Task {
        let now = Utc::now();
        let due_date = parse_due_date(&form.due_date);
        if due_date.is_none() && !form.due_date.trim().is_empty() {
            log::warn!("store: ignoring unparseable due date {:?}", form.due_date);
        }
        let task = Task {
            id: generate_id(),
            title: form.title.trim().to_string(),
            description: form.description.trim().to_string(),
            status: form.status,
            priority: form.priority,
            due_date,
            created_at: now,
            updated_at: now,
        };
        log::debug!("store: add_task id={}", task.id);
        self.dispatch(TaskCommand::Add(task.clone()));
        task
    }

    /// Unknown ids are a no-op returning `None`. A present but unparseable
    /// `due_date` clears the due date, same as `""`, and is logged at warn.
    fn update_task(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let mut updated = self.get_task_by_id(id)?.clone();
        if let Some(title) = patch.title {
            updated.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            updated.description = description.trim().to_string();
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = parse_due_date(&due_date);
            if updated.due_date.is_none() && !due_date.trim().is_empty() {
                log::warn!("store: ignoring unparseable due date {due_date:?} for id={id}");
            }
        }
        updated.updated_at = Utc::now().max(updated.created_at);
        log::debug!("store: update_task id={id}");
        self.dispatch(TaskCommand::Update(updated.clone()));
        Some(updated)
    }

    fn update_task_status(&mut self, id: &str, status: TaskStatus) -> Option<Task> {
        self.update_task(id, TaskPatch::status(status))
    }

    fn delete_task(&mut self, id: &str) -> bool {
        let removed = self.dispatch(TaskCommand::Delete(id.to_string()));
        if removed {
            log::debug!("store: delete_task id={id}");
        }
        removed
    }

    fn set_filters(&mut self, patch: FilterPatch) {
        self.filters.merge(patch);
    }

    fn get_task_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Shared handle to the memoized view; repeated reads without an
    /// intervening change return the same allocation.
    fn filtered_tasks(&self) -> Rc<[Task]> {
        self.view
            .borrow_mut()
            .get_or_compute(self.version, &self.tasks, &self.filters)
    }

    fn filters(&self) -> &FilterState {
        &self.filters
    }
}
