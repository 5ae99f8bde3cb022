pub mod commands;
pub mod config;
pub mod form;
pub mod id;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod view;

pub use models::{
    FilterPatch, FilterState, PriorityFilter, SortField, SortOrder, StatusFilter, Task,
    TaskFormData, TaskPatch, TaskPriority, TaskStatus,
};
pub use state::{EmptyState, ListSummary, TaskCommand, TaskService, TaskStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Persistence, StorageError};

/// Host entry point: resolve config, start file logging, open the store and
/// serve JSON-line commands on stdin/stdout until EOF.
#[cfg(all(feature = "app", not(test)))]
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::AppConfig::from_env();
    config.ensure_dirs()?;
    let _logger = logging::init_logging(config.data_dir())?;

    let backend = FileStore::new(config.data_dir().to_path_buf());
    backend.ensure_dirs()?;
    let mut store = TaskStore::open(Persistence::new(backend));
    log::info!(
        "task manager ready data_dir={} tasks={}",
        config.data_dir().display(),
        store.tasks().len()
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    commands::serve(&mut store, stdin.lock(), stdout.lock())?;
    log::info!("stdin closed, shutting down");
    Ok(())
}
