use std::path::{Path, PathBuf};

use directories::ProjectDirs;

pub const DATA_DIR_ENV: &str = "TASK_MANAGER_DATA_DIR";
const FALLBACK_DATA_DIR: &str = ".task-manager";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Holds the task snapshot and the log files.
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// `TASK_MANAGER_DATA_DIR` if set, else the platform data directory.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    fn resolve(override_dir: Option<PathBuf>) -> Self {
        let data_dir = override_dir
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| {
                ProjectDirs::from("", "", "task-manager").map(|dirs| dirs.data_dir().to_path_buf())
            })
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR));
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
