use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{Context, Task};

const TASKS_SUFFIX: &str = ".json";
const CONTEXTS_SUFFIX: &str = ".contexts.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(PathBuf, serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(path, err) => {
                write!(f, "failed to parse {}: {err}", path.display())
            }
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSON: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Persistence collaborator of the board: full loads at startup, full
/// saves afterwards.
pub trait TaskStore {
    fn load_tasks(&self) -> Result<Vec<Task>, StorageError>;
    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError>;
    /// Always starts with the "all" sentinel.
    fn load_contexts(&self) -> Result<Vec<Context>, StorageError>;
    /// The sentinel is skipped when writing.
    fn save_contexts(&self, contexts: &[Context]) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TasksFile {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContextsFile {
    #[serde(default)]
    contexts: Vec<Context>,
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    tasks_path: PathBuf,
    contexts_path: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: &Path, tasks_file: &str) -> Self {
        Self {
            tasks_path: data_dir.join(tasks_file),
            contexts_path: data_dir.join(contexts_file_name(tasks_file)),
        }
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub fn contexts_path(&self) -> &Path {
        &self.contexts_path
    }
}

impl TaskStore for JsonStore {
    fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let file: TasksFile = load_json(&self.tasks_path)?;
        Ok(file.tasks)
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let file = TasksFile {
            tasks: tasks.to_vec(),
        };
        write_atomic(&self.tasks_path, &file)
    }

    fn load_contexts(&self) -> Result<Vec<Context>, StorageError> {
        let file: ContextsFile = load_json(&self.contexts_path)?;
        let mut contexts = vec![Context::none()];
        contexts.extend(file.contexts.into_iter().filter(|context| !context.is_none()));
        Ok(contexts)
    }

    fn save_contexts(&self, contexts: &[Context]) -> Result<(), StorageError> {
        let file = ContextsFile {
            contexts: contexts
                .iter()
                .filter(|context| !context.is_none())
                .cloned()
                .collect(),
        };
        write_atomic(&self.contexts_path, &file)
    }
}

/// `tasks.json` keeps its contexts in `tasks.contexts.json`.
pub fn contexts_file_name(tasks_file: &str) -> String {
    let stem = tasks_file.strip_suffix(TASKS_SUFFIX).unwrap_or(tasks_file);
    format!("{stem}{CONTEXTS_SUFFIX}")
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).map_err(|err| StorageError::JsonDecode(path.to_path_buf(), err))
}

fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let json = serde_json::to_vec_pretty(data).map_err(StorageError::JsonEncode)?;
    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path).map_err(StorageError::Io)?;
        file.write_all(&json).map_err(StorageError::Io)?;
        file.write_all(b"\n").map_err(StorageError::Io)?;
        file.sync_all().map_err(StorageError::Io)?;
    }
    fs::rename(&temp_path, path).map_err(StorageError::Io)
}
