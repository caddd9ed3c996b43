use std::{fs, path::Path};

use serde::Deserialize;
use shared::{domain::TaskId, protocol::Task};
use thiserror::Error;
use tracing::{info, warn};

mod builtin;

/// Number of tasks in the published study design.
pub const STUDY_TASK_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog contains no tasks")]
    Empty,
    #[error("task {task}: {field} must not be empty")]
    EmptyField { task: TaskId, field: &'static str },
    #[error("task {task}: choice list must contain at least one option")]
    EmptyChoices { task: TaskId },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    title: String,
    initial_prompt: String,
    assistance: Vec<String>,
    update_prompt: String,
    #[serde(default)]
    choices: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<Task>,
}

impl TaskCatalog {
    /// Validates and freezes `tasks`. Ordinals are reassigned from position so
    /// the catalog order is always the presentation order.
    pub fn new(tasks: Vec<Task>) -> Result<Self, CatalogError> {
        if tasks.is_empty() {
            return Err(CatalogError::Empty);
        }

        let tasks = tasks
            .into_iter()
            .enumerate()
            .map(|(index, mut task)| {
                task.id = TaskId::from_index(index);
                validate_task(&task)?;
                Ok(task)
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        if tasks.len() != STUDY_TASK_COUNT {
            warn!(
                tasks = tasks.len(),
                expected = STUDY_TASK_COUNT,
                "catalog length differs from the study design"
            );
        }
        Ok(Self { tasks })
    }

    pub fn builtin() -> Self {
        Self {
            tasks: builtin::tasks(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;
        let tasks = file
            .tasks
            .into_iter()
            .map(|entry| Task {
                id: TaskId(0),
                title: entry.title,
                initial_prompt: entry.initial_prompt,
                assistance: entry.assistance,
                update_prompt: entry.update_prompt,
                choices: entry.choices,
            })
            .collect();
        Self::new(tasks)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), tasks = catalog.len(), "loaded task catalog");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn matches_study_design(&self) -> bool {
        self.tasks.len() == STUDY_TASK_COUNT
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }
}

fn validate_task(task: &Task) -> Result<(), CatalogError> {
    let required = [
        ("title", task.title.as_str()),
        ("initial_prompt", task.initial_prompt.as_str()),
        ("update_prompt", task.update_prompt.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(CatalogError::EmptyField {
                task: task.id,
                field,
            });
        }
    }

    if task.assistance.is_empty() || task.assistance.iter().any(|s| s.trim().is_empty()) {
        return Err(CatalogError::EmptyField {
            task: task.id,
            field: "assistance",
        });
    }

    if let Some(choices) = &task.choices {
        if choices.is_empty() {
            return Err(CatalogError::EmptyChoices { task: task.id });
        }
        if choices.iter().any(|c| c.trim().is_empty()) {
            return Err(CatalogError::EmptyField {
                task: task.id,
                field: "choices",
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
