//! Task use-cases, including bulk CSV import.
//!
//! # Responsibility
//! - Create, update, list and tombstone tasks.
//! - Turn parsed CSV rows into tasks and persist them as one batch.
//!
//! # Invariants
//! - A task never references a project that is missing or tombstoned at
//!   write time.
//! - Import resolves project names case-insensitively and creates missing
//!   projects once per distinct name.

use crate::import::csv_import::{parse_task_csv, CsvImportOptions, ImportError};
use crate::model::normalize_optional_text;
use crate::model::task::{
    project_name_key, ProjectId, Task, TaskId, TaskPriority, TaskProject, TaskStatus,
};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    Import(ImportError),
    TaskNotFound(TaskId),
    ProjectNotFound(ProjectId),
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Import(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Import(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::TaskNotFound(_) | Self::ProjectNotFound(_) => None,
        }
    }
}

impl From<ImportError> for TaskServiceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "task",
                id,
            } => Self::TaskNotFound(id),
            RepoError::NotFound {
                entity: "project",
                id,
            } => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Form input for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<ProjectId>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Outcome of one CSV import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Data rows dropped as malformed or untitled.
    pub skipped: usize,
    /// Projects created for unknown project names, in first-seen order.
    pub created_projects: Vec<TaskProject>,
    /// Inserted task ids in input order.
    pub task_ids: Vec<TaskId>,
}

pub struct TaskService<T: TaskRepository, P: ProjectRepository> {
    tasks: T,
    projects: P,
}

impl<T: TaskRepository, P: ProjectRepository> TaskService<T, P> {
    pub fn new(tasks: T, projects: P) -> Self {
        Self { tasks, projects }
    }

    pub fn create_task(&self, input: NewTask) -> TaskServiceResult<Task> {
        if let Some(project_id) = input.project_id {
            self.ensure_project(project_id)?;
        }

        let mut task = Task::new(input.title);
        task.description = normalize_optional_text(input.description.as_deref());
        task.project_id = input.project_id;
        task.status = input.status;
        task.priority = input.priority;
        task.due_date = input.due_date;

        self.tasks.create_task(&task)?;
        Ok(task)
    }

    /// Replaces every editable field of an existing task.
    pub fn update_task(&self, task: &Task) -> TaskServiceResult<Task> {
        if let Some(project_id) = task.project_id {
            self.ensure_project(project_id)?;
        }
        self.tasks.update_task(task)?;
        self.require(task.id)
    }

    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> TaskServiceResult<Task> {
        self.tasks.set_task_status(id, status)?;
        self.require(id)
    }

    pub fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.tasks.get_task(id, false)
    }

    pub fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        self.tasks.list_tasks(query)
    }

    pub fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        self.tasks.soft_delete_task(id)?;
        Ok(())
    }

    /// Parses `text` and bulk-inserts every accepted row.
    ///
    /// Malformed rows are counted in `skipped`, never reported as errors.
    /// Nothing is written when the input is rejected. Tasks are inserted in
    /// one transaction; projects created for unknown names are committed
    /// before the task batch.
    pub fn import_csv(
        &self,
        text: &str,
        options: &CsvImportOptions,
    ) -> TaskServiceResult<ImportReport> {
        let started_at = Instant::now();
        info!("event=task_import module=service status=start bytes={}", text.len());

        let result = self.import_csv_inner(text, options);
        match &result {
            Ok(report) => info!(
                "event=task_import module=service status=ok duration_ms={} imported={} skipped={} created_projects={}",
                started_at.elapsed().as_millis(),
                report.imported,
                report.skipped,
                report.created_projects.len()
            ),
            Err(err) => error!(
                "event=task_import module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn import_csv_inner(
        &self,
        text: &str,
        options: &CsvImportOptions,
    ) -> TaskServiceResult<ImportReport> {
        let parsed = parse_task_csv(text, options)?;
        if let Some(project_id) = options.default_project {
            self.ensure_project(project_id)?;
        }
        // An explicit project id wins over a project name.
        let default_name = options
            .default_project_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty() && options.default_project.is_none());

        let mut resolved: HashMap<String, ProjectId> = HashMap::new();
        let mut created_projects = Vec::new();
        let mut batch = Vec::with_capacity(parsed.rows.len());

        for row in parsed.rows {
            let project_id = match row.project_name.as_deref().or(default_name) {
                Some(name) => {
                    Some(self.resolve_project(name, &mut resolved, &mut created_projects)?)
                }
                None => options.default_project,
            };

            let mut task = Task::new(row.title);
            task.description = normalize_optional_text(row.description.as_deref());
            task.project_id = project_id;
            task.priority = row.priority;
            task.status = row.status;
            task.due_date = row.due_date;
            batch.push(task);
        }

        let task_ids = if batch.is_empty() {
            Vec::new()
        } else {
            self.tasks.create_tasks(&batch)?
        };

        Ok(ImportReport {
            imported: task_ids.len(),
            skipped: parsed.skipped,
            created_projects,
            task_ids,
        })
    }

    fn resolve_project(
        &self,
        name: &str,
        resolved: &mut HashMap<String, ProjectId>,
        created: &mut Vec<TaskProject>,
    ) -> TaskServiceResult<ProjectId> {
        let key = project_name_key(name);
        if let Some(id) = resolved.get(&key) {
            return Ok(*id);
        }

        let id = match self.projects.find_project_by_name(name)? {
            Some(existing) => existing.id,
            None => {
                let project = TaskProject::new(name);
                self.projects.create_project(&project)?;
                let id = project.id;
                created.push(project);
                id
            }
        };
        resolved.insert(key, id);
        Ok(id)
    }

    fn ensure_project(&self, id: ProjectId) -> TaskServiceResult<()> {
        match self.projects.get_project(id, false)? {
            Some(_) => Ok(()),
            None => Err(TaskServiceError::ProjectNotFound(id)),
        }
    }

    fn require(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.tasks
            .get_task(id, false)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }
}
