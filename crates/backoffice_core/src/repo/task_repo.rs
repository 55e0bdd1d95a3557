//! Task persistence.
//!
//! # Invariants
//! - `status`/`priority` columns only hold enumeration identifiers.
//! - `due_date` is stored as ISO `YYYY-MM-DD` text.
//! - `create_tasks` inserts the whole batch or nothing.

use super::{bool_to_int, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::db::now_epoch_ms;
use crate::model::task::{ProjectId, Task, TaskId, TaskPriority, TaskStatus};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    title,
    description,
    status,
    priority,
    due_date,
    created_at,
    updated_at,
    is_deleted
FROM tasks";

const TASK_INSERT_SQL: &str = "INSERT INTO tasks (
    uuid,
    project_uuid,
    title,
    description,
    status,
    priority,
    due_date,
    created_at,
    updated_at,
    is_deleted
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);";

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";
const ENTITY: &str = "task";

/// Filter and pagination options for task lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub project_id: Option<ProjectId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    /// Inserts all tasks atomically, preserving input order.
    fn create_tasks(&self, tasks: &[Task]) -> RepoResult<Vec<TaskId>>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn set_task_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()>;
    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()>;
}

pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;
        insert_task(self.conn, task)?;
        Ok(task.id)
    }

    fn create_tasks(&self, tasks: &[Task]) -> RepoResult<Vec<TaskId>> {
        for task in tasks {
            task.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            insert_task(&tx, task)?;
            ids.push(task.id);
        }
        tx.commit()?;

        Ok(ids)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                project_uuid = ?1,
                title = ?2,
                description = ?3,
                status = ?4,
                priority = ?5,
                due_date = ?6,
                is_deleted = ?7,
                updated_at = MAX(created_at, ?8)
             WHERE uuid = ?9;",
            params![
                task.project_id.map(|id| id.to_string()),
                task.title.trim(),
                task.description.as_deref(),
                task.status.as_str(),
                task.priority.as_str(),
                task.due_date.map(format_due_date),
                bool_to_int(task.is_deleted),
                now_epoch_ms(),
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                id: task.id,
            });
        }
        Ok(())
    }

    fn set_task_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                status = ?1,
                updated_at = MAX(created_at, ?2)
             WHERE uuid = ?3
               AND is_deleted = 0;",
            params![status.as_str(), now_epoch_ms(), id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { entity: ENTITY, id });
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        if let Some(project_id) = query.project_id {
            sql.push_str(" AND project_uuid = ?");
            bind_values.push(Value::Text(project_id.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(priority) = query.priority {
            sql.push_str(" AND priority = ?");
            bind_values.push(Value::Text(priority.as_str().to_string()));
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                is_deleted = 1,
                updated_at = MAX(created_at, ?1)
             WHERE uuid = ?2;",
            params![now_epoch_ms(), id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { entity: ENTITY, id });
        }
        Ok(())
    }
}

fn insert_task(conn: &Connection, task: &Task) -> RepoResult<()> {
    conn.execute(
        TASK_INSERT_SQL,
        params![
            task.id.to_string(),
            task.project_id.map(|id| id.to_string()),
            task.title.trim(),
            task.description.as_deref(),
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date.map(format_due_date),
            task.created_at,
            task.updated_at,
            bool_to_int(task.is_deleted),
        ],
    )?;
    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "tasks.uuid")?;

    let project_id = match row.get::<_, Option<String>>("project_uuid")? {
        Some(text) => Some(parse_uuid(&text, "tasks.project_uuid")?),
        None => None,
    };

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let due_date = match row.get::<_, Option<String>>("due_date")? {
        Some(text) => Some(NaiveDate::parse_from_str(&text, DUE_DATE_FORMAT).map_err(|_| {
            RepoError::InvalidData(format!("invalid due date `{text}` in tasks.due_date"))
        })?),
        None => None,
    };

    let task = Task {
        id,
        project_id,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        due_date,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "tasks.is_deleted")?,
    };
    task.validate()
        .map_err(|err| RepoError::InvalidData(format!("tasks row {uuid_text}: {err}")))?;
    Ok(task)
}

fn format_due_date(date: NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}
