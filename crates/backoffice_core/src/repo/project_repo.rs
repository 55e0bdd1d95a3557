//! Task project persistence.
//!
//! # Invariants
//! - Active project names are unique by `project_name_key` (trimmed,
//!   Unicode-lowercased), enforced by a partial unique index.
//! - Deletion is a tombstone; tasks keep their `project_uuid`.

use super::{bool_to_int, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::db::now_epoch_ms;
use crate::model::task::{project_name_key, ProjectId, TaskProject};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    created_at,
    updated_at,
    is_deleted
FROM task_projects";

const ENTITY: &str = "project";

pub trait ProjectRepository {
    fn create_project(&self, project: &TaskProject) -> RepoResult<ProjectId>;
    fn update_project(&self, project: &TaskProject) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId, include_deleted: bool)
        -> RepoResult<Option<TaskProject>>;
    /// Lookup among active projects by folded name.
    fn find_project_by_name(&self, name: &str) -> RepoResult<Option<TaskProject>>;
    fn list_projects(&self, include_deleted: bool) -> RepoResult<Vec<TaskProject>>;
    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn ensure_name_available(&self, project: &TaskProject) -> RepoResult<()> {
        if project.is_deleted {
            return Ok(());
        }
        let name = project.name.as_str();
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM task_projects
                WHERE name_key = ?1
                  AND is_deleted = 0
                  AND uuid <> ?2
            );",
            params![project_name_key(name), project.id.to_string()],
            |row| row.get(0),
        )?;
        if taken == 1 {
            return Err(RepoError::Conflict(format!(
                "project name `{}` is already in use",
                name.trim()
            )));
        }
        Ok(())
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &TaskProject) -> RepoResult<ProjectId> {
        project.validate()?;
        self.ensure_name_available(project)?;

        self.conn.execute(
            "INSERT INTO task_projects (
                uuid,
                name,
                name_key,
                description,
                created_at,
                updated_at,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                project.id.to_string(),
                project.name.trim(),
                project_name_key(&project.name),
                project.description.as_deref(),
                project.created_at,
                project.updated_at,
                bool_to_int(project.is_deleted),
            ],
        )?;

        Ok(project.id)
    }

    fn update_project(&self, project: &TaskProject) -> RepoResult<()> {
        project.validate()?;
        self.ensure_name_available(project)?;

        let changed = self.conn.execute(
            "UPDATE task_projects
             SET
                name = ?1,
                name_key = ?2,
                description = ?3,
                is_deleted = ?4,
                updated_at = MAX(created_at, ?5)
             WHERE uuid = ?6;",
            params![
                project.name.trim(),
                project_name_key(&project.name),
                project.description.as_deref(),
                bool_to_int(project.is_deleted),
                now_epoch_ms(),
                project.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                id: project.id,
            });
        }
        Ok(())
    }

    fn get_project(
        &self,
        id: ProjectId,
        include_deleted: bool,
    ) -> RepoResult<Option<TaskProject>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn find_project_by_name(&self, name: &str) -> RepoResult<Option<TaskProject>> {
        let key = project_name_key(name);
        if key.is_empty() {
            return Ok(None);
        }

        let uuid_text: Option<String> = self
            .conn
            .query_row(
                "SELECT uuid
                 FROM task_projects
                 WHERE name_key = ?1
                   AND is_deleted = 0;",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match uuid_text {
            Some(text) => {
                let id = parse_uuid(&text, "task_projects.uuid")?;
                self.get_project(id, false)
            }
            None => Ok(None),
        }
    }

    fn list_projects(&self, include_deleted: bool) -> RepoResult<Vec<TaskProject>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        if !include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        sql.push_str(" ORDER BY name_key ASC, uuid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE task_projects
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

fn parse_project_row(row: &Row<'_>) -> RepoResult<TaskProject> {
    let uuid_text: String = row.get("uuid")?;
    let project = TaskProject {
        id: parse_uuid(&uuid_text, "task_projects.uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "task_projects.is_deleted")?,
    };
    project
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("task_projects row {uuid_text}: {err}")))?;
    Ok(project)
}
