//! Task project use-cases.
//!
//! # Invariants
//! - Names are trimmed before persistence; blank names never reach storage.
//! - Descriptions are trimmed and empty text is stored as `None`.

use crate::model::normalize_optional_text;
use crate::model::task::{ProjectId, TaskProject};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::{RepoError, RepoResult};

pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a project. Duplicate active names yield `RepoError::Conflict`.
    pub fn create_project(
        &self,
        name: impl Into<String>,
        description: Option<&str>,
    ) -> RepoResult<TaskProject> {
        let mut project = TaskProject::new(name);
        project.description = normalize_optional_text(description);
        self.repo.create_project(&project)?;
        Ok(project)
    }

    pub fn rename_project(&self, id: ProjectId, name: impl Into<String>) -> RepoResult<TaskProject> {
        let mut project = self.require(id)?;
        project.name = name.into().trim().to_string();
        self.repo.update_project(&project)?;
        self.require(id)
    }

    pub fn set_description(
        &self,
        id: ProjectId,
        description: Option<&str>,
    ) -> RepoResult<TaskProject> {
        let mut project = self.require(id)?;
        project.description = normalize_optional_text(description);
        self.repo.update_project(&project)?;
        self.require(id)
    }

    pub fn get_project(&self, id: ProjectId) -> RepoResult<Option<TaskProject>> {
        self.repo.get_project(id, false)
    }

    pub fn find_project_by_name(&self, name: &str) -> RepoResult<Option<TaskProject>> {
        self.repo.find_project_by_name(name)
    }

    pub fn list_projects(&self) -> RepoResult<Vec<TaskProject>> {
        self.repo.list_projects(false)
    }

    pub fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        self.repo.soft_delete_project(id)
    }

    fn require(&self, id: ProjectId) -> RepoResult<TaskProject> {
        self.repo
            .get_project(id, false)?
            .ok_or(RepoError::NotFound {
                entity: "project",
                id,
            })
    }
}
