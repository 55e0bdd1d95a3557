//! Core domain logic for the portfolio back office.
//! Tasks, projects, CSV task import and the encrypted vault live here;
//! frontends only call into this crate.

pub mod config;
pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod vault;

pub use config::{BackofficeConfig, ConfigError};
pub use import::csv_import::{parse_task_csv, CsvImportOptions, ImportError, ParsedImport};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{ProjectId, Task, TaskId, TaskPriority, TaskProject, TaskStatus};
pub use model::vault::{VaultItem, VaultItemId, VaultItemType};
pub use model::ValidationError;
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
pub use repo::vault_repo::{SqliteVaultRepository, VaultListQuery, VaultRepository};
pub use repo::{RepoError, RepoResult};
pub use service::project_service::ProjectService;
pub use service::task_service::{ImportReport, NewTask, TaskService, TaskServiceError};
pub use service::vault_service::{
    ClipboardSink, CopySource, NewVaultItem, VaultError, VaultMetadata, VaultService,
};
pub use vault::cipher::{CipherError, RemoteVaultCipher, VaultCipher};
pub use vault::clock::{Clock, SystemClock};
pub use vault::reveal::{RevealCache, DEFAULT_REVEAL_TTL_MS};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
