//! Back office schema history.
//!
//! 1. `task_projects` and `tasks`, with status/priority checks, a unique
//!    folded name key among active projects and per-project task indexes.
//! 2. `vault_items`, holding ciphertext only.
//!
//! Pending steps run inside one transaction and the reached step is
//! written to `PRAGMA user_version`. A database stamped with a step this
//! build does not know is refused rather than downgraded.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "tasks",
        sql: include_str!("0001_tasks.sql"),
    },
    SchemaStep {
        version: 2,
        name: "vault",
        sql: include_str!("0002_vault.sql"),
    },
];

/// Highest schema step this build can open.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the tasks and vault tables up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stamped: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();
    if stamped > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stamped,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > stamped)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=step version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={stamped} to_version={latest}");
    Ok(())
}
