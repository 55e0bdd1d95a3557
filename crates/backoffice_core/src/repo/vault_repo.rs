//! Vault item persistence.
//!
//! Only ciphertext reaches this layer. Deletion is a hard delete.

use super::{parse_uuid, RepoError, RepoResult};
use crate::db::now_epoch_ms;
use crate::model::vault::{VaultItem, VaultItemId, VaultItemType};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const VAULT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    item_type,
    platform,
    username,
    encrypted_value,
    notes,
    created_at,
    updated_at
FROM vault_items";

const ENTITY: &str = "vault item";

/// Filter options for vault listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultListQuery {
    pub item_type: Option<VaultItemType>,
    /// Case-insensitive substring over name and platform.
    pub search: Option<String>,
}

pub trait VaultRepository {
    fn create_item(&self, item: &VaultItem) -> RepoResult<VaultItemId>;
    /// Replaces metadata and ciphertext of an existing item.
    fn update_item(&self, item: &VaultItem) -> RepoResult<()>;
    fn get_item(&self, id: VaultItemId) -> RepoResult<Option<VaultItem>>;
    fn list_items(&self, query: &VaultListQuery) -> RepoResult<Vec<VaultItem>>;
    fn delete_item(&self, id: VaultItemId) -> RepoResult<()>;
}

pub struct SqliteVaultRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVaultRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VaultRepository for SqliteVaultRepository<'_> {
    fn create_item(&self, item: &VaultItem) -> RepoResult<VaultItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO vault_items (
                uuid,
                name,
                item_type,
                platform,
                username,
                encrypted_value,
                notes,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                item.id.to_string(),
                item.name.trim(),
                item.item_type.as_str(),
                item.platform.as_deref(),
                item.username.as_deref(),
                item.encrypted_value.as_str(),
                item.notes.as_deref(),
                item.created_at,
                item.updated_at,
            ],
        )?;

        Ok(item.id)
    }

    fn update_item(&self, item: &VaultItem) -> RepoResult<()> {
        item.validate()?;

        let changed = self.conn.execute(
            "UPDATE vault_items
             SET
                name = ?1,
                item_type = ?2,
                platform = ?3,
                username = ?4,
                encrypted_value = ?5,
                notes = ?6,
                updated_at = MAX(created_at, ?7)
             WHERE uuid = ?8;",
            params![
                item.name.trim(),
                item.item_type.as_str(),
                item.platform.as_deref(),
                item.username.as_deref(),
                item.encrypted_value.as_str(),
                item.notes.as_deref(),
                now_epoch_ms(),
                item.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                id: item.id,
            });
        }
        Ok(())
    }

    fn get_item(&self, id: VaultItemId) -> RepoResult<Option<VaultItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VAULT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_vault_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self, query: &VaultListQuery) -> RepoResult<Vec<VaultItem>> {
        let mut sql = format!("{VAULT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(item_type) = query.item_type {
            sql.push_str(" AND item_type = ?");
            bind_values.push(Value::Text(item_type.as_str().to_string()));
        }

        if let Some(search) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(
                " AND (instr(lower(name), lower(?)) > 0
                       OR instr(lower(coalesce(platform, '')), lower(?)) > 0)",
            );
            bind_values.push(Value::Text(search.to_string()));
            bind_values.push(Value::Text(search.to_string()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_vault_row(row)?);
        }
        Ok(items)
    }

    fn delete_item(&self, id: VaultItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM vault_items WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: ENTITY, id });
        }
        Ok(())
    }
}

fn parse_vault_row(row: &Row<'_>) -> RepoResult<VaultItem> {
    let uuid_text: String = row.get("uuid")?;
    let type_text: String = row.get("item_type")?;
    let item_type = VaultItemType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid item type `{type_text}` in vault_items.item_type"
        ))
    })?;

    let item = VaultItem {
        id: parse_uuid(&uuid_text, "vault_items.uuid")?,
        name: row.get("name")?,
        item_type,
        platform: row.get("platform")?,
        username: row.get("username")?,
        encrypted_value: row.get("encrypted_value")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    item.validate()
        .map_err(|err| RepoError::InvalidData(format!("vault_items row {uuid_text}: {err}")))?;
    Ok(item)
}
