//! Vault item record.
//!
//! A vault item only ever carries ciphertext. Plaintext exists transiently
//! in `RevealCache` and in the values handed to a `ClipboardSink`.

use super::{require_text, require_timestamp_order, ValidationError};
use crate::db::now_epoch_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VaultItemId = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultItemType {
    #[default]
    Password,
    ApiKey,
    Token,
    SshKey,
    SecureNote,
    Other,
}

impl VaultItemType {
    pub const ALL: [VaultItemType; 6] = [
        Self::Password,
        Self::ApiKey,
        Self::Token,
        Self::SshKey,
        Self::SecureNote,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ApiKey => "api_key",
            Self::Token => "token",
            Self::SshKey => "ssh_key",
            Self::SecureNote => "secure_note",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// Encrypted secret with descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultItem {
    pub id: VaultItemId,
    pub name: String,
    pub item_type: VaultItemType,
    /// Service the secret belongs to, e.g. `github`.
    pub platform: Option<String>,
    pub username: Option<String>,
    /// Opaque ciphertext produced by the vault crypto function.
    pub encrypted_value: String,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl VaultItem {
    pub fn new(
        name: impl Into<String>,
        item_type: VaultItemType,
        encrypted_value: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            item_type,
            platform: None,
            username: None,
            encrypted_value: encrypted_value.into(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("vault item name", &self.name)?;
        require_text("vault item ciphertext", &self.encrypted_value)?;
        require_timestamp_order(self.created_at, self.updated_at)
    }
}
