//! Vault use-cases: CRUD over encrypted items plus reveal/hide/copy.
//!
//! # Responsibility
//! - Encrypt new and rotated secrets through `VaultCipher` before storage.
//! - Decrypt on reveal/copy and keep revealed plaintext in `RevealCache`.
//!
//! # Invariants
//! - Storage only ever receives ciphertext.
//! - Rotating or deleting an item evicts its cached plaintext.
//! - Copy uses fresh cached plaintext when present and otherwise decrypts
//!   without populating the cache.

use crate::model::normalize_optional_text;
use crate::model::vault::{VaultItem, VaultItemId, VaultItemType};
use crate::model::ValidationError;
use crate::repo::vault_repo::{VaultListQuery, VaultRepository};
use crate::repo::RepoError;
use crate::vault::cipher::{CipherError, VaultCipher};
use crate::vault::clock::Clock;
use crate::vault::reveal::RevealCache;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum VaultError {
    Validation(ValidationError),
    ItemNotFound(VaultItemId),
    Cipher(CipherError),
    Clipboard(String),
    Repo(RepoError),
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "vault item not found: {id}"),
            Self::Cipher(err) => write!(f, "{err}"),
            Self::Clipboard(message) => write!(f, "clipboard write failed: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Cipher(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ItemNotFound(_) | Self::Clipboard(_) => None,
        }
    }
}

impl From<ValidationError> for VaultError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CipherError> for VaultError {
    fn from(value: CipherError) -> Self {
        Self::Cipher(value)
    }
}

impl From<RepoError> for VaultError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::ItemNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Destination for copied secrets (system clipboard in a UI).
pub trait ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

/// Where a copied value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySource {
    RevealCache,
    Decrypted,
}

/// Form input for a new vault item. `secret` is plaintext.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewVaultItem {
    pub name: String,
    pub item_type: VaultItemType,
    pub platform: Option<String>,
    pub username: Option<String>,
    pub secret: String,
    pub notes: Option<String>,
}

/// Editable non-secret fields; replaces the stored values wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultMetadata {
    pub name: String,
    pub item_type: VaultItemType,
    pub platform: Option<String>,
    pub username: Option<String>,
    pub notes: Option<String>,
}

pub struct VaultService<R: VaultRepository, C: VaultCipher, K: Clock> {
    repo: R,
    cipher: C,
    clock: K,
    revealed: RevealCache,
}

impl<R: VaultRepository, C: VaultCipher, K: Clock> VaultService<R, C, K> {
    pub fn new(repo: R, cipher: C, clock: K, reveal_ttl_ms: i64) -> Self {
        Self {
            repo,
            cipher,
            clock,
            revealed: RevealCache::new(reveal_ttl_ms),
        }
    }

    /// Validates, encrypts remotely, then stores the ciphertext.
    pub fn create_item(&self, input: NewVaultItem) -> VaultResult<VaultItem> {
        if input.name.trim().is_empty() {
            return Err(ValidationError::BlankField("vault item name").into());
        }
        if input.secret.is_empty() {
            return Err(ValidationError::BlankField("vault item secret").into());
        }

        let ciphertext = self.cipher.encrypt(&input.secret)?;
        let mut item = VaultItem::new(input.name, input.item_type, ciphertext);
        item.platform = normalize_optional_text(input.platform.as_deref());
        item.username = normalize_optional_text(input.username.as_deref());
        item.notes = normalize_optional_text(input.notes.as_deref());
        self.repo.create_item(&item)?;

        info!(
            "event=vault_item_create module=service status=ok item_type={}",
            item.item_type.as_str()
        );
        Ok(item)
    }

    pub fn update_metadata(
        &self,
        id: VaultItemId,
        metadata: VaultMetadata,
    ) -> VaultResult<VaultItem> {
        let mut item = self.require(id)?;
        item.name = metadata.name.trim().to_string();
        item.item_type = metadata.item_type;
        item.platform = normalize_optional_text(metadata.platform.as_deref());
        item.username = normalize_optional_text(metadata.username.as_deref());
        item.notes = normalize_optional_text(metadata.notes.as_deref());
        self.repo.update_item(&item)?;
        self.require(id)
    }

    /// Re-encrypts a new secret and evicts any revealed plaintext.
    pub fn rotate_secret(&mut self, id: VaultItemId, secret: &str) -> VaultResult<VaultItem> {
        if secret.is_empty() {
            return Err(ValidationError::BlankField("vault item secret").into());
        }
        let mut item = self.require(id)?;
        item.encrypted_value = self.cipher.encrypt(secret)?;
        self.repo.update_item(&item)?;
        self.revealed.remove(id);

        info!("event=vault_item_rotate module=service status=ok");
        self.require(id)
    }

    pub fn get_item(&self, id: VaultItemId) -> VaultResult<Option<VaultItem>> {
        Ok(self.repo.get_item(id)?)
    }

    pub fn list_items(&self, query: &VaultListQuery) -> VaultResult<Vec<VaultItem>> {
        Ok(self.repo.list_items(query)?)
    }

    pub fn delete_item(&mut self, id: VaultItemId) -> VaultResult<()> {
        self.repo.delete_item(id)?;
        self.revealed.remove(id);
        Ok(())
    }

    /// Returns plaintext, decrypting remotely unless a fresh copy is cached.
    ///
    /// Revealing an already-revealed item does not restart its timer.
    pub fn reveal(&mut self, id: VaultItemId) -> VaultResult<String> {
        let now = self.clock.now_epoch_ms();
        if let Some(plaintext) = self.revealed.get(id, now).map(str::to_string) {
            return Ok(plaintext);
        }

        let item = self.require(id)?;
        let plaintext = self.cipher.decrypt(&item.encrypted_value)?;
        self.revealed.insert(id, plaintext.clone(), now);
        info!(
            "event=vault_reveal module=service status=ok ttl_ms={}",
            self.revealed.ttl_ms()
        );
        Ok(plaintext)
    }

    /// Forgets revealed plaintext. Returns whether anything was cached.
    pub fn hide(&mut self, id: VaultItemId) -> bool {
        self.revealed.remove(id)
    }

    /// Cached plaintext if the item is currently revealed. Never decrypts.
    pub fn revealed_value(&mut self, id: VaultItemId) -> Option<String> {
        let now = self.clock.now_epoch_ms();
        self.revealed.get(id, now).map(str::to_string)
    }

    pub fn reveal_remaining_ms(&self, id: VaultItemId) -> Option<i64> {
        self.revealed.remaining_ms(id, self.clock.now_epoch_ms())
    }

    /// Writes plaintext to `sink`, decrypting on demand if not revealed.
    pub fn copy_secret(
        &mut self,
        id: VaultItemId,
        sink: &mut dyn ClipboardSink,
    ) -> VaultResult<CopySource> {
        let now = self.clock.now_epoch_ms();
        let cached = self.revealed.get(id, now).map(str::to_string);
        let (plaintext, source) = match cached {
            Some(cached) => (cached, CopySource::RevealCache),
            None => {
                let item = self.require(id)?;
                (
                    self.cipher.decrypt(&item.encrypted_value)?,
                    CopySource::Decrypted,
                )
            }
        };

        sink.write_text(&plaintext).map_err(|message| {
            warn!("event=vault_copy module=service status=error error_code=clipboard_failed");
            VaultError::Clipboard(message)
        })?;
        info!("event=vault_copy module=service status=ok source={source:?}");
        Ok(source)
    }

    /// Drops expired plaintext; returns how many entries were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_epoch_ms();
        self.revealed.purge_expired(now)
    }

    fn require(&self, id: VaultItemId) -> VaultResult<VaultItem> {
        self.repo.get_item(id)?.ok_or(VaultError::ItemNotFound(id))
    }
}
