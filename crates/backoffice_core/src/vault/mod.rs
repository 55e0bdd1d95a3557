//! Secrets vault support: remote crypto client, clock and reveal cache.
//!
//! # See also
//! - `service::vault_service` for the reveal/hide/copy use-cases.

pub mod cipher;
pub mod clock;
pub mod reveal;
