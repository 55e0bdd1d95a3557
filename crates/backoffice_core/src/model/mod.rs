//! Flat domain records for the back office.
//!
//! # Responsibility
//! - Define task, project and vault item shapes used by every layer.
//! - Own field-level validation shared by write and read paths.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Tasks and projects are tombstoned (`is_deleted`), vault items are not.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod task;
pub mod vault;

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    BlankField(&'static str),
    /// `updated_at` is earlier than `created_at`.
    TimestampOrder { created_at: i64, updated_at: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} is earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_timestamp_order(
    created_at: i64,
    updated_at: i64,
) -> Result<(), ValidationError> {
    if updated_at < created_at {
        return Err(ValidationError::TimestampOrder {
            created_at,
            updated_at,
        });
    }
    Ok(())
}

/// Trims a free-text field and maps empty input to `None`.
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
