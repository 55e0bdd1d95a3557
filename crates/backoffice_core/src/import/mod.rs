//! Bulk task import from delimited text.
//!
//! Parsing is storage-free; `TaskService::import_csv` persists the result.

pub mod csv_import;
