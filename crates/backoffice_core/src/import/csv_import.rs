//! Delimited-text task import.
//!
//! # Responsibility
//! - Split delimited text into records (quoted cells supported).
//! - Detect a header row and map columns to task fields by keyword.
//! - Normalize free-text priority/status/due-date values.
//!
//! # Invariants
//! - Rows with fewer cells than expected are skipped, never padded.
//! - Rows with a blank title are skipped.
//! - Kept rows preserve input order.
//! - Unrecognized priority/status text falls back to the defaults.

use crate::model::task::{ProjectId, TaskPriority, TaskStatus};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid non-alnum regex"));

const SUPPORTED_DELIMITERS: &[char] = &[',', ';', '\t', '|'];
const DUE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Column order assumed when the first row is not a header.
pub const POSITIONAL_COLUMNS: [TaskField; 5] = [
    TaskField::Title,
    TaskField::Description,
    TaskField::Priority,
    TaskField::Status,
    TaskField::DueDate,
];

/// Header keywords, most specific field first. First matching rule wins.
const HEADER_RULES: &[(TaskField, &[&str])] = &[
    (TaskField::Project, &["project"]),
    (TaskField::Priority, &["priority", "severity", "urgency"]),
    (TaskField::Status, &["status", "state", "progress"]),
    (
        TaskField::DueDate,
        &["due", "deadline", "target date", "end date"],
    ),
    (TaskField::Description, &["desc", "detail", "note", "body"]),
    (
        TaskField::Title,
        &["title", "name", "task", "summary", "subject"],
    ),
];

const PRIORITY_RULES: &[(TaskPriority, &[&str])] = &[
    (
        TaskPriority::Urgent,
        &["p0", "critical", "urgent", "blocker", "highest", "asap"],
    ),
    (TaskPriority::High, &["p1", "high", "important"]),
    (
        TaskPriority::Low,
        &["p3", "p4", "lowest", "low", "minor", "trivial"],
    ),
    (
        TaskPriority::Medium,
        &["p2", "medium", "normal", "moderate"],
    ),
];

const STATUS_RULES: &[(TaskStatus, &[&str])] = &[
    (
        TaskStatus::Todo,
        &["not started", "todo", "to do", "backlog", "open", "new", "pending"],
    ),
    (
        TaskStatus::Completed,
        &["complete", "done", "finished", "closed", "resolved"],
    ),
    (
        TaskStatus::Cancelled,
        &["cancel", "abandon", "won t", "wontfix", "dropped"],
    ),
    (TaskStatus::Blocked, &["block", "waiting", "on hold"]),
    (
        TaskStatus::InProgress,
        &["progress", "doing", "started", "active", "wip", "review"],
    ),
];

/// Task field a column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Project,
    Title,
    Description,
    Priority,
    Status,
    DueDate,
}

/// Import failure that rejects the whole input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Input has no non-blank lines.
    EmptyInput,
    /// Delimiter outside `, ; TAB |`.
    UnsupportedDelimiter(char),
    /// A header row was detected but no column maps to the task title.
    MissingTitleColumn { header: Vec<String> },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "import file contains no rows"),
            Self::UnsupportedDelimiter(value) => {
                write!(f, "unsupported delimiter {value:?}; expected , ; TAB or |")
            }
            Self::MissingTitleColumn { header } => write!(
                f,
                "no title column found in header [{}]",
                header.join(", ")
            ),
        }
    }
}

impl Error for ImportError {}

/// Caller options for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvImportOptions {
    pub delimiter: char,
    /// Project assigned to rows without a project cell.
    pub default_project: Option<ProjectId>,
    /// Name-based alternative to `default_project`, which wins when both
    /// are set. Resolved (and created if missing) only once a parsed row
    /// needs it.
    pub default_project_name: Option<String>,
}

impl Default for CsvImportOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            default_project: None,
            default_project_name: None,
        }
    }
}

/// Resolved column layout for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Field per column index; `None` for ignored columns.
    pub columns: Vec<Option<TaskField>>,
    pub has_header: bool,
}

impl ColumnMapping {
    /// Minimum cell count for a row to be accepted.
    pub fn expected_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, field: TaskField) -> Option<usize> {
        self.columns.iter().position(|mapped| *mapped == Some(field))
    }
}

/// One accepted, normalized row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRow {
    /// 1-based physical line number in the input.
    pub line: usize,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub project_name: Option<String>,
}

/// Parse result before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub mapping: ColumnMapping,
    pub rows: Vec<ImportedRow>,
    /// Data rows dropped as malformed or untitled.
    pub skipped: usize,
}

/// Parses delimited task text into normalized rows.
pub fn parse_task_csv(
    text: &str,
    options: &CsvImportOptions,
) -> Result<ParsedImport, ImportError> {
    if !SUPPORTED_DELIMITERS.contains(&options.delimiter) {
        return Err(ImportError::UnsupportedDelimiter(options.delimiter));
    }

    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index + 1, split_record(line, options.delimiter)));

    let Some((first_line, first_cells)) = records.next() else {
        return Err(ImportError::EmptyInput);
    };

    let header_fields = detect_header(&first_cells);
    let (mapping, pending_first) = match header_fields {
        Some(columns) => {
            if !columns.contains(&Some(TaskField::Title)) {
                return Err(ImportError::MissingTitleColumn {
                    header: first_cells,
                });
            }
            (
                ColumnMapping {
                    columns,
                    has_header: true,
                },
                None,
            )
        }
        None => {
            let width = first_cells.len().min(POSITIONAL_COLUMNS.len());
            (
                ColumnMapping {
                    columns: POSITIONAL_COLUMNS[..width].iter().copied().map(Some).collect(),
                    has_header: false,
                },
                Some((first_line, first_cells)),
            )
        }
    };

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (line, cells) in pending_first.into_iter().chain(records) {
        match build_row(&mapping, line, &cells) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    Ok(ParsedImport {
        mapping,
        rows,
        skipped,
    })
}

/// Splits one line into trimmed cells.
///
/// Double-quoted cells may contain the delimiter; `""` inside quotes is a
/// literal quote.
pub fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            c if c == delimiter && !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Maps one header cell to a task field.
pub fn map_header(cell: &str) -> Option<TaskField> {
    let normalized = normalize_text(cell);
    if normalized.is_empty() {
        return None;
    }
    HEADER_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| normalized.contains(keyword)))
        .map(|(field, _)| *field)
}

/// Maps free-text priority to the fixed enumeration. Defaults to medium.
pub fn normalize_priority(value: &str) -> TaskPriority {
    match_keyword_rules(value, PRIORITY_RULES).unwrap_or_default()
}

/// Maps free-text status to the fixed enumeration. Defaults to todo.
pub fn normalize_status(value: &str) -> TaskStatus {
    match_keyword_rules(value, STATUS_RULES).unwrap_or_default()
}

/// Parses a due date in any supported format.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DUE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// A first row holding any value-like cell is data, whatever words its
/// titles contain.
fn detect_header(cells: &[String]) -> Option<Vec<Option<TaskField>>> {
    if cells.iter().any(|cell| looks_like_value(cell)) {
        return None;
    }
    let mut columns: Vec<Option<TaskField>> = Vec::with_capacity(cells.len());
    for cell in cells {
        let field = map_header(cell).filter(|field| !columns.contains(&Some(*field)));
        columns.push(field);
    }
    if columns.iter().any(Option::is_some) {
        Some(columns)
    } else {
        None
    }
}

/// Dates, and cells that are exactly a priority or status value without
/// also naming a column.
fn looks_like_value(cell: &str) -> bool {
    if parse_due_date(cell).is_some() {
        return true;
    }
    if map_header(cell).is_some() {
        return false;
    }
    let normalized = normalize_text(cell);
    if normalized.is_empty() {
        return false;
    }
    is_exact_keyword(&normalized, PRIORITY_RULES)
        || is_exact_keyword(&normalized, STATUS_RULES)
        || TaskPriority::ALL
            .iter()
            .any(|priority| normalize_text(priority.as_str()) == normalized)
        || TaskStatus::ALL
            .iter()
            .any(|status| normalize_text(status.as_str()) == normalized)
}

fn is_exact_keyword<T>(normalized: &str, rules: &[(T, &[&str])]) -> bool {
    rules
        .iter()
        .any(|(_, keywords)| keywords.contains(&normalized))
}

fn build_row(mapping: &ColumnMapping, line: usize, cells: &[String]) -> Option<ImportedRow> {
    if cells.len() < mapping.expected_columns() {
        return None;
    }

    let cell = |field: TaskField| {
        mapping
            .index_of(field)
            .and_then(|index| cells.get(index))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    };

    let title = cell(TaskField::Title)?.to_string();
    Some(ImportedRow {
        line,
        title,
        description: cell(TaskField::Description).map(str::to_string),
        priority: cell(TaskField::Priority)
            .map(normalize_priority)
            .unwrap_or_default(),
        status: cell(TaskField::Status)
            .map(normalize_status)
            .unwrap_or_default(),
        due_date: cell(TaskField::DueDate).and_then(parse_due_date),
        project_name: cell(TaskField::Project).map(str::to_string),
    })
}

fn match_keyword_rules<T: Copy>(value: &str, rules: &[(T, &[&str])]) -> Option<T> {
    let normalized = normalize_text(value);
    if normalized.is_empty() {
        return None;
    }
    // Keywords match at word starts: "block" hits "blocked", "new" misses "renewal".
    let padded = format!(" {normalized}");
    rules
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| padded.contains(&format!(" {keyword}")))
        })
        .map(|(target, _)| *target)
}

fn normalize_text(value: &str) -> String {
    let lowered = value.to_lowercase();
    NON_ALNUM_RE.replace_all(&lowered, " ").trim().to_string()
}
