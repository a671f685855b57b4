//! Task model and the Notion record parser.
//!
//! Raw database rows arrive as JSON pages. Parsing is tolerant: empty text
//! fields fall back to sentinel placeholders, and a record that fails
//! structurally is excluded on its own without aborting the batch.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::error::{ParseError, RecordFailure};

pub const NO_TITLE: &str = "Title is not specified!";
pub const NO_DESCRIPTION: &str = "Description is empty!";
pub const NO_NOTES: &str = "Notes are empty!";
pub const NO_CATEGORY: &str = "Not categorized!";
pub const NO_ASSIGNMENT_DATE: &str = "Assignment date is missing!";
pub const NO_DUE_DATE: &str = "DUE DATE IS NOT SPECIFIED. TASK IS CREATED ON CREATION TIME!";

/// Statuses that close a task. Anything else counts as open and is a
/// candidate for synchronization.
const CLOSED_STATUSES: &[&str] = &["Completed", "Closed", "Failed"];

/// A text field that is either provided by the record or replaced by a
/// sentinel placeholder. Keeps the two cases distinguishable without
/// string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextField {
    Provided(String),
    Defaulted(&'static str),
}

impl TextField {
    fn or_default(value: Option<String>, sentinel: &'static str) -> Self {
        match value {
            Some(value) => TextField::Provided(value),
            None => TextField::Defaulted(sentinel),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TextField::Provided(value) => value,
            TextField::Defaulted(sentinel) => sentinel,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, TextField::Defaulted(_))
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open task, normalized from one Notion page.
#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: String,
    pub name: TextField,
    pub description: TextField,
    pub notes: TextField,
    pub category: TextField,
    pub status: String,
    pub assignment_date: TextField,
    pub assignment_hour: String,
    pub due_date: String,
    pub due_hour: String,
    /// Offset of the task's declared time zone, `HH:MM` form. Empty when
    /// no offset could be recovered from either date field.
    pub user_time_zone: String,
    /// Opaque edit marker from the store. Compared verbatim, never parsed.
    pub last_edited_time: String,
}

/// Parse a batch of raw database rows into tasks keyed by task id.
///
/// Closed tasks are excluded. Records without a readable status are logged
/// and skipped; records that fail structurally land in the failure list.
pub fn parse_tasks(records: &[Value]) -> (HashMap<String, Task>, Vec<RecordFailure>) {
    let mut tasks = HashMap::new();
    let mut failures = Vec::new();

    for record in records {
        let source = record
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("<unknown record>")
            .to_owned();

        let status = record
            .pointer("/properties/Status/select/name")
            .and_then(Value::as_str);
        let status = match status {
            Some(status) => status,
            None => {
                tracing::warn!(record = %source, "misconfigured task: status is missing");
                continue;
            }
        };

        if CLOSED_STATUSES.contains(&status) {
            continue;
        }

        match parse_task(record, status) {
            Ok(task) => {
                tasks.insert(task.task_id.clone(), task);
            }
            Err(error) => failures.push(RecordFailure { source, error }),
        }
    }

    (tasks, failures)
}

fn parse_task(record: &Value, status: &str) -> Result<Task, ParseError> {
    let task_id = record
        .get("id")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("id"))?
        .to_owned();

    let properties = record
        .get("properties")
        .ok_or(ParseError::MissingField("properties"))?;

    let name = TextField::or_default(text_property(properties, "Name", "title")?, NO_TITLE);
    let description = TextField::or_default(
        text_property(properties, "Description", "rich_text")?,
        NO_DESCRIPTION,
    );
    let notes = TextField::or_default(text_property(properties, "Notes", "rich_text")?, NO_NOTES);
    let category = TextField::or_default(category_property(properties)?, NO_CATEGORY);

    let mut assignment_date = TextField::Defaulted(NO_ASSIGNMENT_DATE);
    let mut assignment_hour = "00:00".to_owned();
    let mut user_time_zone = String::new();

    if let Some(start) = date_start(properties, "Assignment Date")? {
        let (date, time) = split_timestamp(&start);
        assignment_date = TextField::Provided(date);
        if let Some((hour, zone)) = time {
            assignment_hour = hour;
            user_time_zone = zone;
        }
    }

    let due_date;
    let due_hour;

    match date_start(properties, "Due Date")? {
        Some(start) => {
            let (date, time) = split_timestamp(&start);
            due_date = date;
            match time {
                Some((hour, zone)) => {
                    due_hour = hour;
                    if !zone.is_empty() {
                        user_time_zone = zone;
                    }
                }
                None => {
                    // Date-only due dates land mid-day so the reminder block
                    // does not fire at midnight.
                    due_hour = "12:00:00".to_owned();
                    if user_time_zone.is_empty() {
                        user_time_zone = "00:00".to_owned();
                    }
                }
            }
        }
        None => {
            // Due date always anchors the schedule. Without one, fall back
            // to the record's creation instant and flag the assignment date.
            assignment_date = TextField::Defaulted(NO_DUE_DATE);
            let created = record
                .get("created_time")
                .and_then(Value::as_str)
                .ok_or(ParseError::MissingField("created_time"))?;
            let (date, time) = split_timestamp(created);
            due_date = date;
            due_hour = time.map(|(hour, _)| hour).unwrap_or_else(|| "00:00:00".to_owned());
        }
    }

    Ok(Task {
        task_id,
        name,
        description,
        notes,
        category,
        status: status.to_owned(),
        assignment_date,
        assignment_hour,
        due_date,
        due_hour,
        user_time_zone,
        last_edited_time: record
            .get("last_edited_time")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingField("last_edited_time"))?
            .to_owned(),
    })
}

/// Extract the first plain-text run of a title/rich-text property.
/// `Ok(None)` when the property exists but has no content.
fn text_property(
    properties: &Value,
    field: &'static str,
    kind: &str,
) -> Result<Option<String>, ParseError> {
    let items = properties
        .get(field)
        .and_then(|property| property.get(kind))
        .and_then(Value::as_array)
        .ok_or(ParseError::UnexpectedShape(field))?;

    Ok(items
        .first()
        .and_then(|item| item.get("plain_text"))
        .and_then(Value::as_str)
        .map(str::to_owned))
}

/// Join the multi-select tag names with ", ". `Ok(None)` when no tag is set.
fn category_property(properties: &Value) -> Result<Option<String>, ParseError> {
    let items = properties
        .get("Category")
        .and_then(|property| property.get("multi_select"))
        .and_then(Value::as_array)
        .ok_or(ParseError::UnexpectedShape("Category"))?;

    let names: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .collect();

    Ok(if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    })
}

/// Read a date property's `start` value. `Ok(None)` when the date is unset.
fn date_start(properties: &Value, field: &'static str) -> Result<Option<String>, ParseError> {
    let property = properties
        .get(field)
        .ok_or(ParseError::UnexpectedShape(field))?;

    Ok(property
        .get("date")
        .and_then(|date| date.get("start"))
        .and_then(Value::as_str)
        .map(str::to_owned))
}

/// Split an ISO-ish timestamp into its date part and, when a time component
/// is present, an `(hour, offset)` pair. Sub-second precision is dropped and
/// the offset is whatever follows the first `+` (empty for `Z` or none).
fn split_timestamp(raw: &str) -> (String, Option<(String, String)>) {
    match raw.split_once('T') {
        Some((date, time)) => {
            let hour = time
                .split(['.', '+'])
                .next()
                .unwrap_or(time)
                .trim_end_matches('Z')
                .to_owned();
            let zone = time
                .split_once('+')
                .map(|(_, zone)| zone.to_owned())
                .unwrap_or_default();
            (date.to_owned(), Some((hour, zone)))
        }
        None => (raw.to_owned(), None),
    }
}
