//! Event model and the calendar event parser.
//!
//! A calendar event belongs to the managed set only if its description
//! decodes into a full synchronization marker. Events that fail to decode
//! are dropped from the set and reported, never fatal.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{ParseError, RecordFailure};
use crate::marker;

/// A managed calendar event, normalized from one raw API event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Calendar-assigned id, required for update and delete calls.
    pub event_id: String,
    pub subject: String,
    pub description: String,
    pub notes: String,
    pub category: String,
    pub assignment_date: String,
    pub due_date: String,
    pub due_hour: String,
    /// The task's edit marker as of the last write to this event.
    pub last_edited_time: String,
    /// Join key back to the task record.
    pub task_id: String,
}

/// Parse raw calendar events into the managed set, keyed by task id.
///
/// Events whose body fails to decode never enter the map and are therefore
/// invisible to reconciliation.
pub fn parse_events(raw_events: &[Value]) -> (HashMap<String, Event>, Vec<RecordFailure>) {
    let mut events = HashMap::new();
    let mut failures = Vec::new();

    for raw in raw_events {
        match parse_event(raw) {
            Ok(event) => {
                events.insert(event.task_id.clone(), event);
            }
            Err(error) => {
                let source = raw
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown event>")
                    .to_owned();
                failures.push(RecordFailure { source, error });
            }
        }
    }

    (events, failures)
}

fn parse_event(raw: &Value) -> Result<Event, ParseError> {
    let event_id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("id"))?
        .to_owned();
    let subject = raw
        .get("summary")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("summary"))?
        .to_owned();

    let body = raw
        .get("description")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("description"))?;
    let marker = marker::decode(body)?;

    // Due date and hour come from the event's end timestamp, not the body.
    let end = raw
        .pointer("/end/dateTime")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("end.dateTime"))?;
    let (due_date, due_hour) = end
        .split_once('T')
        .ok_or(ParseError::UnexpectedShape("end.dateTime"))?;

    Ok(Event {
        event_id,
        subject,
        description: marker.description,
        notes: marker.notes,
        category: marker.category,
        assignment_date: marker.assignment_date,
        due_date: due_date.to_owned(),
        due_hour: due_hour.to_owned(),
        last_edited_time: marker.last_edited_time,
        task_id: marker.task_id,
    })
}
