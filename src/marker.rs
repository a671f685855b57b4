//! The synchronization marker embedded in each managed event's description.
//!
//! The event body is a wire contract between the projector and the event
//! parser: four labeled lines, a separator, a do-not-edit warning, then the
//! task's last-edited timestamp and its id as the final two lines. Encoding
//! and decoding both live here so the format can only change in one place.

use crate::error::ParseError;
use crate::task::Task;

const SEPARATOR: &str = "----------";
const EDIT_WARNING: &str = "Please do not edit following lines!";

/// The fields recovered from (or written into) an event body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerBody {
    pub description: String,
    pub notes: String,
    pub category: String,
    pub assignment_date: String,
    pub assignment_hour: String,
    pub last_edited_time: String,
    pub task_id: String,
}

/// Serialize a task into the event body, fixed line order.
pub fn encode(task: &Task) -> String {
    format!(
        "Description: {}\n\
         Notes: {}\n\
         Category: {}\n\
         Assignment Date: {} - {}\n\
         {SEPARATOR}\n\
         {EDIT_WARNING}\n\
         {}\n\
         {}\n",
        task.description,
        task.notes,
        task.category,
        task.assignment_date,
        task.assignment_hour,
        task.last_edited_time,
        task.task_id,
    )
}

/// Decode an event body back into its marker fields.
///
/// The four leading lines are split on the first colon with the right-hand
/// side trimmed; the assignment-date value splits once more on `" - "` into
/// date and hour. The final two lines carry the last-edited timestamp and
/// the task id.
pub fn decode(body: &str) -> Result<MarkerBody, ParseError> {
    let lines: Vec<&str> = body.trim().lines().collect();
    if lines.len() < 6 {
        return Err(ParseError::TruncatedBody(lines.len()));
    }

    let description = labeled(lines[0])?;
    let notes = labeled(lines[1])?;
    let category = labeled(lines[2])?;
    let assignment = labeled(lines[3])?;
    let (assignment_date, assignment_hour) = assignment
        .split_once(" - ")
        .map(|(date, hour)| (date.to_owned(), hour.to_owned()))
        .unwrap_or((assignment.clone(), String::new()));

    Ok(MarkerBody {
        description,
        notes,
        category,
        assignment_date,
        assignment_hour,
        last_edited_time: lines[lines.len() - 2].trim().to_owned(),
        task_id: lines[lines.len() - 1].trim().to_owned(),
    })
}

fn labeled(line: &str) -> Result<String, ParseError> {
    line.split_once(':')
        .map(|(_, value)| value.trim().to_owned())
        .ok_or_else(|| ParseError::UnlabeledLine(line.to_owned()))
}
