//! Event projector: turn a task into a Google Calendar event payload.
//!
//! The event is a fixed 30-minute reminder block anchored on the task's due
//! instant, with the synchronization marker serialized into the description.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::marker;
use crate::task::Task;

/// Width of the reminder block on the calendar.
const EVENT_MINUTES: i64 = 30;

/// Request body for the Google Calendar events API.
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventInstant,
    pub end: EventInstant,
    pub reminders: Reminders,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventInstant {
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reminders {
    #[serde(rename = "useDefault")]
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

/// Project a task into a calendar event payload.
///
/// The start instant is the due date and hour in the task's declared offset;
/// if any of those fail to parse, the current local instant is used instead
/// so projection never aborts.
pub fn to_event(task: &Task) -> EventPayload {
    let start = match parse_start(&task.due_date, &task.due_hour, &task.user_time_zone) {
        Ok(start) => start,
        Err(error) => {
            tracing::warn!(
                task_id = %task.task_id,
                error = %error,
                "could not build event start, falling back to now"
            );
            Local::now().fixed_offset()
        }
    };
    let end = start + Duration::minutes(EVENT_MINUTES);

    EventPayload {
        summary: task.name.to_string(),
        description: marker::encode(task),
        start: EventInstant {
            date_time: start.to_rfc3339(),
        },
        end: EventInstant {
            date_time: end.to_rfc3339(),
        },
        reminders: Reminders {
            use_default: false,
            overrides: vec![
                ReminderOverride {
                    method: "popup".to_owned(),
                    minutes: 24 * 60,
                },
                ReminderOverride {
                    method: "popup".to_owned(),
                    minutes: 30,
                },
            ],
        },
    }
}

/// Build the due instant from `YYYY-MM-DD`, `HH:MM[:SS]` and a sign-aware
/// `HH:MM` offset.
fn parse_start(date: &str, hour: &str, zone: &str) -> Result<DateTime<FixedOffset>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("bad due date `{date}`"))?;
    let time = NaiveTime::parse_from_str(hour, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(hour, "%H:%M"))
        .with_context(|| format!("bad due hour `{hour}`"))?;

    let (hours, minutes) = zone
        .split_once(':')
        .with_context(|| format!("time zone offset `{zone}` is not HH:MM"))?;
    let hours: i64 = hours.parse().context("offset hours")?;
    let minutes: i64 = minutes.parse().context("offset minutes")?;
    // Checked math: an absurd offset must flow into the fallback, not
    // overflow.
    let offset_seconds = hours
        .checked_mul(60)
        .and_then(|h| {
            if hours < 0 {
                h.checked_sub(minutes)
            } else {
                h.checked_add(minutes)
            }
        })
        .and_then(|m| m.checked_mul(60))
        .with_context(|| format!("time zone offset `{zone}` out of range"))?;
    let offset = i32::try_from(offset_seconds)
        .ok()
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("time zone offset `{zone}` out of range"))?;

    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .context("ambiguous local datetime")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TextField;

    fn make_task() -> Task {
        Task {
            task_id: "abc-123".to_owned(),
            name: TextField::Provided("Write report".to_owned()),
            description: TextField::Provided("Quarterly numbers".to_owned()),
            notes: TextField::Defaulted(crate::task::NO_NOTES),
            category: TextField::Provided("Work".to_owned()),
            status: "In Progress".to_owned(),
            assignment_date: TextField::Provided("2024-04-01".to_owned()),
            assignment_hour: "08:00:00".to_owned(),
            due_date: "2024-05-01".to_owned(),
            due_hour: "14:30:00".to_owned(),
            user_time_zone: "03:00".to_owned(),
            last_edited_time: "2024-03-02T10:00:00.000Z".to_owned(),
        }
    }

    #[test]
    fn start_uses_due_instant_in_task_offset() {
        let payload = to_event(&make_task());
        assert_eq!(payload.start.date_time, "2024-05-01T14:30:00+03:00");
        assert_eq!(payload.end.date_time, "2024-05-01T15:00:00+03:00");
    }

    #[test]
    fn negative_offset_is_sign_aware() {
        let mut task = make_task();
        task.user_time_zone = "-05:30".to_owned();

        let payload = to_event(&task);
        assert_eq!(payload.start.date_time, "2024-05-01T14:30:00-05:30");
    }

    #[test]
    fn unparseable_due_instant_falls_back_to_now() {
        let mut task = make_task();
        task.due_date = "not a date".to_owned();

        let payload = to_event(&task);
        let start = DateTime::parse_from_rfc3339(&payload.start.date_time).unwrap();
        let end = DateTime::parse_from_rfc3339(&payload.end.date_time).unwrap();
        assert_eq!(end - start, Duration::minutes(30));
    }

    #[test]
    fn out_of_range_offset_falls_back_to_now() {
        let mut task = make_task();
        task.user_time_zone = "999999999:00".to_owned();

        let payload = to_event(&task);
        let start = DateTime::parse_from_rfc3339(&payload.start.date_time).unwrap();
        let end = DateTime::parse_from_rfc3339(&payload.end.date_time).unwrap();
        assert_eq!(end - start, Duration::minutes(30));
    }

    #[test]
    fn empty_offset_falls_back_to_now() {
        let mut task = make_task();
        task.user_time_zone = String::new();

        // Must not panic; the block is still 30 minutes wide.
        let payload = to_event(&task);
        let start = DateTime::parse_from_rfc3339(&payload.start.date_time).unwrap();
        let end = DateTime::parse_from_rfc3339(&payload.end.date_time).unwrap();
        assert_eq!(end - start, Duration::minutes(30));
    }

    #[test]
    fn reminders_are_fixed_popup_overrides() {
        let payload = to_event(&make_task());
        assert!(!payload.reminders.use_default);
        let minutes: Vec<i64> = payload
            .reminders
            .overrides
            .iter()
            .map(|o| o.minutes)
            .collect();
        assert_eq!(minutes, vec![1440, 30]);
        assert!(payload.reminders.overrides.iter().all(|o| o.method == "popup"));
    }

    #[test]
    fn description_carries_the_marker() {
        let task = make_task();
        let payload = to_event(&task);
        let marker = crate::marker::decode(&payload.description).unwrap();
        assert_eq!(marker.task_id, task.task_id);
        assert_eq!(marker.last_edited_time, task.last_edited_time);
    }
}
