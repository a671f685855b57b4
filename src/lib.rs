//! Reconcile open tasks in a Notion database with Google Calendar events.
//!
//! Each open task gets exactly one calendar event, identified by a
//! synchronization marker embedded in the event description. One pass reads
//! both sides, classifies every task id into create/update/delete and applies
//! the minimal action through the calendar port.

pub mod config;
pub mod error;
pub mod event;
pub mod marker;
pub mod ports;
pub mod project;
pub mod sync;
pub mod task;
