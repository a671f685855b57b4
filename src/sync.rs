//! Reconciliation between the task set and the managed event set.
//!
//! Set algebra over task ids classifies every key into create, update or
//! delete; apply drives the calendar port one action at a time. Port errors
//! are caught per key and recorded, never aborting sibling actions.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::event::Event;
use crate::project::{self, EventPayload};
use crate::task::Task;

/// Calendar write operations the engine drives. Implemented by the Google
/// Calendar port; tests inject a recording mock.
#[allow(async_fn_in_trait)]
pub trait CalendarOps {
    async fn create(&self, payload: &EventPayload) -> Result<()>;
    async fn update(&self, event_id: &str, payload: &EventPayload) -> Result<()>;
    async fn delete(&self, event_id: &str) -> Result<()>;
}

/// The three-way classification of the key universe.
#[derive(Debug, Default)]
pub struct SyncDiff {
    /// Task ids with no matching event.
    pub to_create: HashSet<String>,
    /// Event keys with no matching open task.
    pub to_delete: HashSet<String>,
    /// Keys present on both sides; actual updates depend on the edit marker.
    pub to_update: HashSet<String>,
}

impl SyncDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty() && self.to_update.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

/// One applied action. `error` carries the port's message on failure.
#[derive(Debug)]
pub struct ActionOutcome {
    pub task_id: String,
    pub action: ActionKind,
    pub error: Option<String>,
}

/// Result of one reconciliation pass: the classification plus one ordered
/// outcome per action actually attempted (up-to-date keys emit nothing).
#[derive(Debug)]
pub struct SyncReport {
    pub diff: SyncDiff,
    pub outcomes: Vec<ActionOutcome>,
}

impl SyncReport {
    /// Successful actions of the given kind.
    pub fn applied(&self, action: ActionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action == action && o.error.is_none())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Classify every task id into create/update/delete.
///
/// The three sets partition the union of task keys and event keys; iteration
/// order between keys is unspecified.
pub fn classify(tasks: &HashMap<String, Task>, events: &HashMap<String, Event>) -> SyncDiff {
    let mut diff = SyncDiff::default();

    for key in tasks.keys() {
        if events.contains_key(key) {
            diff.to_update.insert(key.clone());
        } else {
            diff.to_create.insert(key.clone());
        }
    }
    for key in events.keys() {
        if !tasks.contains_key(key) {
            diff.to_delete.insert(key.clone());
        }
    }

    diff
}

/// Keys in the update set whose event copy is stale (edit markers differ).
pub fn stale_keys<'a>(
    diff: &'a SyncDiff,
    tasks: &HashMap<String, Task>,
    events: &HashMap<String, Event>,
) -> Vec<&'a String> {
    diff.to_update
        .iter()
        .filter(|key| tasks[*key].last_edited_time != events[*key].last_edited_time)
        .collect()
}

/// Run one reconciliation pass, applying each classified action exactly once.
///
/// Change detection on matched keys is exact string equality of the edit
/// markers; equal markers produce no action and no outcome entry.
pub async fn synchronize<C: CalendarOps>(
    tasks: &HashMap<String, Task>,
    events: &HashMap<String, Event>,
    ops: &C,
) -> SyncReport {
    let diff = classify(tasks, events);
    let mut outcomes = Vec::new();

    for task_id in &diff.to_create {
        let task = &tasks[task_id];
        let payload = project::to_event(task);
        let error = ops.create(&payload).await.err().map(|e| e.to_string());
        match &error {
            None => tracing::info!(task = %task.name, "event created"),
            Some(error) => tracing::warn!(task = %task.name, %error, "create failed"),
        }
        outcomes.push(ActionOutcome {
            task_id: task_id.clone(),
            action: ActionKind::Create,
            error,
        });
    }

    for task_id in &diff.to_delete {
        let event = &events[task_id];
        let error = ops.delete(&event.event_id).await.err().map(|e| e.to_string());
        match &error {
            None => tracing::info!(task = %event.subject, "event deleted"),
            Some(error) => tracing::warn!(task = %event.subject, %error, "delete failed"),
        }
        outcomes.push(ActionOutcome {
            task_id: task_id.clone(),
            action: ActionKind::Delete,
            error,
        });
    }

    for task_id in &diff.to_update {
        let task = &tasks[task_id];
        let event = &events[task_id];
        if task.last_edited_time == event.last_edited_time {
            continue;
        }

        let payload = project::to_event(task);
        let error = ops
            .update(&event.event_id, &payload)
            .await
            .err()
            .map(|e| e.to_string());
        match &error {
            None => tracing::info!(task = %task.name, "event updated"),
            Some(error) => tracing::warn!(task = %task.name, %error, "update failed"),
        }
        outcomes.push(ActionOutcome {
            task_id: task_id.clone(),
            action: ActionKind::Update,
            error,
        });
    }

    SyncReport { diff, outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TextField;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(String),
        Update(String),
        Delete(String),
    }

    #[derive(Default)]
    struct MockOps {
        calls: Mutex<Vec<Call>>,
        fail_creates: bool,
    }

    impl MockOps {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CalendarOps for MockOps {
        async fn create(&self, payload: &EventPayload) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Create(payload.summary.clone()));
            if self.fail_creates {
                anyhow::bail!("calendar unavailable");
            }
            Ok(())
        }

        async fn update(&self, event_id: &str, _payload: &EventPayload) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Update(event_id.to_owned()));
            Ok(())
        }

        async fn delete(&self, event_id: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delete(event_id.to_owned()));
            Ok(())
        }
    }

    fn make_task(task_id: &str, edited: &str) -> Task {
        Task {
            task_id: task_id.to_owned(),
            name: TextField::Provided(format!("task {task_id}")),
            description: TextField::Defaulted(crate::task::NO_DESCRIPTION),
            notes: TextField::Defaulted(crate::task::NO_NOTES),
            category: TextField::Defaulted(crate::task::NO_CATEGORY),
            status: "Open".to_owned(),
            assignment_date: TextField::Provided("2024-04-01".to_owned()),
            assignment_hour: "08:00:00".to_owned(),
            due_date: "2024-05-01".to_owned(),
            due_hour: "14:30:00".to_owned(),
            user_time_zone: "03:00".to_owned(),
            last_edited_time: edited.to_owned(),
        }
    }

    fn make_event(task_id: &str, event_id: &str, edited: &str) -> Event {
        Event {
            event_id: event_id.to_owned(),
            subject: format!("task {task_id}"),
            description: "Description is empty!".to_owned(),
            notes: "Notes are empty!".to_owned(),
            category: "Not categorized!".to_owned(),
            assignment_date: "2024-04-01".to_owned(),
            due_date: "2024-05-01".to_owned(),
            due_hour: "15:00:00+03:00".to_owned(),
            last_edited_time: edited.to_owned(),
            task_id: task_id.to_owned(),
        }
    }

    fn task_map(tasks: Vec<Task>) -> HashMap<String, Task> {
        tasks.into_iter().map(|t| (t.task_id.clone(), t)).collect()
    }

    fn event_map(events: Vec<Event>) -> HashMap<String, Event> {
        events.into_iter().map(|e| (e.task_id.clone(), e)).collect()
    }

    #[test]
    fn classification_partitions_the_key_universe() {
        let tasks = task_map(vec![make_task("a", "t1"), make_task("b", "t1")]);
        let events = event_map(vec![
            make_event("b", "e-b", "t1"),
            make_event("c", "e-c", "t1"),
        ]);

        let diff = classify(&tasks, &events);
        assert_eq!(diff.to_create, HashSet::from(["a".to_owned()]));
        assert_eq!(diff.to_delete, HashSet::from(["c".to_owned()]));
        assert_eq!(diff.to_update, HashSet::from(["b".to_owned()]));

        // No key in two categories, no key omitted.
        let mut all: Vec<&String> = diff
            .to_create
            .iter()
            .chain(&diff.to_delete)
            .chain(&diff.to_update)
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn task_without_event_issues_one_create() {
        let tasks = task_map(vec![make_task("abc", "t1")]);
        let events = event_map(vec![]);
        let ops = MockOps::default();

        let report = synchronize(&tasks, &events, &ops).await;
        assert_eq!(ops.calls(), vec![Call::Create("task abc".to_owned())]);
        assert_eq!(report.applied(ActionKind::Create), 1);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn event_without_task_issues_one_delete() {
        let tasks = task_map(vec![]);
        let events = event_map(vec![make_event("xyz", "e-xyz", "t1")]);
        let ops = MockOps::default();

        let report = synchronize(&tasks, &events, &ops).await;
        assert_eq!(ops.calls(), vec![Call::Delete("e-xyz".to_owned())]);
        assert_eq!(report.applied(ActionKind::Delete), 1);
    }

    #[tokio::test]
    async fn matching_edit_markers_issue_no_calls() {
        let tasks = task_map(vec![make_task("abc", "t1")]);
        let events = event_map(vec![make_event("abc", "e-abc", "t1")]);
        let ops = MockOps::default();

        let report = synchronize(&tasks, &events, &ops).await;
        assert!(ops.calls().is_empty());
        assert!(report.outcomes.is_empty());
        assert_eq!(report.diff.to_update.len(), 1);
    }

    #[tokio::test]
    async fn changed_edit_marker_issues_one_update_with_same_event_id() {
        let tasks = task_map(vec![make_task("abc", "t2")]);
        let events = event_map(vec![make_event("abc", "e-abc", "t1")]);
        let ops = MockOps::default();

        let report = synchronize(&tasks, &events, &ops).await;
        assert_eq!(ops.calls(), vec![Call::Update("e-abc".to_owned())]);
        assert_eq!(report.applied(ActionKind::Update), 1);
    }

    #[tokio::test]
    async fn port_failure_is_recorded_and_siblings_proceed() {
        let tasks = task_map(vec![make_task("a", "t1")]);
        let events = event_map(vec![make_event("c", "e-c", "t1")]);
        let ops = MockOps {
            fail_creates: true,
            ..Default::default()
        };

        let report = synchronize(&tasks, &events, &ops).await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.applied(ActionKind::Delete), 1);
        let failure = report
            .outcomes
            .iter()
            .find(|o| o.action == ActionKind::Create)
            .unwrap();
        assert_eq!(failure.error.as_deref(), Some("calendar unavailable"));
        assert!(ops.calls().contains(&Call::Delete("e-c".to_owned())));
    }

    #[test]
    fn stale_keys_only_reports_differing_markers() {
        let tasks = task_map(vec![make_task("a", "t2"), make_task("b", "t1")]);
        let events = event_map(vec![
            make_event("a", "e-a", "t1"),
            make_event("b", "e-b", "t1"),
        ]);

        let diff = classify(&tasks, &events);
        let stale = stale_keys(&diff, &tasks, &events);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].as_str(), "a");
    }
}
