// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Owner assigned to tasks created on this device.
pub const DEFAULT_OWNER_ID: i64 = 1;

#[allow(clippy::doc_overindented_list_items)]
/// Represents a task stored in the local `tasks` table.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON.
/// - `PartialEq`, `Eq`: Lets UI state holders compare snapshots.
/// - `sqlx::FromRow`: Allows `sqlx` to create a `Task` instance directly
///    from a database result row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Task {
    // 0 until the store assigns a key.
    #[sqlx(rename = "id")]
    pub id: i64,

    // Identifier on the remote endpoint; `None` for tasks created locally.
    #[sqlx(rename = "origin_id")]
    pub origin_id: Option<i64>,

    #[sqlx(rename = "owner_id")]
    pub owner_id: i64,

    #[sqlx(rename = "title")]
    pub title: String,

    #[sqlx(rename = "description")]
    pub description: String,

    #[sqlx(rename = "is_completed")]
    pub is_completed: bool,

    // We use NaiveDate because we are only interested in the day,
    // without a timezone.
    #[sqlx(rename = "due_date")]
    pub due_date: Option<NaiveDate>,
}

impl Task {
    /// Builds a task created on this device that has not been persisted yet.
    pub fn new_local(title: &str, description: &str, due_date: Option<NaiveDate>) -> Self {
        Self {
            id: 0,
            origin_id: None,
            owner_id: DEFAULT_OWNER_ID,
            title: title.to_string(),
            description: description.to_string(),
            is_completed: false,
            due_date,
        }
    }

    /// Remote-derived tasks are replaced wholesale on every successful sync.
    pub fn is_remote_derived(&self) -> bool {
        self.origin_id.is_some()
    }

    /// Returns a full copy of the task with the completion flag flipped.
    pub fn toggled(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }

    /// Classifies the due date relative to `today`. Nothing here is stored,
    /// so callers should pass the current date at read time.
    pub fn due_status(&self, today: NaiveDate) -> Option<DueStatus> {
        let due = self.due_date?;
        let tomorrow = today.checked_add_days(Days::new(1))?;
        let next_week = today.checked_add_days(Days::new(7))?;

        let status = if due < today {
            DueStatus::Overdue
        } else if due == today {
            DueStatus::Today
        } else if due == tomorrow {
            DueStatus::Tomorrow
        } else if due < next_week {
            DueStatus::ThisWeek
        } else {
            DueStatus::Later
        };
        Some(status)
    }

    /// Human readable due date, e.g. "Today" or "Mon, Jan 5, 2026".
    /// Empty when the task has no due date.
    pub fn due_label(&self, today: NaiveDate) -> String {
        match (self.due_date, self.due_status(today)) {
            (None, _) => String::new(),
            (Some(_), Some(DueStatus::Today)) => "Today".to_string(),
            (Some(_), Some(DueStatus::Tomorrow)) => "Tomorrow".to_string(),
            (Some(due), _) => due.format("%a, %b %-d, %Y").to_string(),
        }
    }
}

/// The current calendar day in the user's local time zone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Where a due date falls relative to the current day.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    Later,
}

/// Task payload as served by the remote `/todos` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteTask {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub title: String,
    pub completed: bool,
}

/// Maps a remote payload into a fresh, unpersisted local row.
/// The remote payload has no description, so the title is mirrored into it.
impl From<RemoteTask> for Task {
    fn from(remote: RemoteTask) -> Self {
        Self {
            id: 0,
            origin_id: Some(remote.id),
            owner_id: remote.user_id,
            description: remote.title.clone(),
            title: remote.title,
            is_completed: remote.completed,
            due_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due_on(due: Option<NaiveDate>) -> Task {
        Task::new_local("Pay rent", "", due)
    }

    #[test]
    fn test_remote_task_maps_to_unpersisted_row() {
        let remote = RemoteTask {
            id: 7,
            user_id: 3,
            title: "Buy milk".to_string(),
            completed: true,
        };

        let task = Task::from(remote);

        assert_eq!(task.id, 0);
        assert_eq!(task.origin_id, Some(7));
        assert_eq!(task.owner_id, 3);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "Buy milk");
        assert!(task.is_completed);
        assert_eq!(task.due_date, None);
        assert!(task.is_remote_derived());
    }

    #[test]
    fn test_remote_task_reads_wire_field_names() {
        let json = r#"{"userId": 1, "id": 1, "title": "delectus aut autem", "completed": false}"#;
        let remote: RemoteTask = serde_json::from_str(json).unwrap();
        assert_eq!(remote.user_id, 1);
        assert_eq!(remote.title, "delectus aut autem");
        assert!(!remote.completed);
    }

    #[test]
    fn test_new_local_defaults() {
        let task = Task::new_local("Write report", "", None);
        assert_eq!(task.id, 0);
        assert_eq!(task.owner_id, DEFAULT_OWNER_ID);
        assert!(!task.is_completed);
        assert!(!task.is_remote_derived());
    }

    #[test]
    fn test_toggled_keeps_other_fields() {
        let task = due_on(Some(date(2026, 1, 5)));
        let toggled = task.toggled();
        assert!(toggled.is_completed);
        assert_eq!(toggled.title, task.title);
        assert_eq!(toggled.due_date, task.due_date);
        assert!(!toggled.toggled().is_completed);
    }

    #[test]
    fn test_due_status_classification() {
        let today = date(2026, 3, 10);

        assert_eq!(due_on(None).due_status(today), None);
        assert_eq!(
            due_on(Some(date(2026, 3, 9))).due_status(today),
            Some(DueStatus::Overdue)
        );
        assert_eq!(
            due_on(Some(today)).due_status(today),
            Some(DueStatus::Today)
        );
        assert_eq!(
            due_on(Some(date(2026, 3, 11))).due_status(today),
            Some(DueStatus::Tomorrow)
        );
        assert_eq!(
            due_on(Some(date(2026, 3, 16))).due_status(today),
            Some(DueStatus::ThisWeek)
        );
        // Exactly one week out is no longer "this week".
        assert_eq!(
            due_on(Some(date(2026, 3, 17))).due_status(today),
            Some(DueStatus::Later)
        );
    }

    #[test]
    fn test_due_label() {
        let today = date(2026, 1, 1);
        assert_eq!(due_on(None).due_label(today), "");
        assert_eq!(due_on(Some(today)).due_label(today), "Today");
        assert_eq!(due_on(Some(date(2026, 1, 2))).due_label(today), "Tomorrow");
        assert_eq!(
            due_on(Some(date(2026, 1, 5))).due_label(today),
            "Mon, Jan 5, 2026"
        );
    }

    #[test]
    fn test_local_today_labels_today() {
        let today = local_today();
        assert_eq!(today, Local::now().date_naive());
        assert_eq!(due_on(Some(today)).due_label(local_today()), "Today");
    }
}
