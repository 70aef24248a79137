use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Day, EmptyStringError, NonEmptyString, TaskId};

/// A single entry on the weekly board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: NonEmptyString,
    pub is_completed: bool,
    pub date: Day,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// A fresh, uncompleted task for `date`.
    pub fn new(text: impl Into<String>, date: Day) -> Result<Self, EmptyStringError> {
        Ok(Self {
            id: TaskId::generate(),
            text: NonEmptyString::new(text)?,
            is_completed: false,
            date,
            created_at: Utc::now(),
        })
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(done) = patch.is_completed {
            self.is_completed = done;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
    }
}

/// Partial task update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<NonEmptyString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Day>,
}

impl TaskPatch {
    #[must_use]
    pub fn completion(done: bool) -> Self {
        Self {
            is_completed: Some(done),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.is_completed.is_none() && self.date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskPatch};
    use crate::Day;

    fn day() -> Day {
        Day::parse("2024-03-07").unwrap()
    }

    #[test]
    fn new_task_starts_open() {
        let task = Task::new("write report", day()).unwrap();
        assert!(!task.is_completed);
        assert_eq!(task.text.as_str(), "write report");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(Task::new("   ", day()).is_err());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let task = Task::new("read", day()).unwrap();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["date"], "2024-03-07");
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn accepts_browser_timestamps() {
        let raw = r#"{"id":"a","text":"t","isCompleted":true,"date":"2024-03-07",
            "createdAt":"2024-03-07T08:15:00.000Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert!(task.is_completed);
    }

    #[test]
    fn completion_patch_only_carries_flag() {
        let value = serde_json::to_value(TaskPatch::completion(true)).unwrap();
        assert_eq!(value, serde_json::json!({ "isCompleted": true }));
    }

    #[test]
    fn apply_touches_only_present_fields() {
        let mut task = Task::new("read", day()).unwrap();
        let before = task.clone();
        task.apply(&TaskPatch::default());
        assert_eq!(task, before);

        task.apply(&TaskPatch::completion(true));
        assert!(task.is_completed);
        assert_eq!(task.text, before.text);
    }
}
