use std::fmt;

use uuid::Uuid;

const PLACEHOLDER_PREFIX: &str = "temp_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Habit identifier.
///
/// Ids starting with `temp_` mark client-side padding slots that have never
/// been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id for the padding slot at `index`.
    #[must_use]
    pub fn placeholder(index: usize) -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{index}_{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{HabitId, TaskId};

    #[test]
    fn generated_task_ids_are_distinct() {
        assert_ne!(TaskId::generate(), TaskId::generate());
    }

    #[test]
    fn placeholder_ids_are_recognized() {
        let id = HabitId::placeholder(2);
        assert!(id.as_str().starts_with("temp_2_"));
        assert!(id.is_placeholder());
        assert!(!HabitId::new("h1").is_placeholder());
        assert!(!HabitId::generate().is_placeholder());
    }

    #[test]
    fn ids_serialize_as_bare_strings() {
        let json = serde_json::to_string(&TaskId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
