//! Optimistic board state.
//!
//! Every mutation updates local state immediately and hands back the
//! [`SyncOp`] that persists it. Local state is never rolled back when the
//! remote call fails.

use focuslab_types::stats::{Progress, day_progress};
use focuslab_types::{Day, Habit, HabitId, Task, TaskId, TaskPatch, pad_habits};
use thiserror::Error;

use crate::{ApiClient, ClientError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Please rename this habit first!")]
    HabitNotNamed,
    #[error("no {kind} matches '{query}'")]
    NotFound { kind: &'static str, query: String },
    #[error("'{query}' matches more than one {kind}")]
    Ambiguous { kind: &'static str, query: String },
}

/// A remote write that follows a local mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    CreateTask(Task),
    UpdateTask { id: TaskId, patch: TaskPatch },
    DeleteTask(TaskId),
    CreateHabit(Habit),
    UpdateHabit(Habit),
}

impl SyncOp {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateTask(_) => "create_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask(_) => "delete_task",
            Self::CreateHabit(_) => "create_habit",
            Self::UpdateHabit(_) => "update_habit",
        }
    }

    pub async fn send(&self, api: &ApiClient) -> Result<(), ClientError> {
        match self {
            Self::CreateTask(task) => api.create_task(task).await,
            Self::UpdateTask { id, patch } => api.update_task(id, patch).await,
            Self::DeleteTask(id) => api.delete_task(id).await,
            Self::CreateHabit(habit) => api.create_habit(habit).await,
            Self::UpdateHabit(habit) => api.update_habit(habit).await,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    tasks: Vec<Task>,
    habits: Vec<Habit>,
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace state with freshly fetched lists. Habits are padded (or
    /// truncated) to the fixed slot count.
    pub fn load(&mut self, tasks: Vec<Task>, habits: Vec<Habit>) {
        self.tasks = tasks;
        self.habits = pad_habits(habits);
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.habits.clear();
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn tasks_on(&self, day: Day) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.date == day)
    }

    #[must_use]
    pub fn progress_on(&self, day: Day) -> Progress {
        day_progress(&self.tasks, day)
    }

    pub fn add_task(&mut self, day: Day, text: &str) -> Option<SyncOp> {
        let task = Task::new(text.trim(), day).ok()?;
        self.tasks.push(task.clone());
        Some(SyncOp::CreateTask(task))
    }

    pub fn toggle_task(&mut self, id: &TaskId) -> Option<SyncOp> {
        let task = self.tasks.iter_mut().find(|task| task.id == *id)?;
        task.is_completed = !task.is_completed;
        Some(SyncOp::UpdateTask {
            id: id.clone(),
            patch: TaskPatch::completion(task.is_completed),
        })
    }

    pub fn delete_task(&mut self, id: &TaskId) -> SyncOp {
        self.tasks.retain(|task| task.id != *id);
        SyncOp::DeleteTask(id.clone())
    }

    pub fn toggle_habit(&mut self, id: &HabitId, day: Day) -> Result<Option<SyncOp>, BoardError> {
        let Some(habit) = self.habits.iter_mut().find(|habit| habit.id == *id) else {
            return Ok(None);
        };
        if habit.is_placeholder() {
            return Err(BoardError::HabitNotNamed);
        }
        habit.toggle(day);
        Ok(Some(SyncOp::UpdateHabit(habit.clone())))
    }

    /// Renaming a placeholder turns it into a new habit with a fresh id.
    pub fn rename_habit(&mut self, id: &HabitId, name: &str) -> Option<SyncOp> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let habit = self.habits.iter_mut().find(|habit| habit.id == *id)?;
        if habit.is_placeholder() {
            *habit = Habit::new(HabitId::generate(), name);
            Some(SyncOp::CreateHabit(habit.clone()))
        } else {
            habit.name = name.to_string();
            Some(SyncOp::UpdateHabit(habit.clone()))
        }
    }

    /// Resolve a full id or unique id prefix.
    pub fn find_task(&self, query: &str) -> Result<TaskId, BoardError> {
        resolve_prefix(
            "task",
            query,
            self.tasks.iter().map(|task| task.id.as_str()),
        )
        .map(TaskId::new)
    }

    /// Resolve a 1-based slot number, a full id, or a unique id prefix.
    pub fn find_habit(&self, query: &str) -> Result<HabitId, BoardError> {
        if let Ok(slot) = query.parse::<usize>()
            && let Some(habit) = slot.checked_sub(1).and_then(|i| self.habits.get(i))
        {
            return Ok(habit.id.clone());
        }
        resolve_prefix(
            "habit",
            query,
            self.habits.iter().map(|habit| habit.id.as_str()),
        )
        .map(HabitId::new)
    }
}

fn resolve_prefix<'a>(
    kind: &'static str,
    query: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<&'a str, BoardError> {
    let query = query.trim();
    let mut matches = Vec::new();
    for id in ids {
        if id == query {
            return Ok(id);
        }
        if !query.is_empty() && id.starts_with(query) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [only] => Ok(*only),
        [] => Err(BoardError::NotFound {
            kind,
            query: query.to_string(),
        }),
        _ => Err(BoardError::Ambiguous {
            kind,
            query: query.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focuslab_types::HABIT_SLOTS;

    fn day() -> Day {
        Day::parse("2024-03-07").unwrap()
    }

    fn loaded() -> Board {
        let mut board = Board::new();
        board.load(Vec::new(), Habit::defaults());
        board
    }

    #[test]
    fn blank_text_adds_nothing() {
        let mut board = Board::new();
        assert_eq!(board.add_task(day(), "   "), None);
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn add_then_toggle_emits_completion_patch() {
        let mut board = Board::new();
        let Some(SyncOp::CreateTask(task)) = board.add_task(day(), "  Read  ") else {
            panic!("expected CreateTask");
        };
        assert_eq!(task.text.as_str(), "Read");

        let op = board.toggle_task(&task.id).unwrap();
        assert_eq!(
            op,
            SyncOp::UpdateTask {
                id: task.id.clone(),
                patch: TaskPatch::completion(true),
            }
        );
        assert!(board.tasks()[0].is_completed);
        assert_eq!(board.progress_on(day()), Progress { total: 1, completed: 1 });
    }

    #[test]
    fn toggling_unknown_task_is_noop() {
        let mut board = Board::new();
        assert_eq!(board.toggle_task(&TaskId::new("nope")), None);
    }

    #[test]
    fn delete_removes_locally() {
        let mut board = Board::new();
        let Some(SyncOp::CreateTask(task)) = board.add_task(day(), "x") else {
            panic!("expected CreateTask");
        };
        assert_eq!(board.delete_task(&task.id), SyncOp::DeleteTask(task.id));
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn load_pads_habits() {
        let board = loaded();
        assert_eq!(board.habits().len(), HABIT_SLOTS);
        assert!(board.habits()[3].is_placeholder());
    }

    #[test]
    fn placeholder_cannot_be_toggled() {
        let mut board = loaded();
        let placeholder = board.habits()[3].id.clone();
        assert_eq!(
            board.toggle_habit(&placeholder, day()),
            Err(BoardError::HabitNotNamed)
        );
        assert!(board.habits()[3].completed_dates.is_empty());
    }

    #[test]
    fn toggle_habit_sends_whole_habit() {
        let mut board = loaded();
        let id = HabitId::new("h1");
        let Ok(Some(SyncOp::UpdateHabit(habit))) = board.toggle_habit(&id, day()) else {
            panic!("expected UpdateHabit");
        };
        assert_eq!(habit.completed_dates, vec![day()]);
    }

    #[test]
    fn renaming_placeholder_creates_real_habit() {
        let mut board = loaded();
        let placeholder = board.habits()[3].id.clone();
        let Some(SyncOp::CreateHabit(habit)) = board.rename_habit(&placeholder, "Journal") else {
            panic!("expected CreateHabit");
        };
        assert!(!habit.is_placeholder());
        assert_ne!(habit.id, placeholder);
        assert_eq!(board.habits()[3], habit);
    }

    #[test]
    fn renaming_real_habit_updates_it() {
        let mut board = loaded();
        let op = board.rename_habit(&HabitId::new("h2"), "No sugar").unwrap();
        assert!(matches!(op, SyncOp::UpdateHabit(ref h) if h.name == "No sugar"));
        assert_eq!(board.rename_habit(&HabitId::new("h2"), "  "), None);
    }

    #[test]
    fn ids_resolve_by_prefix_and_slot() {
        let mut board = loaded();
        board.load(
            vec![
                Task {
                    id: TaskId::new("abc123"),
                    ..Task::new("a", day()).unwrap()
                },
                Task {
                    id: TaskId::new("abd456"),
                    ..Task::new("b", day()).unwrap()
                },
            ],
            Habit::defaults(),
        );
        assert_eq!(board.find_task("abc").unwrap(), TaskId::new("abc123"));
        assert!(matches!(
            board.find_task("ab"),
            Err(BoardError::Ambiguous { .. })
        ));
        assert!(matches!(
            board.find_task("zz"),
            Err(BoardError::NotFound { .. })
        ));
        assert_eq!(board.find_habit("2").unwrap(), HabitId::new("h2"));
        assert_eq!(board.find_habit("h3").unwrap(), HabitId::new("h3"));
    }
}
