use serde::{Deserialize, Serialize};

use crate::{Day, HabitId};

/// Number of habit slots shown on the board.
pub const HABIT_SLOTS: usize = 4;

/// Name given to padding slots until the user renames them.
pub const PLACEHOLDER_NAME: &str = "Click to Edit";

/// Habits created for a user the first time their list is read.
pub const DEFAULT_HABITS: [(&str, &str); 3] = [
    ("h1", "Wake up 6am"),
    ("h2", "No A**"),
    ("h3", "NO dopamine"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    pub completed_dates: Vec<Day>,
}

impl Habit {
    #[must_use]
    pub fn new(id: HabitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed_dates: Vec::new(),
        }
    }

    #[must_use]
    pub fn placeholder(index: usize) -> Self {
        Self::new(HabitId::placeholder(index), PLACEHOLDER_NAME)
    }

    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_HABITS
            .iter()
            .map(|(id, name)| Self::new(HabitId::new(*id), *name))
            .collect()
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_placeholder()
    }

    #[must_use]
    pub fn is_done_on(&self, day: Day) -> bool {
        self.completed_dates.contains(&day)
    }

    /// Mark `day` done if it is not, otherwise unmark it.
    pub fn toggle(&mut self, day: Day) {
        if self.is_done_on(day) {
            self.completed_dates.retain(|d| *d != day);
        } else {
            self.completed_dates.push(day);
        }
    }
}

/// Fill `habits` up to [`HABIT_SLOTS`] with placeholders, dropping any extras.
#[must_use]
pub fn pad_habits(mut habits: Vec<Habit>) -> Vec<Habit> {
    while habits.len() < HABIT_SLOTS {
        let index = habits.len();
        habits.push(Habit::placeholder(index));
    }
    habits.truncate(HABIT_SLOTS);
    habits
}
