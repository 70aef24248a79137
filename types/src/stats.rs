//! Dashboard metrics derived from the task and habit lists.

use crate::{Day, Habit, Task};

/// Minimum bar-chart scale so a near-empty week still renders small bars.
const MIN_CHART_SCALE: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
}

impl Progress {
    fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut acc, task| {
            acc.total += 1;
            if task.is_completed {
                acc.completed += 1;
            }
            acc
        })
    }

    /// Completed share in `[0, 1]`; zero when there are no tasks.
    #[must_use]
    pub fn ratio(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.ratio() * 100.0
    }

    #[must_use]
    pub fn remaining(self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.total == 0
    }
}

#[must_use]
pub fn day_progress(tasks: &[Task], day: Day) -> Progress {
    Progress::from_tasks(tasks.iter().filter(|t| t.date == day))
}

#[must_use]
pub fn month_progress(tasks: &[Task], year: i32, month: u32) -> Progress {
    Progress::from_tasks(
        tasks
            .iter()
            .filter(|t| t.date.year() == year && t.date.month() == month),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSummary {
    pub days: [(Day, Progress); 7],
    /// Height that a full bar represents.
    pub scale: usize,
}

impl WeekSummary {
    #[must_use]
    pub fn new(tasks: &[Task], any_day: Day) -> Self {
        let days = any_day.week().map(|day| (day, day_progress(tasks, day)));
        let scale = days
            .iter()
            .map(|(_, p)| p.total)
            .max()
            .unwrap_or(0)
            .max(MIN_CHART_SCALE);
        Self { days, scale }
    }

    #[must_use]
    pub fn total(&self) -> Progress {
        self.days.iter().fold(Progress::default(), |acc, (_, p)| Progress {
            total: acc.total + p.total,
            completed: acc.completed + p.completed,
        })
    }
}

/// Consecutive completed days ending at `today`, or at yesterday when today
/// is not yet ticked.
#[must_use]
pub fn habit_streak(habit: &Habit, today: Day) -> usize {
    let mut cursor = if habit.is_done_on(today) {
        today
    } else {
        today.pred()
    };
    let mut streak = 0;
    while habit.is_done_on(cursor) {
        streak += 1;
        let prev = cursor.pred();
        if prev == cursor {
            break;
        }
        cursor = prev;
    }
    streak
}
