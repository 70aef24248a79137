//! Core domain types for FocusLab.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Both the server and the client build on it.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod auth;
mod day;
mod habit;
mod ids;
pub mod motivation;
pub mod stats;
mod task;
pub mod text;

pub use auth::{Credentials, LoginForm, TokenResponse};
pub use day::{Day, DayParseError, WEEKDAY_NAMES};
pub use habit::{DEFAULT_HABITS, HABIT_SLOTS, Habit, PLACEHOLDER_NAME, pad_habits};
pub use ids::{HabitId, TaskId};
pub use motivation::{MotivationKind, MotivationRequest, MotivationResponse};
pub use stats::Progress;
pub use task::{Task, TaskPatch};
pub use text::truncate_with_ellipsis;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task text: trimmed, never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("text must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        match value.trim() {
            "" => Err(EmptyStringError),
            trimmed if trimmed.len() == value.len() => Ok(Self(value)),
            trimmed => Ok(Self(trimmed.to_owned())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
