use focuslab_types::{Day, NonEmptyString, Task, TaskId, TaskPatch};
use rusqlite::{OptionalExtension, Row, params};

use crate::{
    Store, StoreError, StoreResult, format_timestamp, is_constraint_violation, parse_timestamp,
};

const TASK_COLUMNS: &str = "id, text, is_completed, date, created_at";

struct TaskRow {
    id: String,
    text: String,
    is_completed: bool,
    date: String,
    created_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            is_completed: row.get(2)?,
            date: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_task(self) -> StoreResult<Task> {
        let text = NonEmptyString::new(self.text)
            .map_err(|_| StoreError::Corrupt(format!("task {} has empty text", self.id)))?;
        let date = Day::parse(&self.date)
            .map_err(|e| StoreError::Corrupt(format!("task {} date: {e}", self.id)))?;
        Ok(Task {
            id: TaskId::new(self.id),
            text,
            is_completed: self.is_completed,
            date,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl Store {
    /// Tasks owned by `owner` in insertion order, at most `limit`.
    pub fn list_tasks(&self, owner: &str, limit: usize) -> StoreResult<Vec<Task>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner = ?1 ORDER BY rowid LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![owner, limit], TaskRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    pub fn insert_task(&self, owner: &str, task: &Task) -> StoreResult<()> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO tasks (owner, id, text, is_completed, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                owner,
                task.id.as_str(),
                task.text.as_str(),
                task.is_completed,
                task.date.to_string(),
                format_timestamp(task.created_at),
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(StoreError::Conflict(format!("task {}", task.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `patch` to one of `owner`'s tasks. Returns `false` when no such task exists.
    pub fn update_task(&self, owner: &str, id: &TaskId, patch: &TaskPatch) -> StoreResult<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let row = tx
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner = ?1 AND id = ?2"),
                params![owner, id.as_str()],
                TaskRow::from_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(false);
        };

        let mut task = row.into_task()?;
        task.apply(patch);
        tx.execute(
            "UPDATE tasks SET text = ?3, is_completed = ?4, date = ?5
             WHERE owner = ?1 AND id = ?2",
            params![
                owner,
                id.as_str(),
                task.text.as_str(),
                task.is_completed,
                task.date.to_string(),
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Returns `false` when no such task exists.
    pub fn delete_task(&self, owner: &str, id: &TaskId) -> StoreResult<bool> {
        let conn = self.conn();
        let removed = conn.execute(
            "DELETE FROM tasks WHERE owner = ?1 AND id = ?2",
            params![owner, id.as_str()],
        )?;
        Ok(removed > 0)
    }
}
