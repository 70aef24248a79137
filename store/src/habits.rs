use focuslab_types::{Day, Habit, HabitId};
use rusqlite::{Connection, params};

use crate::{Store, StoreError, StoreResult, is_constraint_violation};

fn encode_dates(dates: &[Day]) -> StoreResult<String> {
    serde_json::to_string(dates).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_dates(id: &str, raw: &str) -> StoreResult<Vec<Day>> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("habit {id} completed_dates: {e}")))
}

fn select_habits(conn: &Connection, owner: &str, limit: usize) -> StoreResult<Vec<Habit>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, completed_dates FROM habits WHERE owner = ?1 ORDER BY rowid LIMIT ?2",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(params![owner, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, name, dates)| {
            let completed_dates = decode_dates(&id, &dates)?;
            Ok(Habit {
                id: HabitId::new(id),
                name,
                completed_dates,
            })
        })
        .collect()
}

impl Store {
    /// Habits owned by `owner` in insertion order, at most `limit`.
    pub fn list_habits(&self, owner: &str, limit: usize) -> StoreResult<Vec<Habit>> {
        select_habits(&self.conn(), owner, limit)
    }

    /// List habits, first creating the default set when `owner` has none.
    pub fn list_or_seed_habits(&self, owner: &str, limit: usize) -> StoreResult<Vec<Habit>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let existing = select_habits(&tx, owner, limit)?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let defaults = Habit::defaults();
        for habit in &defaults {
            tx.execute(
                "INSERT INTO habits (owner, id, name, completed_dates) VALUES (?1, ?2, ?3, ?4)",
                params![
                    owner,
                    habit.id.as_str(),
                    habit.name,
                    encode_dates(&habit.completed_dates)?
                ],
            )?;
        }
        tx.commit()?;
        tracing::debug!(owner, count = defaults.len(), "Seeded default habits");
        Ok(defaults.into_iter().take(limit).collect())
    }

    pub fn insert_habit(&self, owner: &str, habit: &Habit) -> StoreResult<()> {
        let dates = encode_dates(&habit.completed_dates)?;
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO habits (owner, id, name, completed_dates) VALUES (?1, ?2, ?3, ?4)",
            params![owner, habit.id.as_str(), habit.name, dates],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(StoreError::Conflict(format!("habit {}", habit.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store `habit` under `id`, replacing any existing habit with that id.
    ///
    /// The path id wins over `habit.id`.
    pub fn replace_habit(&self, owner: &str, id: &HabitId, habit: &Habit) -> StoreResult<()> {
        let dates = encode_dates(&habit.completed_dates)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO habits (owner, id, name, completed_dates) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner, id) DO UPDATE SET
                 name = excluded.name,
                 completed_dates = excluded.completed_dates",
            params![owner, id.as_str(), habit.name, dates],
        )?;
        Ok(())
    }
}
