use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::{
    Store, StoreError, StoreResult, format_timestamp, is_constraint_violation, parse_timestamp,
};

/// A registered account. Emails are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Store {
    /// Register a user. Fails with [`StoreError::Conflict`] when the email is taken.
    pub fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let record = UserRecord {
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![
                record.email,
                record.password_hash,
                format_timestamp(record.created_at)
            ],
        );
        match inserted {
            Ok(_) => Ok(record),
            Err(e) if is_constraint_violation(&e) => {
                Err(StoreError::Conflict(format!("user {}", record.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_user(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT email, password_hash, created_at FROM users WHERE email = ?1",
                params![normalize_email(email)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(email, password_hash, created_at)| {
            Ok(UserRecord {
                email,
                password_hash,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }
}
