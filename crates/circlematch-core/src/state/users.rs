use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::{EligibleUser, Gender};

use super::SqliteStateStore;

impl SqliteStateStore {
    pub fn upsert_user(&self, user: &EligibleUser, now: DateTime<Utc>) -> Result<()> {
        let interests_json = serde_json::to_string(&user.interests)?;
        let now = now.to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                r"
                INSERT INTO users(id, birth_date, gender, interests_json, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ON CONFLICT(id) DO UPDATE SET
                  birth_date = excluded.birth_date,
                  gender = excluded.gender,
                  interests_json = excluded.interests_json,
                  updated_at = excluded.updated_at
                ",
                params![
                    user.id,
                    user.birth_date.map(|date| date.to_string()),
                    user.gender.map(Gender::as_str),
                    interests_json,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<EligibleUser>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, birth_date, gender, interests_json FROM users WHERE id = ?1",
                    params![id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }
}

/// Expects columns `id, birth_date, gender, interests_json` in that order.
pub(super) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<EligibleUser> {
    let birth_date = row
        .get::<_, Option<String>>(1)?
        .and_then(|raw| raw.parse::<NaiveDate>().ok());
    let gender = Gender::parse_optional(row.get::<_, Option<String>>(2)?.as_deref());
    let interests = serde_json::from_str::<Vec<String>>(&row.get::<_, String>(3)?)
        .unwrap_or_default();
    Ok(EligibleUser {
        id: row.get(0)?,
        birth_date,
        gender,
        interests,
    })
}
