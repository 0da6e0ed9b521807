use chrono::{DateTime, Utc};
use rusqlite::{ErrorCode, params};

use crate::error::{MatchError, Result};
use crate::models::{EligibleUser, SlotOccurrence, WaitlistEntry};
use crate::store::WaitlistProvider;

use super::SqliteStateStore;
use super::users::user_from_row;

impl SqliteStateStore {
    /// Returns `false` when the user was already on the waitlist.
    pub fn join_waitlist(
        &self,
        occurrence: &SlotOccurrence,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = self.with_conn(|conn| {
            let affected = conn.execute(
                r"
                INSERT INTO waitlist_entries(occurrence_key, occurrence_date, slot_label, user_id, joined_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(occurrence_key, user_id) DO NOTHING
                ",
                params![
                    occurrence.key(),
                    occurrence.date.to_string(),
                    occurrence.slot.label,
                    user_id,
                    now.to_rfc3339()
                ],
            )?;
            Ok(affected > 0)
        });
        match result {
            Err(MatchError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(MatchError::NotFound(format!("user {user_id}")))
            }
            other => other,
        }
    }

    pub fn leave_waitlist(&self, occurrence: &SlotOccurrence, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM waitlist_entries WHERE occurrence_key = ?1 AND user_id = ?2",
                params![occurrence.key(), user_id],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn list_waitlist(&self, occurrence: &SlotOccurrence) -> Result<Vec<WaitlistEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT occurrence_key, user_id, joined_at
                FROM waitlist_entries
                WHERE occurrence_key = ?1
                ORDER BY joined_at ASC, user_id ASC
                ",
            )?;
            let rows = stmt.query_map(params![occurrence.key()], |row| {
                Ok(WaitlistEntry {
                    occurrence_key: row.get(0)?,
                    user_id: row.get(1)?,
                    joined_at: row.get(2)?,
                })
            })?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}

impl WaitlistProvider for SqliteStateStore {
    /// Waitlisted users in join order.
    fn eligible_users(&self, occurrence: &SlotOccurrence) -> Result<Vec<EligibleUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT u.id, u.birth_date, u.gender, u.interests_json
                FROM waitlist_entries w
                JOIN users u ON u.id = w.user_id
                WHERE w.occurrence_key = ?1
                ORDER BY w.joined_at ASC, u.id ASC
                ",
            )?;
            let rows = stmt.query_map(params![occurrence.key()], user_from_row)?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}
