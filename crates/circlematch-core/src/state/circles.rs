use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::error::{MatchError, Result};
use crate::models::{
    Circle, ClaimOutcome, MatchingStatus, MatchingStatusRecord, NewCircle, SlotOccurrence,
};
use crate::store::CircleStore;

use super::{SqliteStateStore, usize_to_i64_saturating};

impl CircleStore for SqliteStateStore {
    fn claim_occurrence(
        &self,
        occurrence: &SlotOccurrence,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let key = occurrence.key();
        let now = now.to_rfc3339();
        self.with_tx(|tx| {
            let inserted = tx.execute(
                r"
                INSERT INTO matching_runs(occurrence_key, occurrence_date, slot_label, status, attempts, started_at)
                VALUES (?1, ?2, ?3, 'in_progress', 1, ?4)
                ON CONFLICT(occurrence_key) DO NOTHING
                ",
                params![key, occurrence.date.to_string(), occurrence.slot.label, now],
            )?;
            if inserted > 0 {
                return Ok(ClaimOutcome::Claimed { resumed: false });
            }

            let reclaimed = tx.execute(
                r"
                UPDATE matching_runs
                SET status = 'in_progress',
                    attempts = attempts + 1,
                    started_at = ?2,
                    finished_at = NULL,
                    error = NULL
                WHERE occurrence_key = ?1 AND status = 'failed'
                ",
                params![key, now],
            )?;
            if reclaimed > 0 {
                return Ok(ClaimOutcome::Claimed { resumed: true });
            }

            let status = tx.query_row(
                "SELECT status FROM matching_runs WHERE occurrence_key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )?;
            match parse_status(&status)? {
                MatchingStatus::Done => Ok(ClaimOutcome::AlreadyMatched),
                MatchingStatus::InProgress | MatchingStatus::Failed => Ok(ClaimOutcome::InProgress),
            }
        })
    }

    fn complete_occurrence(&self, occurrence_key: &str, now: DateTime<Utc>) -> Result<()> {
        self.finish_run(occurrence_key, now, MatchingStatus::Done, None)
    }

    fn fail_occurrence(
        &self,
        occurrence_key: &str,
        now: DateTime<Utc>,
        error: &str,
    ) -> Result<()> {
        self.finish_run(occurrence_key, now, MatchingStatus::Failed, Some(error))
    }

    fn matching_status(&self, occurrence_key: &str) -> Result<Option<MatchingStatusRecord>> {
        let row = self.with_conn(|conn| {
            let row = conn
                .query_row(
                    r"
                    SELECT occurrence_key, status, attempts, started_at, finished_at, error
                    FROM matching_runs
                    WHERE occurrence_key = ?1
                    ",
                    params![occurrence_key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row)
        })?;

        row.map(
            |(occurrence_key, status, attempts, started_at, finished_at, error)| {
                Ok(MatchingStatusRecord {
                    occurrence_key,
                    status: parse_status(&status)?,
                    attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
                    started_at,
                    finished_at,
                    error,
                })
            },
        )
        .transpose()
    }

    fn create_circle(&self, circle: &NewCircle) -> Result<String> {
        if circle.member_ids.is_empty() {
            return Err(MatchError::Validation(format!(
                "circle {} has no members",
                circle.id
            )));
        }
        let occurrence_key = circle.occurrence.key();
        let result = self.with_tx(|tx| {
            tx.execute(
                r"
                INSERT INTO circles(id, occurrence_key, occurrence_date, slot_label, sequence, location, prompt, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
                params![
                    circle.id,
                    occurrence_key,
                    circle.occurrence.date.to_string(),
                    circle.occurrence.slot.label,
                    circle.sequence,
                    circle.location,
                    circle.prompt,
                    circle.created_at
                ],
            )?;
            let mut stmt = tx.prepare(
                r"
                INSERT INTO circle_members(circle_id, occurrence_key, user_id, position)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )?;
            for (position, user_id) in circle.member_ids.iter().enumerate() {
                stmt.execute(params![
                    circle.id,
                    occurrence_key,
                    user_id,
                    usize_to_i64_saturating(position)
                ])?;
            }
            Ok(circle.id.clone())
        });

        match result {
            Err(MatchError::Sqlite(rusqlite::Error::SqliteFailure(err, message)))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(MatchError::Conflict(format!(
                    "circle {} rejected for {occurrence_key}: {}",
                    circle.id,
                    message.unwrap_or_else(|| "constraint violation".to_string())
                )))
            }
            other => other,
        }
    }

    fn assigned_user_ids(&self, occurrence_key: &str) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id FROM circle_members WHERE occurrence_key = ?1")?;
            let rows = stmt.query_map(params![occurrence_key], |row| row.get::<_, String>(0))?;

            let mut out = HashSet::new();
            for row in rows {
                out.insert(row?);
            }
            Ok(out)
        })
    }

    fn circle_count(&self, occurrence_key: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM circles WHERE occurrence_key = ?1",
                params![occurrence_key],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    fn next_circle_sequence(&self, occurrence_key: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let max = conn.query_row(
                "SELECT COALESCE(MAX(sequence), 0) FROM circles WHERE occurrence_key = ?1",
                params![occurrence_key],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(u32::try_from(max).unwrap_or(u32::MAX).saturating_add(1))
        })
    }

    fn list_circles(&self, occurrence_key: &str) -> Result<Vec<Circle>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT id, sequence, occurrence_key, occurrence_date, slot_label, location, prompt, created_at
                FROM circles
                WHERE occurrence_key = ?1
                ORDER BY sequence ASC
                ",
            )?;
            let rows = stmt.query_map(params![occurrence_key], circle_from_row)?;

            let mut out = Vec::new();
            for row in rows {
                let mut circle = row?;
                circle.member_ids = load_member_ids(conn, &circle.id)?;
                out.push(circle);
            }
            Ok(out)
        })
    }

    fn circle_for_user(&self, occurrence_key: &str, user_id: &str) -> Result<Option<Circle>> {
        self.with_conn(|conn| {
            let circle = conn
                .query_row(
                    r"
                    SELECT c.id, c.sequence, c.occurrence_key, c.occurrence_date, c.slot_label, c.location, c.prompt, c.created_at
                    FROM circle_members m
                    JOIN circles c ON c.id = m.circle_id
                    WHERE m.occurrence_key = ?1 AND m.user_id = ?2
                    ",
                    params![occurrence_key, user_id],
                    circle_from_row,
                )
                .optional()?;
            match circle {
                Some(mut circle) => {
                    circle.member_ids = load_member_ids(conn, &circle.id)?;
                    Ok(Some(circle))
                }
                None => Ok(None),
            }
        })
    }
}

impl SqliteStateStore {
    fn finish_run(
        &self,
        occurrence_key: &str,
        now: DateTime<Utc>,
        status: MatchingStatus,
        error: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                r"
                UPDATE matching_runs
                SET status = ?2, finished_at = ?3, error = ?4
                WHERE occurrence_key = ?1 AND status = 'in_progress'
                ",
                params![occurrence_key, status.as_str(), now.to_rfc3339(), error],
            )?;
            if affected == 0 {
                return Err(MatchError::Conflict(format!(
                    "matching run {occurrence_key} is not in progress"
                )));
            }
            Ok(())
        })
    }
}

fn parse_status(raw: &str) -> Result<MatchingStatus> {
    raw.parse::<MatchingStatus>().map_err(MatchError::Store)
}

/// Members are filled in separately; see `load_member_ids`.
fn circle_from_row(row: &Row<'_>) -> rusqlite::Result<Circle> {
    let raw_date = row.get::<_, String>(3)?;
    let date = raw_date.parse::<NaiveDate>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(Circle {
        id: row.get(0)?,
        sequence: row.get(1)?,
        occurrence_key: row.get(2)?,
        date,
        slot_label: row.get(4)?,
        location: row.get(5)?,
        prompt: row.get(6)?,
        created_at: row.get(7)?,
        member_ids: Vec::new(),
    })
}

fn load_member_ids(conn: &Connection, circle_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM circle_members WHERE circle_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![circle_id], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
