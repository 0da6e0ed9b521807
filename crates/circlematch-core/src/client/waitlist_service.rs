use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{MatchError, Result};
use crate::models::{EligibleUser, SlotOccurrence, WaitlistEntry};

use super::CircleMatch;

impl CircleMatch {
    pub fn register_user(&self, user: &EligibleUser, now: DateTime<Utc>) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let result = (|| -> Result<()> {
            if user.id.trim().is_empty() {
                return Err(MatchError::Validation("user id must not be empty".to_string()));
            }
            self.state.upsert_user(user, now)
        })();

        let target = Some(user.id.clone());
        match &result {
            Ok(()) => self.log_request_status(
                request_id,
                "user.register",
                "ok",
                started,
                target,
                Some(serde_json::json!({
                    "has_birth_date": user.birth_date.is_some(),
                    "has_gender": user.gender.is_some(),
                    "interests": user.interests.len(),
                })),
            ),
            Err(err) => {
                self.log_request_error(request_id, "user.register", started, target, err, None);
            }
        }
        result
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<EligibleUser>> {
        self.state.get_user(user_id)
    }

    /// Returns `false` when the user was already waitlisted.
    pub fn join_waitlist(
        &self,
        date: NaiveDate,
        label: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let result = (|| -> Result<bool> {
            let occurrence = self.open_occurrence(date, label, now)?;
            self.state.join_waitlist(&occurrence, user_id, now)
        })();

        self.log_waitlist_change(request_id, "waitlist.join", started, date, label, user_id, &result);
        result
    }

    /// Returns `false` when the user was not on the waitlist.
    pub fn leave_waitlist(
        &self,
        date: NaiveDate,
        label: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let result = (|| -> Result<bool> {
            let occurrence = self.open_occurrence(date, label, now)?;
            self.state.leave_waitlist(&occurrence, user_id)
        })();

        self.log_waitlist_change(request_id, "waitlist.leave", started, date, label, user_id, &result);
        result
    }

    pub fn list_waitlist(&self, date: NaiveDate, label: &str) -> Result<Vec<WaitlistEntry>> {
        let occurrence = self.calendar.occurrence(date, label)?;
        self.state.list_waitlist(&occurrence)
    }

    fn open_occurrence(
        &self,
        date: NaiveDate,
        label: &str,
        now: DateTime<Utc>,
    ) -> Result<SlotOccurrence> {
        let occurrence = self.calendar.occurrence(date, label)?;
        if !self.calendar.is_accepting_entries(&occurrence, now) {
            return Err(MatchError::Conflict(format!(
                "waitlist for {occurrence} closed at {}",
                self.calendar.deadline_of(&occurrence).to_rfc3339()
            )));
        }
        Ok(occurrence)
    }

    #[allow(clippy::too_many_arguments)]
    fn log_waitlist_change(
        &self,
        request_id: String,
        operation: &str,
        started: Instant,
        date: NaiveDate,
        label: &str,
        user_id: &str,
        result: &Result<bool>,
    ) {
        let target = Some(format!("{date}:{}", label.trim()));
        match result {
            Ok(changed) => self.log_request_status(
                request_id,
                operation,
                "ok",
                started,
                target,
                Some(serde_json::json!({
                    "user_id": user_id,
                    "changed": changed,
                })),
            ),
            Err(err) => self.log_request_error(
                request_id,
                operation,
                started,
                target,
                err,
                Some(serde_json::json!({ "user_id": user_id })),
            ),
        }
    }
}
