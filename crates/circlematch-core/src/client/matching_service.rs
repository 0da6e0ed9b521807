use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{MatchError, Result};
use crate::models::{
    Circle, MatchingResult, MatchingRunReport, MatchingStatus, MatchingStatusRecord, SlotView,
};
use crate::store::CircleStore;

use super::CircleMatch;

impl CircleMatch {
    /// One deadline tick. Per-occurrence failures are carried inside the report.
    pub fn run_matching(&self, now: DateTime<Utc>) -> MatchingRunReport {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let report = self.orchestrator().run_once(now);

        let circles_created = report
            .results
            .iter()
            .map(|result| result.circles_created)
            .sum::<usize>();
        self.log_request_status(
            request_id,
            "match.run",
            if report.success { "ok" } else { "partial" },
            started,
            None,
            Some(serde_json::json!({
                "ran_at": report.ran_at,
                "occurrences": report
                    .results
                    .iter()
                    .map(|result| result.occurrence_key.as_str())
                    .collect::<Vec<_>>(),
                "circles_created": circles_created,
                "success": report.success,
            })),
        );
        report
    }

    /// Manual trigger for one occurrence. Refused while its waitlist is still open.
    pub fn run_occurrence(
        &self,
        date: NaiveDate,
        label: &str,
        now: DateTime<Utc>,
    ) -> Result<MatchingResult> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let result = (|| -> Result<MatchingResult> {
            let occurrence = self.calendar.occurrence(date, label)?;
            if self.calendar.is_accepting_entries(&occurrence, now) {
                return Err(MatchError::Conflict(format!(
                    "waitlist for {occurrence} is open until {}",
                    self.calendar.deadline_of(&occurrence).to_rfc3339()
                )));
            }
            Ok(self.orchestrator().run_occurrence(&occurrence, now))
        })();

        let target = Some(format!("{date}:{}", label.trim()));
        match &result {
            Ok(matching) => {
                self.log_request_status(
                    request_id,
                    "match.occurrence",
                    if matching.is_error() { "failed" } else { "ok" },
                    started,
                    target,
                    Some(serde_json::json!({
                        "status": matching.status,
                        "total_users": matching.total_users,
                        "circles_created": matching.circles_created,
                        "unmatched_users": matching.unmatched_users,
                    })),
                );
            }
            Err(err) => {
                self.log_request_error(request_id, "match.occurrence", started, target, err, None);
            }
        }

        result
    }

    pub fn matching_status(
        &self,
        date: NaiveDate,
        label: &str,
    ) -> Result<Option<MatchingStatusRecord>> {
        let occurrence = self.calendar.occurrence(date, label)?;
        self.state.matching_status(&occurrence.key())
    }

    pub fn list_circles(&self, date: NaiveDate, label: &str) -> Result<Vec<Circle>> {
        let occurrence = self.calendar.occurrence(date, label)?;
        self.state.list_circles(&occurrence.key())
    }

    pub fn circle_for_user(
        &self,
        date: NaiveDate,
        label: &str,
        user_id: &str,
    ) -> Result<Option<Circle>> {
        let occurrence = self.calendar.occurrence(date, label)?;
        self.state.circle_for_user(&occurrence.key(), user_id)
    }

    /// The slot day's occurrences with their lifecycle phase at `now`.
    pub fn slots(&self, now: DateTime<Utc>) -> Result<Vec<SlotView>> {
        self.calendar
            .upcoming_occurrences(now)
            .iter()
            .map(|occurrence| {
                let matched = self
                    .state
                    .matching_status(&occurrence.key())?
                    .is_some_and(|record| record.status == MatchingStatus::Done);
                Ok(self.calendar.view(occurrence, now, matched))
            })
            .collect()
    }
}
