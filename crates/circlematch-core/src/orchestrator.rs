//! Deadline tick entry point: Calendar → WaitlistProvider → GroupPartitioner →
//! CircleAssembler, once per ready slot occurrence.

use chrono::{DateTime, Utc};

use crate::assembler::CircleAssembler;
use crate::calendar::SlotCalendar;
use crate::error::Result;
use crate::models::{
    ClaimOutcome, MatchingResult, MatchingRunReport, ResultStatus, SlotOccurrence,
};
use crate::partition::GroupPartitioner;
use crate::store::{CircleStore, WaitlistProvider};

pub struct MatchingOrchestrator<'a> {
    calendar: &'a SlotCalendar,
    partitioner: &'a GroupPartitioner,
    assembler: &'a CircleAssembler,
    waitlist: &'a dyn WaitlistProvider,
    store: &'a dyn CircleStore,
}

impl std::fmt::Debug for MatchingOrchestrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingOrchestrator")
            .field("partitioner", &self.partitioner)
            .finish_non_exhaustive()
    }
}

impl<'a> MatchingOrchestrator<'a> {
    #[must_use]
    pub fn new(
        calendar: &'a SlotCalendar,
        partitioner: &'a GroupPartitioner,
        assembler: &'a CircleAssembler,
        waitlist: &'a dyn WaitlistProvider,
        store: &'a dyn CircleStore,
    ) -> Self {
        Self {
            calendar,
            partitioner,
            assembler,
            waitlist,
            store,
        }
    }

    /// Matches every occurrence whose deadline minute contains `now`. Occurrences are
    /// independent: one failing never stops the rest.
    #[must_use]
    pub fn run_once(&self, now: DateTime<Utc>) -> MatchingRunReport {
        let results = self
            .calendar
            .slots_ready_for_matching(now)
            .iter()
            .map(|occurrence| self.run_occurrence(occurrence, now))
            .collect();
        MatchingRunReport::from_results(now.to_rfc3339(), results)
    }

    #[must_use]
    pub fn run_occurrence(&self, occurrence: &SlotOccurrence, now: DateTime<Utc>) -> MatchingResult {
        match self.store.claim_occurrence(occurrence, now) {
            Ok(ClaimOutcome::Claimed { .. }) => {}
            Ok(ClaimOutcome::AlreadyMatched) => {
                return MatchingResult::empty(occurrence, ResultStatus::AlreadyMatched);
            }
            Ok(ClaimOutcome::InProgress) => {
                return MatchingResult::empty(occurrence, ResultStatus::InProgress);
            }
            Err(err) => return MatchingResult::failed(occurrence, err.to_string()),
        }

        match self.match_claimed(occurrence, now) {
            Ok(result) => result,
            Err(err) => {
                let message = self.record_failure(&occurrence.key(), now, err.to_string());
                MatchingResult::failed(occurrence, message)
            }
        }
    }

    /// Marks the run failed. A ledger write that also fails leaves the row
    /// `in_progress`, so its error joins the returned message.
    fn record_failure(&self, key: &str, now: DateTime<Utc>, message: String) -> String {
        match self.store.fail_occurrence(key, now, &message) {
            Ok(()) => message,
            Err(ledger_err) => format!(
                "{message}; run ledger not updated, {key} stays in_progress: {ledger_err}"
            ),
        }
    }

    fn match_claimed(
        &self,
        occurrence: &SlotOccurrence,
        now: DateTime<Utc>,
    ) -> Result<MatchingResult> {
        let key = occurrence.key();
        let assigned = self.store.assigned_user_ids(&key)?;
        let users = self
            .waitlist
            .eligible_users(occurrence)?
            .into_iter()
            .filter(|user| !assigned.contains(&user.id))
            .collect::<Vec<_>>();

        let partition = self.partitioner.partition(users, occurrence.date, &key);
        let total_users = partition.total();
        let leftover = partition.leftover.len();
        let first_sequence = self.store.next_circle_sequence(&key)?;
        let outcome =
            self.assembler
                .assemble(self.store, occurrence, partition.groups, first_sequence, now);

        let mut result = MatchingResult::empty(occurrence, ResultStatus::Matched);
        result.total_users = total_users;
        result.circles_created = outcome.circles.len();
        result.users_matched = outcome.matched_users();
        result.unmatched_users = leftover + outcome.failed_users();
        result.circle_ids = outcome.circle_ids();

        if let Some(error) = outcome.first_error() {
            let message = format!(
                "{} of {} circles failed: {error}",
                outcome.failures.len(),
                outcome.failures.len() + outcome.circles.len()
            );
            result.status = ResultStatus::Failed;
            result.error = Some(self.record_failure(&key, now, message));
        } else if let Err(ledger_err) = self.store.complete_occurrence(&key, now) {
            result.status = ResultStatus::Failed;
            result.error = Some(format!(
                "circles stored but run ledger not updated, {key} stays in_progress: {ledger_err}"
            ));
        }
        Ok(result)
    }
}
