//! Seams between the matching core and its collaborators.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Circle, ClaimOutcome, EligibleUser, MatchingStatusRecord, NewCircle, SlotOccurrence,
};

/// Source of the frozen waitlist snapshot for one occurrence.
pub trait WaitlistProvider {
    fn eligible_users(&self, occurrence: &SlotOccurrence) -> Result<Vec<EligibleUser>>;
}

/// Persistence for circles and the per-occurrence matching ledger.
///
/// `create_circle` must be atomic: either the circle and every member row exist
/// afterwards, or none of them do. A user may belong to at most one circle per
/// occurrence; violating that is reported as a conflict.
pub trait CircleStore {
    /// Conditionally moves the occurrence into `in_progress`. A `done` occurrence is
    /// never reclaimed; a `failed` one is, so a later run can finish it.
    fn claim_occurrence(
        &self,
        occurrence: &SlotOccurrence,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome>;
    fn complete_occurrence(&self, occurrence_key: &str, now: DateTime<Utc>) -> Result<()>;
    fn fail_occurrence(&self, occurrence_key: &str, now: DateTime<Utc>, error: &str)
    -> Result<()>;
    fn matching_status(&self, occurrence_key: &str) -> Result<Option<MatchingStatusRecord>>;

    fn create_circle(&self, circle: &NewCircle) -> Result<String>;
    fn assigned_user_ids(&self, occurrence_key: &str) -> Result<HashSet<String>>;
    fn circle_count(&self, occurrence_key: &str) -> Result<usize>;
    /// One past the highest circle sequence stored for the occurrence (1 when none).
    fn next_circle_sequence(&self, occurrence_key: &str) -> Result<u32>;
    fn list_circles(&self, occurrence_key: &str) -> Result<Vec<Circle>>;
    fn circle_for_user(&self, occurrence_key: &str, user_id: &str) -> Result<Option<Circle>>;
}
