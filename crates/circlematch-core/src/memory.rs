//! Process-local store for tests and dry runs. Enforces the same atomicity and
//! one-circle-per-user rules as the SQLite store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{MatchError, Result};
use crate::models::{
    Circle, ClaimOutcome, EligibleUser, MatchingStatus, MatchingStatusRecord, NewCircle,
    SlotOccurrence,
};
use crate::store::{CircleStore, WaitlistProvider};

#[derive(Debug, Default)]
struct MemoryState {
    waitlists: HashMap<String, Vec<EligibleUser>>,
    circles: Vec<Circle>,
    runs: HashMap<String, MatchingStatusRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MatchError::mutex_poisoned("memory store"))?;
        f(&mut state)
    }

    /// Replaces the waitlist snapshot for `occurrence`.
    pub fn set_waitlist(&self, occurrence: &SlotOccurrence, users: Vec<EligibleUser>) -> Result<()> {
        self.with_state(|state| {
            state.waitlists.insert(occurrence.key(), users);
            Ok(())
        })
    }

    pub fn all_circles(&self) -> Result<Vec<Circle>> {
        self.with_state(|state| Ok(state.circles.clone()))
    }
}

impl WaitlistProvider for InMemoryStore {
    fn eligible_users(&self, occurrence: &SlotOccurrence) -> Result<Vec<EligibleUser>> {
        self.with_state(|state| {
            Ok(state
                .waitlists
                .get(&occurrence.key())
                .cloned()
                .unwrap_or_default())
        })
    }
}

impl CircleStore for InMemoryStore {
    fn claim_occurrence(
        &self,
        occurrence: &SlotOccurrence,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let key = occurrence.key();
        self.with_state(|state| match state.runs.get_mut(&key) {
            None => {
                state.runs.insert(
                    key.clone(),
                    MatchingStatusRecord {
                        occurrence_key: key,
                        status: MatchingStatus::InProgress,
                        attempts: 1,
                        started_at: now.to_rfc3339(),
                        finished_at: None,
                        error: None,
                    },
                );
                Ok(ClaimOutcome::Claimed { resumed: false })
            }
            Some(record) => match record.status {
                MatchingStatus::Done => Ok(ClaimOutcome::AlreadyMatched),
                MatchingStatus::InProgress => Ok(ClaimOutcome::InProgress),
                MatchingStatus::Failed => {
                    record.status = MatchingStatus::InProgress;
                    record.attempts = record.attempts.saturating_add(1);
                    record.started_at = now.to_rfc3339();
                    record.finished_at = None;
                    record.error = None;
                    Ok(ClaimOutcome::Claimed { resumed: true })
                }
            },
        })
    }

    fn complete_occurrence(&self, occurrence_key: &str, now: DateTime<Utc>) -> Result<()> {
        self.with_state(|state| {
            let record = in_progress_run(state, occurrence_key)?;
            record.status = MatchingStatus::Done;
            record.finished_at = Some(now.to_rfc3339());
            record.error = None;
            Ok(())
        })
    }

    fn fail_occurrence(
        &self,
        occurrence_key: &str,
        now: DateTime<Utc>,
        error: &str,
    ) -> Result<()> {
        self.with_state(|state| {
            let record = in_progress_run(state, occurrence_key)?;
            record.status = MatchingStatus::Failed;
            record.finished_at = Some(now.to_rfc3339());
            record.error = Some(error.to_string());
            Ok(())
        })
    }

    fn matching_status(&self, occurrence_key: &str) -> Result<Option<MatchingStatusRecord>> {
        self.with_state(|state| Ok(state.runs.get(occurrence_key).cloned()))
    }

    fn create_circle(&self, circle: &NewCircle) -> Result<String> {
        if circle.member_ids.is_empty() {
            return Err(MatchError::Validation(format!(
                "circle {} has no members",
                circle.id
            )));
        }
        let record = Circle::from(circle);
        self.with_state(|state| {
            if state.circles.iter().any(|existing| {
                existing.id == record.id
                    || (existing.occurrence_key == record.occurrence_key
                        && existing.sequence == record.sequence)
            }) {
                return Err(MatchError::Conflict(format!(
                    "circle {} already exists",
                    record.id
                )));
            }

            let mut seen = HashSet::new();
            for user_id in &record.member_ids {
                let taken = state.circles.iter().any(|existing| {
                    existing.occurrence_key == record.occurrence_key
                        && existing.member_ids.contains(user_id)
                });
                if taken || !seen.insert(user_id.as_str()) {
                    return Err(MatchError::Conflict(format!(
                        "user {user_id} already assigned for {}",
                        record.occurrence_key
                    )));
                }
            }

            let id = record.id.clone();
            state.circles.push(record);
            Ok(id)
        })
    }

    fn assigned_user_ids(&self, occurrence_key: &str) -> Result<HashSet<String>> {
        self.with_state(|state| {
            Ok(state
                .circles
                .iter()
                .filter(|circle| circle.occurrence_key == occurrence_key)
                .flat_map(|circle| circle.member_ids.iter().cloned())
                .collect())
        })
    }

    fn circle_count(&self, occurrence_key: &str) -> Result<usize> {
        self.with_state(|state| {
            Ok(state
                .circles
                .iter()
                .filter(|circle| circle.occurrence_key == occurrence_key)
                .count())
        })
    }

    fn next_circle_sequence(&self, occurrence_key: &str) -> Result<u32> {
        self.with_state(|state| {
            let max = state
                .circles
                .iter()
                .filter(|circle| circle.occurrence_key == occurrence_key)
                .map(|circle| circle.sequence)
                .max()
                .unwrap_or(0);
            Ok(max.saturating_add(1))
        })
    }

    fn list_circles(&self, occurrence_key: &str) -> Result<Vec<Circle>> {
        self.with_state(|state| {
            let mut out = state
                .circles
                .iter()
                .filter(|circle| circle.occurrence_key == occurrence_key)
                .cloned()
                .collect::<Vec<_>>();
            out.sort_by_key(|circle| circle.sequence);
            Ok(out)
        })
    }

    fn circle_for_user(&self, occurrence_key: &str, user_id: &str) -> Result<Option<Circle>> {
        self.with_state(|state| {
            Ok(state
                .circles
                .iter()
                .find(|circle| {
                    circle.occurrence_key == occurrence_key
                        && circle.member_ids.iter().any(|member| member == user_id)
                })
                .cloned())
        })
    }
}

fn in_progress_run<'a>(
    state: &'a mut MemoryState,
    occurrence_key: &str,
) -> Result<&'a mut MatchingStatusRecord> {
    match state.runs.get_mut(occurrence_key) {
        Some(record) if record.status == MatchingStatus::InProgress => Ok(record),
        _ => Err(MatchError::Conflict(format!(
            "matching run {occurrence_key} is not in progress"
        ))),
    }
}
