use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SlotOccurrence;

/// Persisted progress of matching for one slot occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStatus {
    InProgress,
    Done,
    Failed,
}

impl MatchingStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl Display for MatchingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchingStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown matching status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingStatusRecord {
    pub occurrence_key: String,
    pub status: MatchingStatus,
    pub attempts: u32,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now owns the occurrence. `resumed` is set when a failed run is retried.
    Claimed { resumed: bool },
    AlreadyMatched,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Matched,
    AlreadyMatched,
    InProgress,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingResult {
    pub slot_label: String,
    pub occurrence_date: NaiveDate,
    pub occurrence_key: String,
    pub status: ResultStatus,
    pub total_users: usize,
    pub circles_created: usize,
    pub users_matched: usize,
    pub unmatched_users: usize,
    pub circle_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchingResult {
    #[must_use]
    pub fn empty(occurrence: &SlotOccurrence, status: ResultStatus) -> Self {
        Self {
            slot_label: occurrence.slot.label.clone(),
            occurrence_date: occurrence.date,
            occurrence_key: occurrence.key(),
            status,
            total_users: 0,
            circles_created: 0,
            users_matched: 0,
            unmatched_users: 0,
            circle_ids: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(occurrence: &SlotOccurrence, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(occurrence, ResultStatus::Failed)
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Failed || self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingRunReport {
    pub ran_at: String,
    pub success: bool,
    pub results: Vec<MatchingResult>,
}

impl MatchingRunReport {
    #[must_use]
    pub fn from_results(ran_at: String, results: Vec<MatchingResult>) -> Self {
        let success = results.iter().all(|result| !result.is_error());
        Self {
            ran_at,
            success,
            results,
        }
    }
}
