use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SlotOccurrence;

/// Write request for one circle; the store persists it together with its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCircle {
    pub id: String,
    /// 1-based running index within the occurrence.
    pub sequence: u32,
    pub occurrence: SlotOccurrence,
    pub location: String,
    pub prompt: String,
    pub created_at: String,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub id: String,
    pub sequence: u32,
    pub occurrence_key: String,
    pub date: NaiveDate,
    pub slot_label: String,
    pub location: String,
    pub prompt: String,
    pub created_at: String,
    pub member_ids: Vec<String>,
}

impl From<&NewCircle> for Circle {
    fn from(value: &NewCircle) -> Self {
        Self {
            id: value.id.clone(),
            sequence: value.sequence,
            occurrence_key: value.occurrence.key(),
            date: value.occurrence.date,
            slot_label: value.occurrence.slot.label.clone(),
            location: value.location.clone(),
            prompt: value.prompt.clone(),
            created_at: value.created_at.clone(),
            member_ids: value.member_ids.clone(),
        }
    }
}
