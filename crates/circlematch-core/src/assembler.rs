use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{LocationPolicy, ResourceConfig};
use crate::models::{Circle, EligibleUser, NewCircle, SlotOccurrence};
use crate::store::CircleStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub sequence: u32,
    pub member_ids: Vec<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyOutcome {
    pub circles: Vec<Circle>,
    pub failures: Vec<GroupFailure>,
}

impl AssemblyOutcome {
    #[must_use]
    pub fn circle_ids(&self) -> Vec<String> {
        self.circles.iter().map(|circle| circle.id.clone()).collect()
    }

    #[must_use]
    pub fn matched_users(&self) -> usize {
        self.circles.iter().map(|circle| circle.member_ids.len()).sum()
    }

    #[must_use]
    pub fn failed_users(&self) -> usize {
        self.failures.iter().map(|failure| failure.member_ids.len()).sum()
    }

    /// First failure message, if any group could not be written.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.failures.first().map(|failure| failure.error.as_str())
    }
}

/// Turns partitioned groups into persisted circles with a location and prompt each.
#[derive(Debug, Clone)]
pub struct CircleAssembler {
    resources: ResourceConfig,
}

impl CircleAssembler {
    #[must_use]
    pub const fn new(resources: ResourceConfig) -> Self {
        Self { resources }
    }

    #[must_use]
    pub fn circle_id(occurrence: &SlotOccurrence, sequence: u32) -> String {
        format!(
            "{}-{}-{sequence:03}",
            occurrence.compact_date(),
            occurrence.label()
        )
    }

    /// Writes one circle per group, numbering them from `first_sequence`. A failed
    /// write only loses that group; the rest are still attempted.
    pub fn assemble(
        &self,
        store: &dyn CircleStore,
        occurrence: &SlotOccurrence,
        groups: Vec<Vec<EligibleUser>>,
        first_sequence: u32,
        created_at: DateTime<Utc>,
    ) -> AssemblyOutcome {
        let created_at = created_at.to_rfc3339();
        let prompt_offset = pool_offset(&occurrence.key(), self.resources.prompts.len());
        let mut outcome = AssemblyOutcome::default();

        for (sequence, group) in (first_sequence..).zip(groups) {
            let member_ids = group.into_iter().map(|user| user.id).collect::<Vec<_>>();
            let circle = NewCircle {
                id: Self::circle_id(occurrence, sequence),
                sequence,
                occurrence: occurrence.clone(),
                location: self.location_for(sequence),
                prompt: self.prompt_for(prompt_offset, sequence),
                created_at: created_at.clone(),
                member_ids,
            };
            match store.create_circle(&circle) {
                Ok(_) => outcome.circles.push(Circle::from(&circle)),
                Err(err) => outcome.failures.push(GroupFailure {
                    sequence,
                    member_ids: circle.member_ids,
                    error: err.to_string(),
                }),
            }
        }
        outcome
    }

    fn location_for(&self, sequence: u32) -> String {
        let index = match self.resources.location_policy {
            LocationPolicy::Primary => 0,
            LocationPolicy::RoundRobin => rotate(0, sequence, self.resources.locations.len()),
        };
        self.resources
            .locations
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    fn prompt_for(&self, offset: usize, sequence: u32) -> String {
        let index = rotate(offset, sequence, self.resources.prompts.len());
        self.resources
            .prompts
            .get(index)
            .cloned()
            .unwrap_or_default()
    }
}

/// Stable starting index into a pool of `len` entries, derived from the occurrence key.
fn pool_offset(occurrence_key: &str, len: usize) -> usize {
    let Ok(len_u64) = u64::try_from(len) else {
        return 0;
    };
    if len_u64 == 0 {
        return 0;
    }
    let hash = blake3::hash(occurrence_key.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    usize::try_from(u64::from_le_bytes(head) % len_u64).unwrap_or(0)
}

fn rotate(offset: usize, sequence: u32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let step = usize::try_from(sequence.saturating_sub(1)).unwrap_or(0);
    (offset % len + step % len) % len
}
