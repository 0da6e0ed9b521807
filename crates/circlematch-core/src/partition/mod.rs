//! Group partitioning: bucket users, size each bucket, arrange it, then slice it
//! into groups. Each stage is a pluggable strategy selected by configuration.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::models::EligibleUser;

mod bucketing;
mod ordering;
mod sizing;

pub use bucketing::{
    AgeGenderBucketing, BucketingStrategy, SINGLE_BUCKET, SingleBucket, UNKNOWN_BUCKET,
};
pub use ordering::{
    InterestBalancedOrdering, OrderingStrategy, ShuffledOrdering, StableOrdering,
};
pub use sizing::{
    BalancedSizing, MAX_GROUP_SIZE, MIN_GROUP_SIZE, QueueDrainSizing, SizingStrategy,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub groups: Vec<Vec<EligibleUser>>,
    pub leftover: Vec<EligibleUser>,
}

impl Partition {
    #[must_use]
    pub fn group_sizes(&self) -> Vec<usize> {
        self.groups.iter().map(Vec::len).collect()
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.matched_count() + self.leftover.len()
    }
}

pub struct GroupPartitioner {
    sizing: Box<dyn SizingStrategy>,
    bucketing: Box<dyn BucketingStrategy>,
    ordering: Box<dyn OrderingStrategy>,
}

impl std::fmt::Debug for GroupPartitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupPartitioner")
            .field("sizing", &self.sizing.name())
            .field("bucketing", &self.bucketing.name())
            .field("ordering", &self.ordering.name())
            .finish()
    }
}

impl Default for GroupPartitioner {
    fn default() -> Self {
        Self::new(BalancedSizing, SingleBucket, StableOrdering)
    }
}

impl GroupPartitioner {
    pub fn new(
        sizing: impl SizingStrategy + 'static,
        bucketing: impl BucketingStrategy + 'static,
        ordering: impl OrderingStrategy + 'static,
    ) -> Self {
        Self {
            sizing: Box::new(sizing),
            bucketing: Box::new(bucketing),
            ordering: Box::new(ordering),
        }
    }

    #[must_use]
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            sizing: sizing::sizing_for(config.sizing),
            bucketing: bucketing::bucketing_for(config.bucketing, config.young_max_age),
            ordering: ordering::ordering_for(config.ordering),
        }
    }

    /// Splits `users` into groups. `as_of` is the date ages are measured on and
    /// `seed` keys any pseudo-random ordering, so equal inputs give equal output.
    #[must_use]
    pub fn partition(&self, users: Vec<EligibleUser>, as_of: NaiveDate, seed: &str) -> Partition {
        let mut partition = Partition::default();

        for (_key, bucket) in self.bucketize(dedupe_by_id(users), as_of) {
            let sizes = self.sizing.group_sizes(bucket.len());
            let mut arranged = self.ordering.arrange(bucket, &sizes, seed).into_iter();
            for size in sizes {
                let group = arranged.by_ref().take(size).collect::<Vec<_>>();
                if group.len() == size {
                    partition.groups.push(group);
                } else {
                    partition.leftover.extend(group);
                }
            }
            partition.leftover.extend(arranged);
        }

        partition
    }

    /// Buckets in order of first appearance; members keep input order.
    fn bucketize(
        &self,
        users: Vec<EligibleUser>,
        as_of: NaiveDate,
    ) -> Vec<(String, Vec<EligibleUser>)> {
        let mut buckets: Vec<(String, Vec<EligibleUser>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for user in users {
            let key = self.bucketing.bucket_key(&user, as_of);
            let position = *positions.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, Vec::new()));
                buckets.len() - 1
            });
            buckets[position].1.push(user);
        }
        buckets
    }
}

fn dedupe_by_id(users: Vec<EligibleUser>) -> Vec<EligibleUser> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .filter(|user| seen.insert(user.id.clone()))
        .collect()
}
