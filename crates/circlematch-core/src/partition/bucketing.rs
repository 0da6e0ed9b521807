use chrono::NaiveDate;

use crate::config::BucketingPolicy;
use crate::models::EligibleUser;

pub const UNKNOWN_BUCKET: &str = "unknown";
pub const SINGLE_BUCKET: &str = "all";

/// Assigns each user a bucket key. Users in different buckets are never grouped
/// together. Missing attributes map to a fallback key instead of an error.
pub trait BucketingStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn bucket_key(&self, user: &EligibleUser, as_of: NaiveDate) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleBucket;

impl BucketingStrategy for SingleBucket {
    fn name(&self) -> &'static str {
        "none"
    }

    fn bucket_key(&self, _user: &EligibleUser, _as_of: NaiveDate) -> String {
        SINGLE_BUCKET.to_string()
    }
}

/// `18-25:female`, `26+:male`, ... Users without a usable birth date or gender land
/// in `unknown`.
#[derive(Debug, Clone, Copy)]
pub struct AgeGenderBucketing {
    pub young_max_age: u32,
}

impl AgeGenderBucketing {
    #[must_use]
    pub const fn new(young_max_age: u32) -> Self {
        Self { young_max_age }
    }

    fn band(&self, age: u32) -> String {
        if age <= self.young_max_age {
            format!("18-{}", self.young_max_age)
        } else {
            format!("{}+", self.young_max_age + 1)
        }
    }
}

impl BucketingStrategy for AgeGenderBucketing {
    fn name(&self) -> &'static str {
        "age_gender"
    }

    fn bucket_key(&self, user: &EligibleUser, as_of: NaiveDate) -> String {
        match (user.age_on(as_of), user.gender) {
            (Some(age), Some(gender)) => format!("{}:{}", self.band(age), gender.as_str()),
            _ => UNKNOWN_BUCKET.to_string(),
        }
    }
}

pub(crate) fn bucketing_for(policy: BucketingPolicy, young_max_age: u32) -> Box<dyn BucketingStrategy> {
    match policy {
        BucketingPolicy::None => Box::new(SingleBucket),
        BucketingPolicy::AgeGender => Box::new(AgeGenderBucketing::new(young_max_age)),
    }
}
