use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// How many users go into each group of a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Fours first, rebalanced so no group of one is ever formed.
    #[default]
    Balanced,
    /// Plain 4, then 3, then 2 queue draining.
    QueueDrain,
}

/// How users are split into homogeneous buckets before sizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketingPolicy {
    #[default]
    None,
    AgeGender,
}

/// Order of users inside a bucket before it is sliced into groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    #[default]
    Stable,
    Shuffled,
    InterestBalanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Every circle of an occurrence meets at the first configured location.
    #[default]
    Primary,
    RoundRobin,
}

impl SizingPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::QueueDrain => "queue_drain",
        }
    }

    pub(super) fn parse(raw: &str) -> Result<Self> {
        match normalize(raw).as_str() {
            "balanced" => Ok(Self::Balanced),
            "queue_drain" => Ok(Self::QueueDrain),
            other => Err(invalid("sizing", other, "balanced|queue_drain")),
        }
    }
}

impl BucketingPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AgeGender => "age_gender",
        }
    }

    pub(super) fn parse(raw: &str) -> Result<Self> {
        match normalize(raw).as_str() {
            "none" | "off" => Ok(Self::None),
            "age_gender" => Ok(Self::AgeGender),
            other => Err(invalid("bucketing", other, "none|age_gender")),
        }
    }
}

impl OrderingPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Shuffled => "shuffled",
            Self::InterestBalanced => "interest_balanced",
        }
    }

    pub(super) fn parse(raw: &str) -> Result<Self> {
        match normalize(raw).as_str() {
            "stable" => Ok(Self::Stable),
            "shuffled" => Ok(Self::Shuffled),
            "interest_balanced" => Ok(Self::InterestBalanced),
            other => Err(invalid(
                "ordering",
                other,
                "stable|shuffled|interest_balanced",
            )),
        }
    }
}

impl LocationPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::RoundRobin => "round_robin",
        }
    }

    pub(super) fn parse(raw: &str) -> Result<Self> {
        match normalize(raw).as_str() {
            "primary" => Ok(Self::Primary),
            "round_robin" => Ok(Self::RoundRobin),
            other => Err(invalid("location_policy", other, "primary|round_robin")),
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

fn invalid(field: &str, value: &str, expected: &str) -> MatchError {
    MatchError::Config(format!("invalid {field}: {value} (expected {expected})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_accept_dashed_and_mixed_case_values() {
        assert_eq!(SizingPolicy::parse("Queue-Drain").expect("sizing"), SizingPolicy::QueueDrain);
        assert_eq!(
            BucketingPolicy::parse(" age_gender ").expect("bucketing"),
            BucketingPolicy::AgeGender
        );
        assert_eq!(
            OrderingPolicy::parse("interest-balanced").expect("ordering"),
            OrderingPolicy::InterestBalanced
        );
        assert_eq!(
            LocationPolicy::parse("ROUND_ROBIN").expect("location"),
            LocationPolicy::RoundRobin
        );
    }

    #[test]
    fn unknown_policy_is_a_config_error() {
        let err = SizingPolicy::parse("random").expect_err("must reject");
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("balanced|queue_drain"));
    }
}
