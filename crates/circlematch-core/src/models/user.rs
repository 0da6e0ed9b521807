use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::NonBinary => "non_binary",
            Self::Other => "other",
        }
    }

    /// Blank input is treated as "not provided"; anything unrecognised is `Other`.
    #[must_use]
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
        raw.parse().ok()
    }
}

impl Display for Gender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "male" | "man" | "m" => Self::Male,
            "female" | "woman" | "f" => Self::Female,
            "non_binary" | "non-binary" | "nonbinary" => Self::NonBinary,
            _ => Self::Other,
        })
    }
}

/// A user who opted into a slot occurrence, as handed over by the waitlist provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleUser {
    pub id: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl EligibleUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            birth_date: None,
            gender: None,
            interests: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    #[must_use]
    pub const fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    #[must_use]
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    /// Whole years completed on `as_of`. `None` without a birth date or when the
    /// birth date lies after `as_of`.
    #[must_use]
    pub fn age_on(&self, as_of: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if birth > as_of {
            return None;
        }
        let mut years = as_of.year() - birth.year();
        if (as_of.month(), as_of.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    /// Distinct tags in common, compared case-insensitively.
    pub(crate) fn shared_interest_count(&self, other: &Self) -> usize {
        let theirs = other.normalized_interests();
        self.normalized_interests().intersection(&theirs).count()
    }

    fn normalized_interests(&self) -> BTreeSet<String> {
        self.interests
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub occurrence_key: String,
    pub user_id: String,
    pub joined_at: String,
}
