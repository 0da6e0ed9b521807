use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveTime, Timelike};

use crate::error::{MatchError, Result};
use crate::models::SlotOfDay;

mod env;
mod file;
mod policy;

pub use policy::{BucketingPolicy, LocationPolicy, OrderingPolicy, SizingPolicy};

use self::env::{non_empty, parse_env_value, process_env};
use self::file::FileConfig;

pub const CONFIG_FILE_NAME: &str = "circlematch.toml";

const ENV_SIZING: &str = "CIRCLEMATCH_SIZING";
const ENV_BUCKETING: &str = "CIRCLEMATCH_BUCKETING";
const ENV_ORDERING: &str = "CIRCLEMATCH_ORDERING";
const ENV_LOCATION_POLICY: &str = "CIRCLEMATCH_LOCATION_POLICY";
const ENV_UTC_OFFSET_MINUTES: &str = "CIRCLEMATCH_UTC_OFFSET_MINUTES";
const ENV_ROLLOVER_HOUR: &str = "CIRCLEMATCH_ROLLOVER_HOUR";

const DEFAULT_DEADLINE_LEAD_MINUTES: u32 = 60;
const DEFAULT_ROLLOVER_HOUR: u32 = 20;
const DEFAULT_EVENT_DURATION_MINUTES: u32 = 60;
const DEFAULT_YOUNG_MAX_AGE: u32 = 25;
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

const DEFAULT_SLOTS: [(&str, u32); 3] = [("11AM", 11), ("2PM", 14), ("5PM", 17)];

const DEFAULT_LOCATIONS: [&str; 3] = [
    "Central Library Atrium",
    "Riverside Coffee House",
    "Park Pavilion",
];

const DEFAULT_PROMPTS: [&str; 6] = [
    "What is something you changed your mind about this year?",
    "Describe a small thing that made your week better.",
    "What skill would you learn if time were not a constraint?",
    "Which place would you show a visitor to your city first?",
    "What is a book, film or song you keep coming back to?",
    "What does a perfect free afternoon look like for you?",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    pub slots: Vec<SlotOfDay>,
    pub utc_offset_minutes: i32,
    pub rollover_hour: u32,
    pub event_duration_minutes: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS
                .iter()
                .filter_map(|(label, hour)| {
                    NaiveTime::from_hms_opt(*hour, 0, 0)
                        .map(|start| SlotOfDay::new(*label, start, DEFAULT_DEADLINE_LEAD_MINUTES))
                })
                .collect(),
            utc_offset_minutes: 0,
            rollover_hour: DEFAULT_ROLLOVER_HOUR,
            event_duration_minutes: DEFAULT_EVENT_DURATION_MINUTES,
        }
    }
}

impl CalendarConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(MatchError::Config("at least one slot is required".to_string()));
        }
        if !(1..=23).contains(&self.rollover_hour) {
            return Err(MatchError::Config(format!(
                "invalid rollover_hour: {} (expected 1..=23)",
                self.rollover_hour
            )));
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(MatchError::Config(format!(
                "invalid utc_offset_minutes: {} (expected within +/-{MAX_UTC_OFFSET_MINUTES})",
                self.utc_offset_minutes
            )));
        }
        if self.event_duration_minutes == 0 {
            return Err(MatchError::Config(
                "event_duration_minutes must be > 0".to_string(),
            ));
        }

        let mut labels = HashSet::new();
        for slot in &self.slots {
            let label = slot.label.trim();
            if label.is_empty() || label.contains(':') {
                return Err(MatchError::Config(format!(
                    "invalid slot label: '{}' (must be non-empty and contain no ':')",
                    slot.label
                )));
            }
            if !labels.insert(label.to_ascii_lowercase()) {
                return Err(MatchError::Config(format!("duplicate slot label: {label}")));
            }
            if slot.deadline_lead_minutes == 0 {
                return Err(MatchError::Config(format!(
                    "slot {label}: deadline_lead_minutes must be > 0"
                )));
            }
            let start_minutes = slot.start.hour() * 60 + slot.start.minute();
            if slot.deadline_lead_minutes > start_minutes {
                return Err(MatchError::Config(format!(
                    "slot {label}: deadline falls on the previous day"
                )));
            }
            if slot.start.hour() >= self.rollover_hour {
                return Err(MatchError::Config(format!(
                    "slot {label}: starts at or after rollover hour {}",
                    self.rollover_hour
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingConfig {
    pub sizing: SizingPolicy,
    pub bucketing: BucketingPolicy,
    pub ordering: OrderingPolicy,
    pub young_max_age: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            sizing: SizingPolicy::default(),
            bucketing: BucketingPolicy::default(),
            ordering: OrderingPolicy::default(),
            young_max_age: DEFAULT_YOUNG_MAX_AGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    pub location_policy: LocationPolicy,
    pub locations: Vec<String>,
    pub prompts: Vec<String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            location_policy: LocationPolicy::default(),
            locations: DEFAULT_LOCATIONS.iter().map(ToString::to_string).collect(),
            prompts: DEFAULT_PROMPTS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ResourceConfig {
    pub fn validate(&self) -> Result<()> {
        validate_pool("locations", &self.locations)?;
        validate_pool("prompts", &self.prompts)
    }
}

fn validate_pool(name: &str, pool: &[String]) -> Result<()> {
    if pool.is_empty() {
        return Err(MatchError::Config(format!("resources.{name} must not be empty")));
    }
    if pool.iter().any(|entry| entry.trim().is_empty()) {
        return Err(MatchError::Config(format!(
            "resources.{name} must not contain blank entries"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub calendar: CalendarConfig,
    pub matching: MatchingConfig,
    pub resources: ResourceConfig,
}

impl AppConfig {
    /// Defaults, then `circlematch.toml` under `root` when present, then environment.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load_file(&path)
        } else {
            Self::from_file_config(FileConfig::default())
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            MatchError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(raw).map_err(|err| MatchError::Config(err.to_string()))?;
        Self::from_file_config(file)
    }

    fn from_file_config(file: FileConfig) -> Result<Self> {
        let mut config = Self::default();
        config.apply_file(file)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.calendar.validate()?;
        self.resources.validate()?;
        if self.matching.young_max_age == 0 {
            return Err(MatchError::Config("young_max_age must be > 0".to_string()));
        }
        Ok(())
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(offset) = file.utc_offset_minutes {
            self.calendar.utc_offset_minutes = offset;
        }
        if let Some(hour) = file.rollover_hour {
            self.calendar.rollover_hour = hour;
        }
        if let Some(minutes) = file.event_duration_minutes {
            self.calendar.event_duration_minutes = minutes;
        }
        if let Some(slots) = file.slots {
            self.calendar.slots = slots
                .into_iter()
                .map(|slot| {
                    let start = NaiveTime::parse_from_str(slot.start.trim(), "%H:%M").map_err(
                        |err| {
                            MatchError::Config(format!(
                                "slot {}: invalid start '{}': {err}",
                                slot.label, slot.start
                            ))
                        },
                    )?;
                    Ok(SlotOfDay::new(
                        slot.label.trim(),
                        start,
                        slot.deadline_lead_minutes
                            .unwrap_or(DEFAULT_DEADLINE_LEAD_MINUTES),
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(matching) = file.matching {
            if let Some(raw) = matching.sizing.as_deref() {
                self.matching.sizing = SizingPolicy::parse(raw)?;
            }
            if let Some(raw) = matching.bucketing.as_deref() {
                self.matching.bucketing = BucketingPolicy::parse(raw)?;
            }
            if let Some(raw) = matching.ordering.as_deref() {
                self.matching.ordering = OrderingPolicy::parse(raw)?;
            }
            if let Some(age) = matching.young_max_age {
                self.matching.young_max_age = age;
            }
        }
        if let Some(resources) = file.resources {
            if let Some(raw) = resources.location_policy.as_deref() {
                self.resources.location_policy = LocationPolicy::parse(raw)?;
            }
            if let Some(locations) = resources.locations {
                self.resources.locations = trim_all(locations);
            }
            if let Some(prompts) = resources.prompts {
                self.resources.prompts = trim_all(prompts);
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(&process_env)
    }

    fn apply_env_from(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = non_empty(lookup(ENV_SIZING)) {
            self.matching.sizing = SizingPolicy::parse(&raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_BUCKETING)) {
            self.matching.bucketing = BucketingPolicy::parse(&raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_ORDERING)) {
            self.matching.ordering = OrderingPolicy::parse(&raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_LOCATION_POLICY)) {
            self.resources.location_policy = LocationPolicy::parse(&raw)?;
        }
        if let Some(offset) =
            parse_env_value::<i32>(ENV_UTC_OFFSET_MINUTES, lookup(ENV_UTC_OFFSET_MINUTES))?
        {
            self.calendar.utc_offset_minutes = offset;
        }
        if let Some(hour) = parse_env_value::<u32>(ENV_ROLLOVER_HOUR, lookup(ENV_ROLLOVER_HOUR))? {
            self.calendar.rollover_hour = hour;
        }
        Ok(())
    }
}

fn trim_all(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests;
