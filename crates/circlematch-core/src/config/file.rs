use serde::Deserialize;

/// On-disk shape of `circlematch.toml`. Every field is optional; missing values
/// keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileConfig {
    pub(super) utc_offset_minutes: Option<i32>,
    pub(super) rollover_hour: Option<u32>,
    pub(super) event_duration_minutes: Option<u32>,
    pub(super) slots: Option<Vec<FileSlot>>,
    pub(super) matching: Option<FileMatching>,
    pub(super) resources: Option<FileResources>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileSlot {
    pub(super) label: String,
    pub(super) start: String,
    pub(super) deadline_lead_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileMatching {
    pub(super) sizing: Option<String>,
    pub(super) bucketing: Option<String>,
    pub(super) ordering: Option<String>,
    pub(super) young_max_age: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileResources {
    pub(super) location_policy: Option<String>,
    pub(super) locations: Option<Vec<String>>,
    pub(super) prompts: Option<Vec<String>>,
}
