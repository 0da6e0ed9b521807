use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotOfDay {
    pub label: String,
    #[serde(with = "hh_mm")]
    pub start: NaiveTime,
    pub deadline_lead_minutes: u32,
}

impl SlotOfDay {
    pub fn new(label: impl Into<String>, start: NaiveTime, deadline_lead_minutes: u32) -> Self {
        Self {
            label: label.into(),
            start,
            deadline_lead_minutes,
        }
    }
}

/// One concrete, date-bound instance of a slot-of-day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotOccurrence {
    pub date: NaiveDate,
    pub slot: SlotOfDay,
}

impl SlotOccurrence {
    pub const fn new(date: NaiveDate, slot: SlotOfDay) -> Self {
        Self { date, slot }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.slot.label
    }

    /// `YYYY-MM-DD:LABEL`, the identity used by the waitlist, circles and run ledger.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.date.format("%Y-%m-%d"), self.slot.label)
    }

    #[must_use]
    pub fn compact_date(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

impl Display for SlotOccurrence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrencePhase {
    Open,
    DeadlineReached,
    Matched,
    EventWindow,
    Closed,
}

impl OccurrencePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::DeadlineReached => "deadline_reached",
            Self::Matched => "matched",
            Self::EventWindow => "event_window",
            Self::Closed => "closed",
        }
    }
}

impl Display for OccurrencePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub occurrence_key: String,
    pub slot_label: String,
    pub date: NaiveDate,
    pub starts_at: String,
    pub deadline_at: String,
    pub phase: OccurrencePhase,
    pub ready_for_matching: bool,
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub(super) fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrence_key_joins_date_and_label() {
        let slot = SlotOfDay::new(
            "11AM",
            NaiveTime::from_hms_opt(11, 0, 0).expect("time"),
            60,
        );
        let occurrence =
            SlotOccurrence::new(NaiveDate::from_ymd_opt(2025, 3, 9).expect("date"), slot);
        assert_eq!(occurrence.key(), "2025-03-09:11AM");
        assert_eq!(occurrence.compact_date(), "20250309");
    }

    #[test]
    fn slot_start_serializes_as_hour_minute() {
        let slot = SlotOfDay::new("2PM", NaiveTime::from_hms_opt(14, 0, 0).expect("time"), 60);
        let value = serde_json::to_value(&slot).expect("serialize");
        assert_eq!(value["start"], "14:00");
        let back: SlotOfDay = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, slot);
    }
}
