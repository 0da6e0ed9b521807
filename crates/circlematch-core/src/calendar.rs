//! Slot calendar: turns the static slot configuration plus an injected instant into
//! concrete slot occurrences, deadlines and lifecycle phases.
//!
//! Local civil time is `now` shifted by the configured fixed UTC offset. Nothing in
//! here reads the system clock.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::config::CalendarConfig;
use crate::error::{MatchError, Result};
use crate::models::{OccurrencePhase, SlotOccurrence, SlotOfDay, SlotView};

#[derive(Debug, Clone)]
pub struct SlotCalendar {
    config: CalendarConfig,
}

impl SlotCalendar {
    pub fn new(config: CalendarConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn slots(&self) -> &[SlotOfDay] {
        &self.config.slots
    }

    fn to_local(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + Duration::minutes(i64::from(self.config.utc_offset_minutes))
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let naive = local - Duration::minutes(i64::from(self.config.utc_offset_minutes));
        DateTime::from_naive_utc_and_offset(naive, Utc)
    }

    #[must_use]
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.to_local(now).date()
    }

    /// The date whose slots are shown at `now`: today, or tomorrow once the local
    /// clock has reached the rollover hour.
    #[must_use]
    pub fn current_slot_day(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = self.to_local(now);
        if local.hour() >= self.config.rollover_hour {
            local.date() + Duration::days(1)
        } else {
            local.date()
        }
    }

    pub fn occurrence(&self, date: NaiveDate, label: &str) -> Result<SlotOccurrence> {
        let wanted = label.trim();
        self.config
            .slots
            .iter()
            .find(|slot| slot.label.eq_ignore_ascii_case(wanted))
            .map(|slot| SlotOccurrence::new(date, slot.clone()))
            .ok_or_else(|| MatchError::NotFound(format!("slot {wanted}")))
    }

    #[must_use]
    pub fn occurrences_on(&self, date: NaiveDate) -> Vec<SlotOccurrence> {
        self.config
            .slots
            .iter()
            .map(|slot| SlotOccurrence::new(date, slot.clone()))
            .collect()
    }

    #[must_use]
    pub fn upcoming_occurrences(&self, now: DateTime<Utc>) -> Vec<SlotOccurrence> {
        self.occurrences_on(self.current_slot_day(now))
    }

    #[must_use]
    pub fn start_of(&self, occurrence: &SlotOccurrence) -> DateTime<Utc> {
        self.to_utc(occurrence.date.and_time(occurrence.slot.start))
    }

    #[must_use]
    pub fn deadline_of(&self, occurrence: &SlotOccurrence) -> DateTime<Utc> {
        self.start_of(occurrence)
            - Duration::minutes(i64::from(occurrence.slot.deadline_lead_minutes))
    }

    /// Occurrences of today (local date) whose deadline falls in the same whole
    /// minute as `now`. Repeated ticks inside that minute report the same slots.
    #[must_use]
    pub fn slots_ready_for_matching(&self, now: DateTime<Utc>) -> Vec<SlotOccurrence> {
        self.occurrences_on(self.local_date(now))
            .into_iter()
            .filter(|occurrence| {
                let deadline = self.deadline_of(occurrence);
                deadline <= now && now < deadline + Duration::minutes(1)
            })
            .collect()
    }

    #[must_use]
    pub fn is_accepting_entries(&self, occurrence: &SlotOccurrence, now: DateTime<Utc>) -> bool {
        now < self.deadline_of(occurrence)
    }

    #[must_use]
    pub fn phase(
        &self,
        occurrence: &SlotOccurrence,
        now: DateTime<Utc>,
        matched: bool,
    ) -> OccurrencePhase {
        let start = self.start_of(occurrence);
        let end = start + Duration::minutes(i64::from(self.config.event_duration_minutes));
        if now < self.deadline_of(occurrence) {
            OccurrencePhase::Open
        } else if now < start {
            if matched {
                OccurrencePhase::Matched
            } else {
                OccurrencePhase::DeadlineReached
            }
        } else if now < end {
            OccurrencePhase::EventWindow
        } else {
            OccurrencePhase::Closed
        }
    }

    #[must_use]
    pub fn view(&self, occurrence: &SlotOccurrence, now: DateTime<Utc>, matched: bool) -> SlotView {
        let deadline = self.deadline_of(occurrence);
        SlotView {
            occurrence_key: occurrence.key(),
            slot_label: occurrence.slot.label.clone(),
            date: occurrence.date,
            starts_at: self.start_of(occurrence).to_rfc3339(),
            deadline_at: deadline.to_rfc3339(),
            phase: self.phase(occurrence, now, matched),
            ready_for_matching: deadline <= now && now < deadline + Duration::minutes(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn calendar(offset_minutes: i32) -> SlotCalendar {
        SlotCalendar::new(CalendarConfig {
            utc_offset_minutes: offset_minutes,
            ..CalendarConfig::default()
        })
        .expect("calendar")
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().expect("instant")
    }

    fn labels(occurrences: &[SlotOccurrence]) -> Vec<&str> {
        occurrences.iter().map(SlotOccurrence::label).collect()
    }

    #[test]
    fn slot_is_ready_only_within_its_deadline_minute() {
        let cal = calendar(0);
        assert_eq!(labels(&cal.slots_ready_for_matching(utc(2025, 5, 1, 10, 0, 0))), vec!["11AM"]);
        assert_eq!(labels(&cal.slots_ready_for_matching(utc(2025, 5, 1, 10, 0, 59))), vec!["11AM"]);
        assert!(cal.slots_ready_for_matching(utc(2025, 5, 1, 9, 59, 59)).is_empty());
        assert!(cal.slots_ready_for_matching(utc(2025, 5, 1, 10, 1, 0)).is_empty());
        assert_eq!(labels(&cal.slots_ready_for_matching(utc(2025, 5, 1, 16, 0, 30))), vec!["5PM"]);
    }

    #[test]
    fn ready_occurrence_uses_local_date() {
        // UTC-7: the 2PM deadline (13:00 local) is 20:00 UTC on the same date.
        let cal = calendar(-420);
        let ready = cal.slots_ready_for_matching(utc(2025, 5, 1, 20, 0, 10));
        assert_eq!(labels(&ready), vec!["2PM"]);
        assert_eq!(ready[0].key(), "2025-05-01:2PM");
    }

    #[test]
    fn slot_day_rolls_over_at_configured_hour() {
        let cal = calendar(0);
        let may_first = NaiveDate::from_ymd_opt(2025, 5, 1).expect("date");
        assert_eq!(cal.current_slot_day(utc(2025, 5, 1, 19, 59, 59)), may_first);
        assert_eq!(
            cal.current_slot_day(utc(2025, 5, 1, 20, 0, 0)),
            may_first + Duration::days(1)
        );
        let upcoming = cal.upcoming_occurrences(utc(2025, 5, 1, 22, 0, 0));
        assert_eq!(upcoming.len(), 3);
        assert!(upcoming.iter().all(|occ| occ.date == may_first + Duration::days(1)));
    }

    #[test]
    fn rollover_respects_utc_offset() {
        // 03:30 UTC is 20:30 local at UTC-7 on the previous calendar day.
        let cal = calendar(-420);
        assert_eq!(
            cal.current_slot_day(utc(2025, 5, 2, 3, 30, 0)),
            NaiveDate::from_ymd_opt(2025, 5, 2).expect("date")
        );
        assert_eq!(
            cal.local_date(utc(2025, 5, 2, 3, 30, 0)),
            NaiveDate::from_ymd_opt(2025, 5, 1).expect("date")
        );
    }

    #[test]
    fn phases_follow_the_occurrence_lifecycle() {
        let cal = calendar(0);
        let occ = cal
            .occurrence(NaiveDate::from_ymd_opt(2025, 5, 1).expect("date"), "11am")
            .expect("occurrence");
        assert_eq!(cal.phase(&occ, utc(2025, 5, 1, 9, 0, 0), false), OccurrencePhase::Open);
        assert_eq!(
            cal.phase(&occ, utc(2025, 5, 1, 10, 30, 0), false),
            OccurrencePhase::DeadlineReached
        );
        assert_eq!(cal.phase(&occ, utc(2025, 5, 1, 10, 30, 0), true), OccurrencePhase::Matched);
        assert_eq!(
            cal.phase(&occ, utc(2025, 5, 1, 11, 30, 0), true),
            OccurrencePhase::EventWindow
        );
        assert_eq!(cal.phase(&occ, utc(2025, 5, 1, 12, 0, 0), true), OccurrencePhase::Closed);
        assert!(cal.is_accepting_entries(&occ, utc(2025, 5, 1, 9, 59, 59)));
        assert!(!cal.is_accepting_entries(&occ, utc(2025, 5, 1, 10, 0, 0)));
    }

    #[test]
    fn unknown_slot_label_is_not_found() {
        let cal = calendar(0);
        let err = cal
            .occurrence(NaiveDate::from_ymd_opt(2025, 5, 1).expect("date"), "9AM")
            .expect_err("must fail");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn invalid_configuration_is_fatal() {
        let err = SlotCalendar::new(CalendarConfig {
            slots: Vec::new(),
            ..CalendarConfig::default()
        })
        .expect_err("must fail");
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
