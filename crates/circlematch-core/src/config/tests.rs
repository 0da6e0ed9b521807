use tempfile::tempdir;

use super::*;

#[test]
fn defaults_describe_three_daily_slots() {
    let config = AppConfig::default();
    config.validate().expect("defaults must validate");

    let labels = config
        .calendar
        .slots
        .iter()
        .map(|slot| slot.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["11AM", "2PM", "5PM"]);
    assert!(
        config
            .calendar
            .slots
            .iter()
            .all(|slot| slot.deadline_lead_minutes == 60)
    );
    assert_eq!(config.calendar.rollover_hour, 20);
    assert_eq!(config.matching.sizing, SizingPolicy::Balanced);
    assert_eq!(config.matching.bucketing, BucketingPolicy::None);
}

#[test]
fn toml_overrides_slots_and_policies() {
    let config = AppConfig::from_toml_str(
        r#"
        utc_offset_minutes = -420
        rollover_hour = 21

        [[slots]]
        label = "9AM"
        start = "09:00"
        deadline_lead_minutes = 30

        [[slots]]
        label = "6PM"
        start = "18:00"

        [matching]
        sizing = "queue_drain"
        bucketing = "age_gender"
        ordering = "shuffled"
        young_max_age = 27

        [resources]
        location_policy = "round_robin"
        locations = [" Hall A ", "Hall B"]
        prompts = ["Say hi"]
        "#,
    )
    .expect("config");

    assert_eq!(config.calendar.utc_offset_minutes, -420);
    assert_eq!(config.calendar.rollover_hour, 21);
    assert_eq!(config.calendar.slots.len(), 2);
    assert_eq!(config.calendar.slots[0].deadline_lead_minutes, 30);
    assert_eq!(config.calendar.slots[1].deadline_lead_minutes, 60);
    assert_eq!(config.matching.sizing, SizingPolicy::QueueDrain);
    assert_eq!(config.matching.bucketing, BucketingPolicy::AgeGender);
    assert_eq!(config.matching.ordering, OrderingPolicy::Shuffled);
    assert_eq!(config.matching.young_max_age, 27);
    assert_eq!(config.resources.location_policy, LocationPolicy::RoundRobin);
    assert_eq!(config.resources.locations, vec!["Hall A", "Hall B"]);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = AppConfig::from_toml_str("cron = \"* * * * *\"").expect_err("must reject");
    assert_eq!(err.code(), "CONFIG_ERROR");
}

#[test]
fn malformed_slot_time_is_a_config_error() {
    let err = AppConfig::from_toml_str(
        r#"
        [[slots]]
        label = "noon"
        start = "12h"
        "#,
    )
    .expect_err("must reject");
    assert!(err.to_string().contains("slot noon"));
}

#[test]
fn duplicate_labels_are_rejected() {
    let err = AppConfig::from_toml_str(
        r#"
        [[slots]]
        label = "11AM"
        start = "11:00"

        [[slots]]
        label = "11am"
        start = "12:00"
        "#,
    )
    .expect_err("must reject");
    assert!(err.to_string().contains("duplicate slot label"));
}

#[test]
fn slot_after_rollover_is_rejected() {
    let err = AppConfig::from_toml_str(
        r#"
        rollover_hour = 20

        [[slots]]
        label = "9PM"
        start = "21:00"
        "#,
    )
    .expect_err("must reject");
    assert!(err.to_string().contains("rollover"));
}

#[test]
fn deadline_before_midnight_is_rejected() {
    let mut config = AppConfig::default();
    config.calendar.slots = vec![SlotOfDay::new(
        "early",
        NaiveTime::from_hms_opt(0, 30, 0).expect("time"),
        60,
    )];
    let err = config.validate().expect_err("must reject");
    assert!(err.to_string().contains("previous day"));
}

#[test]
fn empty_pools_are_rejected() {
    let mut config = AppConfig::default();
    config.resources.prompts.clear();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.resources.locations = vec!["  ".to_string()];
    assert!(config.validate().is_err());
}

#[test]
fn load_reads_config_file_from_root() {
    let temp = tempdir().expect("tempdir");
    std::fs::write(
        temp.path().join(CONFIG_FILE_NAME),
        "[matching]\nordering = \"interest_balanced\"\n",
    )
    .expect("write config");

    let config = AppConfig::load(temp.path()).expect("load");
    assert_eq!(config.matching.ordering, OrderingPolicy::InterestBalanced);
}

#[test]
fn load_without_file_uses_defaults() {
    let temp = tempdir().expect("tempdir");
    let config = AppConfig::load(temp.path()).expect("load");
    assert_eq!(config.calendar.slots.len(), 3);
}

fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |name| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
    }
}

#[test]
fn env_overrides_calendar_numbers() {
    let mut config = AppConfig::default();
    config
        .apply_env_from(&env_of(&[
            ("CIRCLEMATCH_UTC_OFFSET_MINUTES", " -420 "),
            ("CIRCLEMATCH_ROLLOVER_HOUR", "21"),
            ("CIRCLEMATCH_SIZING", ""),
        ]))
        .expect("env");

    assert_eq!(config.calendar.utc_offset_minutes, -420);
    assert_eq!(config.calendar.rollover_hour, 21);
    assert_eq!(config.matching.sizing, SizingPolicy::Balanced);
}

#[test]
fn malformed_utc_offset_env_is_a_config_error() {
    let mut config = AppConfig::default();
    let err = config
        .apply_env_from(&env_of(&[("CIRCLEMATCH_UTC_OFFSET_MINUTES", "-7h")]))
        .expect_err("malformed offset must fail");

    assert!(matches!(err, MatchError::Config(_)));
    assert!(err.to_string().contains("CIRCLEMATCH_UTC_OFFSET_MINUTES"));
    assert_eq!(config.calendar.utc_offset_minutes, 0);
}

#[test]
fn malformed_rollover_hour_env_is_a_config_error() {
    let mut config = AppConfig::default();
    let err = config
        .apply_env_from(&env_of(&[("CIRCLEMATCH_ROLLOVER_HOUR", "-1")]))
        .expect_err("negative hour must fail");

    assert!(matches!(err, MatchError::Config(_)));
}
