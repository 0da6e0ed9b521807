use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use tempfile::tempdir;

use crate::models::{
    ClaimOutcome, EligibleUser, Gender, MatchingStatus, NewCircle, SlotOccurrence, SlotOfDay,
};
use crate::store::{CircleStore, WaitlistProvider};

use super::*;

fn occurrence(label: &str) -> SlotOccurrence {
    SlotOccurrence::new(
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("date"),
        SlotOfDay::new(
            label,
            NaiveTime::from_hms_opt(11, 0, 0).expect("time"),
            60,
        ),
    )
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0)
        .single()
        .expect("timestamp")
}

fn new_circle(occ: &SlotOccurrence, sequence: u32, members: &[&str]) -> NewCircle {
    NewCircle {
        id: format!("{}-{}-{sequence:03}", occ.compact_date(), occ.label()),
        sequence,
        occurrence: occ.clone(),
        location: "Cafe Lumen".to_string(),
        prompt: "What made you smile this week?".to_string(),
        created_at: at(10, 0).to_rfc3339(),
        member_ids: members.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn migrate_records_schema_version() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    store.migrate().expect("second migrate is a no-op");
    let version = store
        .with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT value FROM system_kv WHERE key = 'schema_version'",
                [],
                |row| row.get::<_, String>(0),
            )?)
        })
        .expect("read");
    assert_eq!(version, migration::SCHEMA_VERSION);
}

#[test]
fn reopen_keeps_existing_rows() {
    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("state.db");
    {
        let store = SqliteStateStore::open(&db_path).expect("open");
        store
            .upsert_user(&EligibleUser::new("u1"), at(9, 0))
            .expect("upsert");
    }
    let store = SqliteStateStore::open(&db_path).expect("reopen");
    assert!(store.get_user("u1").expect("get").is_some());
}

#[cfg(unix)]
#[test]
fn open_hardens_state_db_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("nested").join("state.db");
    let store = SqliteStateStore::open(&db_path).expect("open failed");
    store
        .upsert_user(&EligibleUser::new("u1"), at(9, 0))
        .expect("upsert");

    let mode = std::fs::metadata(&db_path)
        .expect("metadata")
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(mode, 0o600);

    for suffix in ["-wal", "-shm"] {
        let mut os = db_path.as_os_str().to_os_string();
        os.push(suffix);
        let path = PathBuf::from(os);
        if path.exists() {
            let mode = std::fs::metadata(path)
                .expect("sidecar metadata")
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}

#[test]
fn user_profile_upsert_and_remove() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let user = EligibleUser::new("u1")
        .with_birth_date(NaiveDate::from_ymd_opt(1998, 5, 4).expect("date"))
        .with_gender(Gender::Female)
        .with_interests(["climbing", "jazz"]);
    store.upsert_user(&user, at(9, 0)).expect("insert");
    assert_eq!(store.get_user("u1").expect("get"), Some(user.clone()));

    let updated = user.with_interests(["chess"]);
    store.upsert_user(&updated, at(9, 5)).expect("update");
    let stored = store.get_user("u1").expect("get").expect("present");
    assert_eq!(stored.interests, vec!["chess".to_string()]);
    assert!(store.get_user("u2").expect("get").is_none());
}

#[test]
fn waitlist_join_is_idempotent_and_ordered() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let occ = occurrence("11AM");
    for id in ["u2", "u1", "u3"] {
        store
            .upsert_user(&EligibleUser::new(id), at(8, 0))
            .expect("user");
    }

    assert!(store.join_waitlist(&occ, "u2", at(9, 0)).expect("join"));
    assert!(store.join_waitlist(&occ, "u1", at(9, 1)).expect("join"));
    assert!(store.join_waitlist(&occ, "u3", at(9, 2)).expect("join"));
    assert!(!store.join_waitlist(&occ, "u1", at(9, 3)).expect("rejoin"));

    let ids = store
        .eligible_users(&occ)
        .expect("eligible")
        .into_iter()
        .map(|user| user.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["u2", "u1", "u3"]);

    assert!(store.leave_waitlist(&occ, "u1").expect("leave"));
    assert_eq!(store.list_waitlist(&occ).expect("list").len(), 2);
    assert!(
        store
            .eligible_users(&occurrence("2PM"))
            .expect("other slot")
            .is_empty()
    );
}

#[test]
fn waitlist_join_requires_known_user() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let err = store
        .join_waitlist(&occurrence("11AM"), "ghost", at(9, 0))
        .expect_err("unknown user");
    assert!(matches!(err, MatchError::NotFound(_)));
}

#[test]
fn claim_transitions_follow_run_status() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let occ = occurrence("11AM");
    let key = occ.key();

    assert!(store.matching_status(&key).expect("status").is_none());
    assert_eq!(
        store.claim_occurrence(&occ, at(10, 0)).expect("claim"),
        ClaimOutcome::Claimed { resumed: false }
    );
    assert_eq!(
        store.claim_occurrence(&occ, at(10, 0)).expect("claim twice"),
        ClaimOutcome::InProgress
    );

    store
        .fail_occurrence(&key, at(10, 0), "store unavailable")
        .expect("fail");
    let failed = store.matching_status(&key).expect("status").expect("row");
    assert_eq!(failed.status, MatchingStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("store unavailable"));
    assert_eq!(failed.attempts, 1);

    assert_eq!(
        store.claim_occurrence(&occ, at(10, 5)).expect("reclaim"),
        ClaimOutcome::Claimed { resumed: true }
    );
    store.complete_occurrence(&key, at(10, 6)).expect("complete");

    let done = store.matching_status(&key).expect("status").expect("row");
    assert_eq!(done.status, MatchingStatus::Done);
    assert_eq!(done.attempts, 2);
    assert!(done.error.is_none());
    assert!(done.finished_at.is_some());
    assert_eq!(
        store.claim_occurrence(&occ, at(10, 7)).expect("after done"),
        ClaimOutcome::AlreadyMatched
    );
}

#[test]
fn finishing_unclaimed_run_is_conflict() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let err = store
        .complete_occurrence("2025-03-14:11AM", at(10, 0))
        .expect_err("nothing claimed");
    assert!(err.is_conflict());
}

#[test]
fn circles_persist_with_members_in_order() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let occ = occurrence("11AM");
    let key = occ.key();

    assert_eq!(store.next_circle_sequence(&key).expect("seq"), 1);
    let first = new_circle(&occ, 1, &["u3", "u1", "u2"]);
    assert_eq!(store.create_circle(&first).expect("create"), "20250314-11AM-001");
    store
        .create_circle(&new_circle(&occ, 2, &["u4", "u5"]))
        .expect("create second");

    let circles = store.list_circles(&key).expect("list");
    assert_eq!(circles.len(), 2);
    assert_eq!(circles[0].member_ids, vec!["u3", "u1", "u2"]);
    assert_eq!(circles[0].date, occ.date);
    assert_eq!(circles[1].sequence, 2);
    assert_eq!(store.next_circle_sequence(&key).expect("seq"), 3);

    let assigned = store.assigned_user_ids(&key).expect("assigned");
    assert_eq!(assigned.len(), 5);

    let found = store
        .circle_for_user(&key, "u5")
        .expect("lookup")
        .expect("circle");
    assert_eq!(found.id, "20250314-11AM-002");
    assert!(store.circle_for_user(&key, "u9").expect("lookup").is_none());
}

#[test]
fn double_assignment_rolls_back_whole_circle() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let occ = occurrence("11AM");
    let key = occ.key();
    store
        .create_circle(&new_circle(&occ, 1, &["u1", "u2"]))
        .expect("create");

    let err = store
        .create_circle(&new_circle(&occ, 2, &["u3", "u1"]))
        .expect_err("u1 already placed");
    assert!(matches!(err, MatchError::Conflict(_)));

    let circles = store.list_circles(&key).expect("list");
    assert_eq!(circles.len(), 1);
    assert_eq!(store.circle_count(&key).expect("count"), 1);
    assert!(store.circle_for_user(&key, "u3").expect("lookup").is_none());
    assert_eq!(store.next_circle_sequence(&key).expect("seq"), 2);
}

#[test]
fn same_user_may_join_different_occurrences() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let morning = occurrence("11AM");
    let afternoon = occurrence("2PM");
    store
        .create_circle(&new_circle(&morning, 1, &["u1", "u2"]))
        .expect("morning");
    store
        .create_circle(&new_circle(&afternoon, 1, &["u1", "u2"]))
        .expect("afternoon");
    assert_eq!(store.list_circles(&afternoon.key()).expect("list").len(), 1);
}

#[test]
fn empty_circle_is_rejected() {
    let store = SqliteStateStore::open_in_memory().expect("open");
    let err = store
        .create_circle(&new_circle(&occurrence("11AM"), 1, &[]))
        .expect_err("empty");
    assert!(matches!(err, MatchError::Validation(_)));
    assert_eq!(
        store
            .next_circle_sequence(&occurrence("11AM").key())
            .expect("seq"),
        1
    );
}
