use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use circlematch_core::CircleMatch;

#[derive(Debug, serde::Serialize, Default)]
pub(super) struct DaemonReport {
    pub(super) mode: String,
    pub(super) cycles: u32,
    pub(super) occurrences: usize,
    pub(super) circles_created: usize,
    pub(super) users_matched: usize,
    pub(super) failed_occurrences: usize,
    pub(super) last_error: Option<String>,
}

/// Calls `run_matching` with the current time every `sleep_ms`, measured from the
/// start of each tick so run time never pushes the cadence forward. With
/// `max_cycles` of 0 the loop only ends on `stop_on_failure`.
pub(super) fn run_matching_daemon(
    app: &CircleMatch,
    max_cycles: u32,
    sleep_ms: u64,
    stop_on_failure: bool,
) -> DaemonReport {
    let mut total = DaemonReport {
        mode: "daemon".to_string(),
        ..DaemonReport::default()
    };
    let mut cycle = 0u32;

    loop {
        if max_cycles > 0 && cycle >= max_cycles {
            break;
        }
        cycle += 1;

        let started = Instant::now();
        let report = app.run_matching(Utc::now());
        total.cycles = cycle;
        total.occurrences += report.results.len();
        for result in &report.results {
            total.circles_created += result.circles_created;
            total.users_matched += result.users_matched;
            if result.is_error() {
                total.failed_occurrences += 1;
                total.last_error.clone_from(&result.error);
            }
        }
        if stop_on_failure && !report.success {
            break;
        }
        if max_cycles == 0 || cycle < max_cycles {
            thread::sleep(remaining_sleep(sleep_ms, started.elapsed()));
        }
    }

    total
}

pub(super) fn remaining_sleep(sleep_ms: u64, elapsed: Duration) -> Duration {
    Duration::from_millis(sleep_ms).saturating_sub(elapsed)
}
