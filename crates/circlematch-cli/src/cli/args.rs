use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};

use super::parsers::{parse_date, parse_min_one_usize, parse_rfc3339_utc, parse_tick_sleep_ms};

/// Identifies one slot occurrence, e.g. `--date 2025-03-14 --slot 11AM`.
#[derive(Debug, Args)]
pub struct OccurrenceArgs {
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,
    #[arg(long)]
    pub slot: String,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    #[command(subcommand)]
    pub command: MatchCommand,
}

#[derive(Debug, Subcommand)]
pub enum MatchCommand {
    /// Match every slot whose deadline minute contains `--now` (default: current time).
    Run {
        #[arg(long, value_parser = parse_rfc3339_utc)]
        now: Option<DateTime<Utc>>,
        /// Exit non-zero when any occurrence failed.
        #[arg(long, default_value_t = false)]
        enforce: bool,
    },
    /// Match one occurrence whose waitlist has already closed.
    Occurrence {
        #[command(flatten)]
        occurrence: OccurrenceArgs,
        #[arg(long, value_parser = parse_rfc3339_utc)]
        now: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = false)]
        enforce: bool,
    },
}

#[derive(Debug, Args)]
pub struct DaemonArgs {
    /// 0 runs until interrupted.
    #[arg(long, default_value_t = 0)]
    pub max_cycles: u32,
    #[arg(long, default_value_t = 15_000, value_parser = parse_tick_sleep_ms)]
    pub sleep_ms: u64,
    /// Stop after the first tick whose report is not successful.
    #[arg(long, default_value_t = false)]
    pub stop_on_failure: bool,
}

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create or replace a user profile.
    Add {
        id: String,
        #[arg(long, value_parser = parse_date)]
        birth_date: Option<NaiveDate>,
        /// male, female, non_binary or other.
        #[arg(long)]
        gender: Option<String>,
        #[arg(long = "interest", value_name = "TAG")]
        interests: Vec<String>,
    },
    Show {
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct WaitlistArgs {
    #[command(subcommand)]
    pub command: WaitlistCommand,
}

#[derive(Debug, Subcommand)]
pub enum WaitlistCommand {
    Join {
        #[command(flatten)]
        occurrence: OccurrenceArgs,
        #[arg(long)]
        user: String,
        #[arg(long, value_parser = parse_rfc3339_utc)]
        now: Option<DateTime<Utc>>,
    },
    Leave {
        #[command(flatten)]
        occurrence: OccurrenceArgs,
        #[arg(long)]
        user: String,
        #[arg(long, value_parser = parse_rfc3339_utc)]
        now: Option<DateTime<Utc>>,
    },
    List {
        #[command(flatten)]
        occurrence: OccurrenceArgs,
    },
}

#[derive(Debug, Args)]
pub struct CirclesArgs {
    #[command(flatten)]
    pub occurrence: OccurrenceArgs,
    /// Only the circle this user was placed in.
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Debug, Args)]
pub struct RequestsArgs {
    #[arg(long, default_value_t = 20, value_parser = parse_min_one_usize)]
    pub limit: usize,
    #[arg(long)]
    pub operation: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}
