use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

mod args;
mod parsers;


pub use args::{
    CirclesArgs, DaemonArgs, MatchArgs, MatchCommand, OccurrenceArgs, RequestsArgs, UserArgs,
    UserCommand, WaitlistArgs, WaitlistCommand,
};

use self::parsers::parse_rfc3339_utc;

#[derive(Debug, Parser)]
#[command(name = "circlematch")]
#[command(about = "Deadline-driven matching of waitlisted users into small circles", version)]
pub struct Cli {
    #[arg(long, default_value = ".circlematch")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run matching now or for one occurrence.
    Match(MatchArgs),
    /// Tick `match run` on a fixed sleep interval.
    Daemon(DaemonArgs),
    User(UserArgs),
    Waitlist(WaitlistArgs),
    /// Slot day occurrences and their phases.
    Slots {
        #[arg(long, value_parser = parse_rfc3339_utc)]
        now: Option<DateTime<Utc>>,
    },
    Circles(CirclesArgs),
    /// Persisted matching status of one occurrence.
    Status(OccurrenceArgs),
    /// Recent request log entries, newest first.
    Requests(RequestsArgs),
}
