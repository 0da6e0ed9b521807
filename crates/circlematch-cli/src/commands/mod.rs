use std::path::Path;

use anyhow::{Context, Result};
use circlematch_core::CircleMatch;
use circlematch_core::models::{EligibleUser, Gender};

use crate::cli::{Commands, MatchCommand, UserCommand, WaitlistCommand};

mod daemon;
mod support;


use self::daemon::run_matching_daemon;
use self::support::{print_json, resolve_now};

pub(crate) fn run_from_root(root: &Path, command: Commands) -> Result<()> {
    let app = CircleMatch::new(root)
        .with_context(|| format!("failed to open circlematch workspace at {}", root.display()))?;
    run_with_app(&app, command)
}

fn run_with_app(app: &CircleMatch, command: Commands) -> Result<()> {
    match command {
        Commands::Match(args) => match args.command {
            MatchCommand::Run { now, enforce } => {
                let report = app.run_matching(resolve_now(now));
                print_json(&report)?;
                if enforce && !report.success {
                    anyhow::bail!("matching run reported failed occurrences");
                }
            }
            MatchCommand::Occurrence {
                occurrence,
                now,
                enforce,
            } => {
                let result = app.run_occurrence(occurrence.date, &occurrence.slot, resolve_now(now))?;
                print_json(&result)?;
                if enforce && result.is_error() {
                    anyhow::bail!(
                        "matching failed for {}: {}",
                        result.occurrence_key,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        },
        Commands::Daemon(args) => {
            let report = run_matching_daemon(app, args.max_cycles, args.sleep_ms, args.stop_on_failure);
            print_json(&report)?;
        }
        Commands::User(args) => match args.command {
            UserCommand::Add {
                id,
                birth_date,
                gender,
                interests,
            } => {
                let mut user = EligibleUser::new(id).with_interests(interests);
                user.birth_date = birth_date;
                user.gender = Gender::parse_optional(gender.as_deref());
                app.register_user(&user, resolve_now(None))?;
                print_json(&user)?;
            }
            UserCommand::Show { id } => {
                let user = app
                    .get_user(&id)?
                    .with_context(|| format!("user {id} not found"))?;
                print_json(&user)?;
            }
        },
        Commands::Waitlist(args) => match args.command {
            WaitlistCommand::Join {
                occurrence,
                user,
                now,
            } => {
                let joined =
                    app.join_waitlist(occurrence.date, &occurrence.slot, &user, resolve_now(now))?;
                print_json(&serde_json::json!({
                    "user_id": user,
                    "joined": joined,
                }))?;
            }
            WaitlistCommand::Leave {
                occurrence,
                user,
                now,
            } => {
                let left =
                    app.leave_waitlist(occurrence.date, &occurrence.slot, &user, resolve_now(now))?;
                print_json(&serde_json::json!({
                    "user_id": user,
                    "left": left,
                }))?;
            }
            WaitlistCommand::List { occurrence } => {
                let entries = app.list_waitlist(occurrence.date, &occurrence.slot)?;
                print_json(&entries)?;
            }
        },
        Commands::Slots { now } => {
            let views = app.slots(resolve_now(now))?;
            print_json(&views)?;
        }
        Commands::Circles(args) => {
            let occurrence = &args.occurrence;
            match args.user.as_deref() {
                Some(user_id) => {
                    let circle = app.circle_for_user(occurrence.date, &occurrence.slot, user_id)?;
                    print_json(&circle)?;
                }
                None => {
                    let circles = app.list_circles(occurrence.date, &occurrence.slot)?;
                    print_json(&circles)?;
                }
            }
        }
        Commands::Status(occurrence) => {
            let status = app.matching_status(occurrence.date, &occurrence.slot)?;
            print_json(&status)?;
        }
        Commands::Requests(args) => {
            let entries = app.recent_requests_filtered(
                args.limit,
                args.operation.as_deref(),
                args.status.as_deref(),
            )?;
            print_json(&entries)?;
        }
    }
    Ok(())
}
