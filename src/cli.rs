//! CLI interface for hours.
//!
//! Non-interactive: arguments in, structured output out. Edits are staged
//! in a local draft (`<store>/draft.json`, the working copy of the config
//! plus the version token captured at load) and only become durable on
//! `publish`. A draft is started from the store on the first edit and
//! dropped on a successful publish or an explicit `discard`.
//!
//! Statuses shown by `status` and `schedule list` are always recomputed
//! locally against the working copy, so staged edits are reflected
//! immediately instead of waiting for a reload.

mod format;

use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use jiff::Timestamp;
use jiff::civil::{Date, Time};
use uuid::Uuid;

use crate::config::Config;
use crate::model::{DEFAULT_CLOSED_REASON, Rule, Schedule, ScheduleConfig};
use crate::pipeline::{FsPipeline, SchedulePipeline};
use crate::publish::{PublishState, Publisher};
use crate::resolver;
use crate::store::ConfigStore;

use format::{
    format_rule_date, format_rule_kind, format_rule_time, format_schedule_rules, format_status,
};

/// hours — business-hour schedules with versioned publishing.
#[derive(Debug, Parser)]
#[command(name = "hours", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: staging and publishing
  1. hours rule add "Weekday hours" --rrule "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR" \
       --start-time 09:00 --end-time 17:00
  2. hours rule add "Christmas" --closed --reason holiday --date 2024-12-25
  3. hours schedule add Support --zone America/New_York \
       --rule Christmas --rule "Weekday hours"
  4. hours status Support
  5. hours publish

Edits stage into a draft and only become durable on publish. If someone
else published first, publish reports a version conflict: discard and
re-stage on top of their changes."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage rules: named open/closed predicates.
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },

    /// Manage schedules: ordered rule compositions with a timezone.
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Evaluate one schedule (or all) right now, against staged edits.
    Status {
        /// Schedule name; all schedules when omitted.
        name: Option<String>,
    },

    /// Publish staged edits through the build/deploy pipeline.
    Publish,

    /// Drop staged edits and go back to the published config.
    Discard,
}

#[derive(Debug, Subcommand)]
pub enum RuleCommand {
    /// Add a rule. Prints the rule id.
    Add {
        /// Rule name; must be unique among rules.
        name: String,

        /// Make this a closed rule (a match means "closed").
        #[arg(long)]
        closed: bool,

        /// Reason reported when this closed rule matches.
        #[arg(long, requires = "closed")]
        reason: Option<String>,

        /// Single absolute date (YYYY-MM-DD). Mutually exclusive with --rrule.
        #[arg(long, conflicts_with = "rrule")]
        date: Option<Date>,

        /// Recurrence string, e.g. `FREQ=WEEKLY;BYDAY=MO,WE`.
        #[arg(long)]
        rrule: Option<String>,

        /// First date the recurrence applies (inclusive).
        #[arg(long, requires = "rrule")]
        from: Option<Date>,

        /// Last date the recurrence applies (inclusive).
        #[arg(long, requires = "rrule")]
        until: Option<Date>,

        /// Start of the time-of-day window (HH:MM, inclusive).
        #[arg(long)]
        start_time: Option<Time>,

        /// End of the time-of-day window (HH:MM, exclusive).
        #[arg(long)]
        end_time: Option<Time>,
    },

    /// List rules.
    List,

    /// Remove a rule. Schedules referencing it simply stop matching it.
    Remove {
        /// Rule name.
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Add a schedule.
    Add {
        /// Schedule name; must be unique among schedules.
        name: String,

        /// IANA time zone the rules are evaluated in.
        #[arg(long)]
        zone: String,

        /// Rule names, topmost first. Among matching closed rules the first
        /// listed wins.
        #[arg(long = "rule")]
        rules: Vec<String>,

        /// Create the schedule manually closed.
        #[arg(long)]
        manual_close: bool,
    },

    /// List schedules with their current status.
    List,

    /// Manually close a schedule, overriding all rules.
    Close {
        /// Schedule name.
        name: String,
    },

    /// Lift a manual close.
    Reopen {
        /// Schedule name.
        name: String,
    },

    /// Remove a schedule.
    Remove {
        /// Schedule name.
        name: String,
    },
}

/// Dispatch a parsed command.
pub fn run(cli: Cli, config: &Config) -> Result<(), String> {
    let root = config
        .store_root()
        .ok_or("could not determine home directory")?;
    let pipeline = FsPipeline::new(&root).map_err(|e| format!("failed to open store: {e}"))?;
    let draft = root.join("draft.json");

    match cli.command {
        Command::Rule { command } => run_rule(command, &pipeline, &draft),
        Command::Schedule { command } => run_schedule(command, &pipeline, &draft),
        Command::Status { name } => cmd_status(name.as_deref(), &pipeline, &draft),
        Command::Publish => cmd_publish(config, pipeline, &draft),
        Command::Discard => cmd_discard(&draft),
    }
}

fn run_rule(command: RuleCommand, pipeline: &FsPipeline, draft: &Path) -> Result<(), String> {
    match command {
        RuleCommand::Add {
            name,
            closed,
            reason,
            date,
            rrule,
            from,
            until,
            start_time,
            end_time,
        } => {
            let (start_date, end_date) = match date {
                Some(date) => (Some(date), Some(date)),
                None => (from, until),
            };

            let rule = Rule {
                id: Uuid::new_v4(),
                name,
                is_open: !closed,
                closed_reason: reason.unwrap_or_else(|| DEFAULT_CLOSED_REASON.to_string()),
                recurrence: rrule,
                start_date,
                end_date,
                start_time,
                end_time,
            };
            rule.validate().map_err(|e| e.to_string())?;

            let mut store = working_store(pipeline, draft)?;
            let id = rule.id;
            store.upsert_rule(rule, None).map_err(|e| e.to_string())?;
            save_draft(draft, store.config())?;

            println!("{id}");
            Ok(())
        }

        RuleCommand::List => {
            let store = working_store(pipeline, draft)?;
            let rules = &store.config().rules;

            if rules.is_empty() {
                println!("No rules");
                return Ok(());
            }

            for rule in rules {
                println!(
                    "{}  [{}]  {}  {}",
                    rule.name,
                    format_rule_kind(rule),
                    format_rule_time(rule),
                    format_rule_date(rule),
                );
            }
            Ok(())
        }

        RuleCommand::Remove { name } => {
            let mut store = working_store(pipeline, draft)?;
            let id = store
                .config()
                .rule_by_name(&name)
                .ok_or_else(|| format!("no rule named {name:?}"))?
                .id;

            store.remove_rule(id).map_err(|e| e.to_string())?;
            save_draft(draft, store.config())?;
            Ok(())
        }
    }
}

fn run_schedule(
    command: ScheduleCommand,
    pipeline: &FsPipeline,
    draft: &Path,
) -> Result<(), String> {
    match command {
        ScheduleCommand::Add {
            name,
            zone,
            rules,
            manual_close,
        } => {
            let mut store = working_store(pipeline, draft)?;

            let mut ids = Vec::with_capacity(rules.len());
            for rule_name in &rules {
                let rule = store
                    .config()
                    .rule_by_name(rule_name)
                    .ok_or_else(|| format!("no rule named {rule_name:?}"))?;
                ids.push(rule.id);
            }

            let schedule = Schedule {
                name,
                time_zone: zone,
                manual_close,
                rules: ids,
                status: None,
            };
            schedule.validate().map_err(|e| e.to_string())?;

            store
                .upsert_schedule(schedule, None)
                .map_err(|e| e.to_string())?;
            save_draft(draft, store.config())?;
            Ok(())
        }

        ScheduleCommand::List => {
            let store = working_store(pipeline, draft)?;
            let config = store.config();

            if config.schedules.is_empty() {
                println!("No schedules");
                return Ok(());
            }

            let now = Timestamp::now();
            for schedule in &config.schedules {
                let status = resolver::resolve(schedule, &config.rules, now);
                println!(
                    "{}  [{}]  {}  manual close: {}  rules: {}",
                    schedule.name,
                    format_status(&status),
                    schedule.time_zone,
                    if schedule.manual_close { "yes" } else { "no" },
                    format_schedule_rules(schedule, &config.rules),
                );
            }
            Ok(())
        }

        ScheduleCommand::Close { name } => set_manual_close(pipeline, draft, &name, true),
        ScheduleCommand::Reopen { name } => set_manual_close(pipeline, draft, &name, false),

        ScheduleCommand::Remove { name } => {
            let mut store = working_store(pipeline, draft)?;
            store.remove_schedule(&name).map_err(|e| e.to_string())?;
            save_draft(draft, store.config())?;
            Ok(())
        }
    }
}

fn set_manual_close(
    pipeline: &FsPipeline,
    draft: &Path,
    name: &str,
    manual_close: bool,
) -> Result<(), String> {
    let mut store = working_store(pipeline, draft)?;

    let mut schedule = store
        .config()
        .schedule(name)
        .ok_or_else(|| format!("no schedule named {name:?}"))?
        .clone();
    schedule.manual_close = manual_close;

    store
        .upsert_schedule(schedule, Some(name))
        .map_err(|e| e.to_string())?;
    save_draft(draft, store.config())?;
    Ok(())
}

fn cmd_status(name: Option<&str>, pipeline: &FsPipeline, draft: &Path) -> Result<(), String> {
    let store = working_store(pipeline, draft)?;
    let config = store.config();
    let now = Timestamp::now();

    let schedules: Vec<&Schedule> = match name {
        Some(name) => {
            let schedule = config
                .schedule(name)
                .ok_or_else(|| format!("no schedule named {name:?}"))?;
            vec![schedule]
        }
        None => config.schedules.iter().collect(),
    };

    for schedule in schedules {
        let status = resolver::resolve(schedule, &config.rules, now);
        println!("{}: {}", schedule.name, format_status(&status));
    }
    Ok(())
}

fn cmd_publish(config: &Config, pipeline: FsPipeline, draft: &Path) -> Result<(), String> {
    let Some(staged) = load_draft(draft)? else {
        println!("Nothing staged to publish");
        return Ok(());
    };

    let mut publisher = Publisher::new(pipeline, config.poll_interval());

    match publisher.publish(&staged) {
        PublishState::Idle => {
            clear_draft(draft)?;
            // Reload so the new version and statuses are observed.
            let listing = publisher
                .pipeline()
                .list()
                .map_err(|e| format!("published, but reload failed: {e}"))?;
            publisher.acknowledge_reload();
            println!("Published version {}", listing.config.version);
            Ok(())
        }
        PublishState::VersionConflict => Err(
            "version conflict: someone else published first; run `hours discard` and re-stage \
             your changes"
                .to_string(),
        ),
        PublishState::Failed => Err("publish failed; staged edits were kept".to_string()),
        PublishState::InProgress => unreachable!("publish returned a non-terminal state"),
    }
}

fn cmd_discard(draft: &Path) -> Result<(), String> {
    if clear_draft(draft)? {
        println!("Staged edits discarded");
    } else {
        println!("Nothing staged");
    }
    Ok(())
}

// ── Draft handling ──

/// The working copy: the draft when one exists, otherwise a fresh load from
/// the store (capturing its version token for the eventual publish).
fn working_store(pipeline: &FsPipeline, draft: &Path) -> Result<ConfigStore, String> {
    if let Some(staged) = load_draft(draft)? {
        return Ok(ConfigStore::new(staged));
    }

    let listing = pipeline
        .list()
        .map_err(|e| format!("failed to load schedules: {e}"))?;

    if !listing.version_is_deployed {
        eprintln!("Note: the latest saved version has not been deployed yet.");
    }

    Ok(ConfigStore::new(listing.config))
}

fn load_draft(draft: &Path) -> Result<Option<ScheduleConfig>, String> {
    let json = match fs::read_to_string(draft) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("failed to read draft: {e}")),
    };

    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| format!("invalid draft at {}: {e}", draft.display()))
}

fn save_draft(draft: &Path, config: &ScheduleConfig) -> Result<(), String> {
    let json =
        serde_json::to_string_pretty(config).map_err(|e| format!("failed to encode draft: {e}"))?;
    fs::write(draft, json).map_err(|e| format!("failed to write draft: {e}"))
}

/// Remove the draft; returns whether one existed.
fn clear_draft(draft: &Path) -> Result<bool, String> {
    match fs::remove_file(draft) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!("failed to remove draft: {e}")),
    }
}
