//! `slots` CLI: compute bookable appointment hours from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Available hours for a 30-minute service on a date
//! slots hours --plan plan.json --date 2026-03-16 --duration 30
//!
//! # Take existing appointments into account, same-day with a 30-minute lead time
//! slots hours --plan plan.json --reservations booked.json \
//!     --date 2026-03-16 --duration 30 --advance-timeout 30 --now 2026-03-16T14:50
//!
//! # Reschedule appointment 7: its own slot stays free, no lead time applies
//! slots hours --plan plan.json --reservations booked.json \
//!     --date 2026-03-16 --duration 30 --manage --appointment-id 7
//!
//! # Show the free spaces left once breaks and reservations are removed
//! slots spaces --plan plan.json --reservations booked.json --date 2026-03-16
//! ```
//!
//! Output is JSON on stdout; logs go to stderr (`RUST_LOG`, or `--verbose`).

mod config;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use slot_engine::{
    available_hours_for_plan, free_spaces, AvailabilityQuery, ReservedInterval, WorkingPlan,
};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Compute bookable appointment hours"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML) with book_advance_timeout and timezone
    #[arg(long, global = true, env = "SLOTS_CONFIG")]
    config: Option<PathBuf>,

    /// Log engine stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Inputs shared by every subcommand.
#[derive(Args)]
struct DayInput {
    /// Working plan JSON file (an object, or a JSON string holding one)
    #[arg(long)]
    plan: String,
    /// Reserved appointments JSON file (array of {id, start, end})
    #[arg(long)]
    reservations: Option<String>,
    /// Calendar date to inspect (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,
    /// Appointment to leave out of the busy set
    #[arg(long)]
    appointment_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print available start times as a JSON array of "HH:MM" strings
    Hours {
        #[command(flatten)]
        input: DayInput,
        /// Service duration in minutes
        #[arg(long)]
        duration: u32,
        /// Editing an existing appointment: no advance timeout
        #[arg(long, requires = "appointment_id")]
        manage: bool,
        /// Same-day lead time in minutes (overrides the settings file)
        #[arg(long)]
        advance_timeout: Option<u32>,
        /// Current local time (YYYY-MM-DDTHH:MM[:SS]); defaults to the clock in the configured timezone
        #[arg(long)]
        now: Option<String>,
        /// IANA timezone for the default "now" (overrides the settings file)
        #[arg(long)]
        timezone: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the free spaces of the day as JSON
    Spaces {
        #[command(flatten)]
        input: DayInput,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Hours {
            input,
            duration,
            manage,
            advance_timeout,
            now,
            timezone,
            output,
        } => {
            if let Some(tz) = timezone {
                settings.timezone = tz;
            }
            let now = match now.as_deref() {
                Some(raw) => parse_now(raw)?,
                None => Utc::now().with_timezone(&settings.tz()?).naive_local(),
            };

            let plan = read_plan(&input.plan)?;
            let reserved = read_reservations(input.reservations.as_deref())?;
            let query = AvailabilityQuery {
                date: input.date,
                service_duration_minutes: duration,
                manage_mode: manage,
                excluded_reservation_id: input.appointment_id,
                advance_timeout_minutes: advance_timeout.unwrap_or(settings.book_advance_timeout),
                now,
            };

            let hours = available_hours_for_plan(&plan, &reserved, &query)
                .context("Failed to compute available hours")?;
            tracing::info!(date = %query.date, available = hours.len(), "available hours computed");

            write_output(output.as_deref(), &serde_json::to_string(&hours)?)?;
        }
        Commands::Spaces { input } => {
            let plan = read_plan(&input.plan)?;
            let reserved = read_reservations(input.reservations.as_deref())?;

            let spaces = match plan.for_date(input.date) {
                Some(day) => {
                    // Duration and clock play no part in the spaces themselves.
                    let mut query = AvailabilityQuery::new(input.date, 1, NaiveDateTime::MIN);
                    query.excluded_reservation_id = input.appointment_id;
                    free_spaces(day, &reserved, &query).context("Failed to compute free spaces")?
                }
                None => Vec::new(),
            };

            write_output(None, &serde_json::to_string_pretty(&spaces)?)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "slots=debug,slot_engine=debug"
    } else {
        "slots=warn,slot_engine=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

/// Accepts `YYYY-MM-DDTHH:MM` and `YYYY-MM-DDTHH:MM:SS`.
fn parse_now(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .with_context(|| format!("Invalid --now value: '{}'", raw))
}

/// Read a working plan, either as a JSON object or as the JSON string the
/// settings store keeps it in.
fn read_plan(path: &str) -> Result<WorkingPlan> {
    let raw = read_file(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse plan: {}", path))?;
    let plan = match value {
        serde_json::Value::String(inner) => WorkingPlan::from_json(&inner)?,
        other => serde_json::from_value(other)
            .with_context(|| format!("Invalid working plan: {}", path))?,
    };
    Ok(plan)
}

fn read_reservations(path: Option<&str>) -> Result<Vec<ReservedInterval>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = read_file(path)?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse reservations: {}", path))
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(Path::new(path)).with_context(|| format!("Failed to read file: {}", path))
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
