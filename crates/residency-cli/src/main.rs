//! `residency` CLI — check 183-in-365 compliance and plan trips from a travel profile.
//!
//! ## Usage
//!
//! ```sh
//! # Current status (today's date unless --today is given)
//! residency -p omer.json status
//!
//! # Longest safe trip starting on a date, keeping the profile's buffer
//! residency -p omer.json plan --start 2025-12-20
//!
//! # ...and compare it with trips of fixed lengths
//! residency -p omer.json plan --start 2025-12-20 --alternatives 14,21,28
//!
//! # What-if check of a specific trip, with a day-by-day breakdown
//! residency -p omer.json check --start 2025-12-20 --end 2026-01-10 --daily
//!
//! # Window usage per day as CSV
//! residency -p omer.json timeline --from 2025-01-01 --to 2025-12-31
//!
//! # Same, with planned trips counted as restricted days
//! residency -p omer.json timeline --from 2025-12-01 --to 2026-02-28 --trip 2025-12-20..2026-01-10
//!
//! # Gaps, overlaps and per-country totals
//! residency -p omer.json audit
//!
//! # Any command as JSON
//! residency -p omer.json --json status
//! ```

mod profile;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use profile::Profile;
use residency_engine::{
    audit_history, current_status, evaluate_alternative, recommend_trip, simulate_trip, timeline,
    totals_by_country, BufferPolicy, CountryTotals, HistoryIssue, Interval, PlannedTrip,
    TripEvaluation, TripRecommendation, TripSimulation, RULE_LIMIT,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "residency",
    version,
    about = "Rolling-window residency tracker (max 183 days in any 365)"
)]
struct Cli {
    /// Travel profile (JSON)
    #[arg(short, long)]
    profile: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show compliance status on a date
    Status {
        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Maximum restricted days per window
        #[arg(long, default_value_t = RULE_LIMIT)]
        limit: u32,
    },
    /// Find the longest safe trip starting on a date
    Plan {
        /// First day of the trip
        #[arg(long)]
        start: NaiveDate,
        /// Safety buffer in days (defaults to the profile's)
        #[arg(long)]
        buffer: Option<u32>,
        /// Maximum restricted days per window
        #[arg(long, default_value_t = RULE_LIMIT)]
        limit: u32,
        /// Also evaluate trips of these lengths in days (comma-separated)
        #[arg(long, value_delimiter = ',')]
        alternatives: Vec<u32>,
    },
    /// Check whether a specific trip stays within the buffered limit
    Check {
        /// First day of the trip
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the trip
        #[arg(long)]
        end: NaiveDate,
        /// Safety buffer in days (defaults to the profile's)
        #[arg(long)]
        buffer: Option<u32>,
        /// Maximum restricted days per window
        #[arg(long, default_value_t = RULE_LIMIT)]
        limit: u32,
        /// Also print window usage for every trip day
        #[arg(long)]
        daily: bool,
    },
    /// Print window usage for every day in a range
    Timeline {
        /// First day of the range
        #[arg(long)]
        from: NaiveDate,
        /// Last day of the range
        #[arg(long)]
        to: NaiveDate,
        /// Maximum restricted days per window
        #[arg(long, default_value_t = RULE_LIMIT)]
        limit: u32,
        /// Planned restricted trip as START..END (repeatable)
        #[arg(long = "trip", value_parser = parse_trip)]
        trips: Vec<PlannedTrip>,
    },
    /// Report gaps and overlaps in the travel history
    Audit,
}

#[derive(Serialize)]
struct PlanReport {
    #[serde(flatten)]
    recommendation: TripRecommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_on_return: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alternatives: Vec<AlternativeReport>,
}

#[derive(Serialize)]
struct AlternativeReport {
    duration: u32,
    trip_end: NaiveDate,
    #[serde(flatten)]
    evaluation: TripEvaluation,
}

#[derive(Serialize)]
struct CheckReport {
    evaluation: TripEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<TripSimulation>,
}

#[derive(Serialize)]
struct AuditReport {
    intervals: usize,
    totals: CountryTotals,
    issues: Vec<HistoryIssue>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let profile = profile::load_profile(&cli.profile)?;

    match cli.command {
        Commands::Status { today, limit } => {
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let status = current_status(&profile.history, today, limit);
            if cli.json {
                return print_json(&status);
            }

            let policy = BufferPolicy::new(profile.buffer_days);
            let verdict = if !status.compliant {
                "NON-COMPLIANT"
            } else if status.within_buffer(policy) {
                "COMPLIANT (safe)"
            } else {
                "COMPLIANT (below buffer)"
            };
            println!("Person:          {}", profile.person_name);
            println!("Date:            {}", status.date);
            println!("Location:        {}", profile.location_label(status.location));
            println!("Days used:       {}/{}", status.used, status.limit);
            println!("Days remaining:  {}", status.remaining);
            println!("Buffer:          {} days", profile.buffer_days);
            println!("Status:          {}", verdict);
        }
        Commands::Plan {
            start,
            buffer,
            limit,
            alternatives,
        } => {
            let policy = buffer_policy(&profile, buffer);
            let recommendation = recommend_trip(&profile.history, start, limit, policy)
                .context("Failed to plan trip")?;
            let usage_on_return = match recommendation.recommended_return {
                Some(return_date) => {
                    let trip = PlannedTrip::new(start, return_date)
                        .context("Invalid recommended trip")?;
                    let simulation = simulate_trip(&profile.history, &trip, limit)
                        .context("Failed to simulate recommended trip")?;
                    Some(simulation.usage_on_return)
                }
                None => None,
            };
            let alternatives = alternatives
                .iter()
                .map(|&duration| {
                    evaluate_duration(&profile.history, start, duration, limit, policy)
                })
                .collect::<Result<Vec<_>>>()?;
            let report = PlanReport {
                recommendation,
                usage_on_return,
                alternatives,
            };
            if cli.json {
                return print_json(&report);
            }

            let rec = &report.recommendation;
            println!("Trip start:        {}", rec.trip_start);
            println!("Buffer:            {} days", policy.buffer_days);
            match (rec.recommended_return, report.usage_on_return) {
                (Some(return_date), Some(used)) => {
                    println!("Max duration:      {} days", rec.duration);
                    println!("Return by:         {}", return_date);
                    println!("Peak usage:        {}/{}", rec.peak_usage, limit);
                    println!("Usage on return:   {}/{}", used, limit);
                    println!("Buffer maintained: {} days", rec.margin_to_limit);
                }
                _ => {
                    println!(
                        "Cannot take trip: already at or above the buffered limit ({}/{} days used)",
                        rec.peak_usage, limit
                    );
                }
            }

            if !report.alternatives.is_empty() {
                println!();
                println!("duration,return,worst_day_usage,margin,safe");
                for alt in &report.alternatives {
                    println!(
                        "{},{},{},{},{}",
                        alt.duration,
                        alt.trip_end,
                        alt.evaluation.worst_day_usage,
                        alt.evaluation.margin,
                        alt.evaluation.feasible
                    );
                }
            }
        }
        Commands::Check {
            start,
            end,
            buffer,
            limit,
            daily,
        } => {
            let policy = buffer_policy(&profile, buffer);
            let trip = PlannedTrip::new(start, end).context("Invalid trip dates")?;
            let evaluation = evaluate_alternative(&profile.history, &trip, limit, policy)
                .context("Failed to evaluate trip")?;
            let simulation = if daily {
                let simulation = simulate_trip(&profile.history, &trip, limit)
                    .context("Failed to simulate trip")?;
                Some(simulation)
            } else {
                None
            };
            if cli.json {
                return print_json(&CheckReport {
                    evaluation,
                    simulation,
                });
            }

            let verdict = if evaluation.worst_day_usage > limit {
                "EXCEEDS LIMIT"
            } else if !evaluation.feasible {
                "BELOW BUFFER"
            } else {
                "SAFE"
            };
            println!("Trip:        {} to {} ({} days)", trip.start(), trip.end(), trip.days());
            println!(
                "Worst day:   {} ({}/{})",
                evaluation.worst_day, evaluation.worst_day_usage, limit
            );
            println!("Margin:      {} days", evaluation.margin);
            println!("Result:      {}", verdict);

            if let Some(simulation) = simulation {
                println!();
                println!("date,used,compliant");
                for day in &simulation.daily {
                    println!("{},{},{}", day.date, day.used, day.compliant);
                }
            }
        }
        Commands::Timeline {
            from,
            to,
            limit,
            trips,
        } => {
            let mut history = profile.history.clone();
            for trip in trips {
                tracing::debug!(start = %trip.start(), end = %trip.end(), "adding planned trip");
                history.commit(trip);
            }
            let points =
                timeline(&history, from, to, limit).context("Failed to build timeline")?;
            if cli.json {
                return print_json(&points);
            }

            println!("date,location,used,remaining");
            for point in &points {
                println!(
                    "{},{},{},{}",
                    point.date,
                    profile.location_label(point.location),
                    point.used,
                    point.remaining
                );
            }
        }
        Commands::Audit => {
            let report = AuditReport {
                intervals: profile.history.len(),
                totals: totals_by_country(&profile.history, None, None),
                issues: audit_history(&profile.history),
            };
            if cli.json {
                return print_json(&report);
            }

            println!("Intervals:   {}", report.intervals);
            println!(
                "{}: {} days",
                profile.restricted_country, report.totals.restricted
            );
            println!("Elsewhere:   {} days", report.totals.other);
            if report.issues.is_empty() {
                println!("No gaps or overlaps");
            }
            for issue in &report.issues {
                println!("{}", describe_issue(&profile, issue));
            }
        }
    }

    Ok(())
}

/// Buffer from the command line, falling back to the profile's setting.
fn buffer_policy(profile: &Profile, buffer: Option<u32>) -> BufferPolicy {
    BufferPolicy::new(buffer.unwrap_or(profile.buffer_days))
}

/// Evaluate a trip of `duration` days from `start`.
fn evaluate_duration(
    history: &[Interval],
    start: NaiveDate,
    duration: u32,
    limit: u32,
    policy: BufferPolicy,
) -> Result<AlternativeReport> {
    let trip = PlannedTrip::starting(start, duration)
        .with_context(|| format!("Invalid {duration}-day alternative"))?;
    let evaluation = evaluate_alternative(history, &trip, limit, policy)
        .with_context(|| format!("Failed to evaluate {duration}-day alternative"))?;
    Ok(AlternativeReport {
        duration,
        trip_end: trip.end(),
        evaluation,
    })
}

/// Parse a `START..END` trip argument.
fn parse_trip(value: &str) -> std::result::Result<PlannedTrip, String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{value}'"))?;
    let start: NaiveDate = start
        .parse()
        .map_err(|err| format!("invalid start date '{start}': {err}"))?;
    let end: NaiveDate = end
        .parse()
        .map_err(|err| format!("invalid end date '{end}': {err}"))?;
    PlannedTrip::new(start, end).map_err(|err| err.to_string())
}

fn describe_issue(profile: &Profile, issue: &HistoryIssue) -> String {
    match issue {
        HistoryIssue::Gap { from, to, days } => {
            format!("GAP: {} days from {} to {}", days, from, to)
        }
        HistoryIssue::Overlap {
            first,
            second,
            days,
        } => format!(
            "OVERLAP: {} days shared by {} {}..{} and {} {}..{}",
            days,
            profile.location_label(first.country()),
            first.start(),
            first.end(),
            profile.location_label(second.country()),
            second.start(),
            second.end()
        ),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
