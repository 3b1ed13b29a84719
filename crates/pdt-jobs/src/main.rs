//! Park Downtime Tracker job runner.
//!
//! One subcommand per scheduled entry point:
//!
//! - `collect` every N minutes (or `run` for an in-process loop)
//! - `aggregate-hourly` at :05 past each hour
//! - `aggregate-daily` after local day end per timezone
//! - `aggregate-weekly` after Monday of each ISO week
//! - `verify` / `detect-anomalies` on demand
//! - `recompute` for backfills
//! - `prune` for snapshot retention
//!
//! Exit code 0 on success, 1 with the reason logged on any fatal error.

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdt_aggregate::{
    DailyAggregator, DailyStatsRecomputer, HourlyAggregator, MonthlyAggregator, WeeklyAggregator,
};
use pdt_audit::{AggregateVerifier, AnomalyDetector};
use pdt_collector::Collector;
use pdt_config::Settings;
use pdt_store::RetentionPruner;
use pdt_time::{iso_week_of, local_date_of, previous_iso_week, previous_month, Clock, SystemClock, PACIFIC};

#[derive(Parser)]
#[command(name = "pdt-jobs", about = "Park downtime tracker jobs", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one collection cycle
    Collect,
    /// Run collection cycles forever at the configured interval
    Run,
    /// Sync the park and ride rosters from the vendor listing
    SyncParks,
    /// Aggregate one completed hour (default: the previous hour)
    AggregateHourly {
        /// Hour to aggregate, YYYY-MM-DD-HH UTC
        #[arg(long)]
        hour: Option<String>,
    },
    /// Aggregate one local calendar day (default: yesterday, Pacific)
    AggregateDaily {
        /// Local date to aggregate, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Restrict to one IANA timezone
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Roll daily rows up into one ISO week (default: the previous week)
    AggregateWeekly {
        #[arg(long, requires = "week")]
        year: Option<i32>,
        #[arg(long, requires = "year")]
        week: Option<u32>,
    },
    /// Roll daily rows up into one calendar month (default: the previous month)
    AggregateMonthly {
        #[arg(long, requires = "month")]
        year: Option<i32>,
        #[arg(long, requires = "year")]
        month: Option<u32>,
    },
    /// Recompute aggregates from raw snapshots and compare under tolerance
    Verify {
        /// Local date to audit, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Run the statistical anomaly detectors over one day
    DetectAnomalies {
        /// Local date to analyze, YYYY-MM-DD (default: yesterday, Pacific)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Recompute a date range of daily stats from raw snapshots
    Recompute {
        #[arg(long)]
        start_date: NaiveDate,
        /// Default: yesterday, Pacific
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Version stamped onto recomputed rows
        #[arg(long, default_value_t = 1)]
        metrics_version: i16,
        /// Preview without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete raw snapshots covered by completed hourly aggregation
    Prune,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,sqlx=warn".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn parse_hour(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(&format!("{value}-00-00"), "%Y-%m-%d-%H-%M-%S")
        .with_context(|| format!("invalid hour {value:?}, expected YYYY-MM-DD-HH"))?;
    Ok(naive.and_utc())
}

fn yesterday_pacific(now: DateTime<Utc>) -> NaiveDate {
    local_date_of(PACIFIC, now) - Duration::days(1)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Job failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    let pool = pdt_store::connect(&settings.database).await?;
    pdt_store::run_migrations(&pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let now = clock.now_utc();
    let interval_minutes = settings.collector.snapshot_interval_minutes;

    match cli.command {
        Command::Collect => {
            let collector = Collector::new(pool, settings.collector.clone(), clock)?;
            let summary = collector.run_cycle().await?;
            info!(
                parks_processed = summary.parks_processed,
                parks_skipped = summary.parks_skipped,
                rides_written = summary.rides_written,
                "Collection cycle finished"
            );
        }
        Command::Run => {
            let collector = Collector::new(pool, settings.collector.clone(), clock)?;
            collector.run_loop().await;
        }
        Command::SyncParks => {
            let collector = Collector::new(pool, settings.collector.clone(), clock)?;
            let (parks, rides) = collector.sync_parks(&settings.scoring).await?;
            info!(parks, rides, "Roster sync finished");
        }
        Command::AggregateHourly { hour } => {
            let target = hour.as_deref().map(parse_hour).transpose()?;
            let aggregator = HourlyAggregator::new(pool, interval_minutes);
            wire_stop_signal(aggregator.stop_flag());
            aggregator.run(target, now).await?;
        }
        Command::AggregateDaily { date, timezone } => {
            let date = date.unwrap_or_else(|| yesterday_pacific(now));
            let aggregator = DailyAggregator::new(pool, interval_minutes);
            wire_stop_signal(aggregator.stop_flag());
            aggregator.run(date, timezone.as_deref()).await?;
        }
        Command::AggregateWeekly { year, week } => {
            let (year, week) = match (year, week) {
                (Some(y), Some(w)) => (y, w),
                _ => {
                    let (y, w) = iso_week_of(local_date_of(PACIFIC, now));
                    previous_iso_week(y, w)
                }
            };
            WeeklyAggregator::new(pool).run(year, week).await?;
        }
        Command::AggregateMonthly { year, month } => {
            let (year, month) = match (year, month) {
                (Some(y), Some(m)) => (y, m),
                _ => {
                    let today = local_date_of(PACIFIC, now);
                    previous_month(today.year(), today.month())
                }
            };
            MonthlyAggregator::new(pool).run(year, month).await?;
        }
        Command::Verify { date } => {
            let verifier = AggregateVerifier::new(pool, interval_minutes);
            let summary = verifier.audit_date(date).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::DetectAnomalies { date } => {
            let date = date.unwrap_or_else(|| yesterday_pacific(now));
            let detector = AnomalyDetector::new(pool);
            let anomalies = detector.detect(date).await?;
            println!("{}", serde_json::to_string_pretty(&anomalies)?);
        }
        Command::Recompute {
            start_date,
            end_date,
            metrics_version,
            dry_run,
        } => {
            let end_date = end_date.unwrap_or_else(|| yesterday_pacific(now));
            if end_date < start_date {
                anyhow::bail!("end date {end_date} precedes start date {start_date}");
            }
            let recomputer =
                DailyStatsRecomputer::new(pool, interval_minutes, metrics_version, dry_run);
            let outcome = recomputer.run(start_date, end_date).await?;
            if outcome.days_failed > 0 {
                anyhow::bail!("{} of {} days failed", outcome.days_failed, outcome.days_processed + outcome.days_failed);
            }
        }
        Command::Prune => {
            let pruner = RetentionPruner::new(pool);
            let (ride_rows, park_rows) = pruner.prune(now).await?;
            info!(ride_rows, park_rows, "Prune finished");
        }
    }

    Ok(())
}

/// Set the aggregator's stop flag on SIGINT so truncated work is recorded as
/// failed with counts preserved, instead of dying mid-write.
fn wire_stop_signal(flag: Arc<std::sync::atomic::AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop signal received; finishing current entity");
            flag.store(true, Ordering::Relaxed);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_hour() {
        let parsed = parse_hour("2025-06-15-17").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 15, 17, 0, 0).unwrap());
        assert!(parse_hour("2025-06-15").is_err());
        assert!(parse_hour("yesterday").is_err());
    }

    #[test]
    fn test_yesterday_pacific_straddles_utc_midnight() {
        // 02:00 UTC on 6/16 is still 19:00 Pacific on 6/15
        let now = Utc.with_ymd_and_hms(2025, 6, 16, 2, 0, 0).unwrap();
        assert_eq!(
            yesterday_pacific(now),
            NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
        );
    }
}
