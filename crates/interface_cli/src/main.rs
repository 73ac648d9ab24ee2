//! generate-bills - batch bill generation for a billing cycle
//!
//! Idempotent under `--skip-existing`: re-running for the same period only
//! creates records for students added since the last run. Exits 0 with a
//! created-count summary on success, non-zero with a per-student error list
//! on partial failure.
//!
//! # Usage
//!
//! ```bash
//! generate-bills --year 2024/2025 --term 1 --skip-existing
//! generate-bills --year 2024/2025 --term 1 \
//!     --class-levels JHS_1,JHS_2 --due-date 2024-09-30 --notes "Term 1 fees"
//! ```
//!
//! # Environment Variables
//!
//! * `DATABASE_URL` / `LEDGER_DATABASE_URL` - PostgreSQL connection string
//! * `LEDGER_LOG_LEVEL` / `RUST_LOG` - log level (default: info)

mod config;

use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::{AcademicPeriod, AcademicYear, Actor, ClassLevel, Term};
use domain_discount::DiscountEngine;
use domain_ledger::{ChargeGenerator, GenerationRequest, GenerationSummary};
use infra_db::{
    create_pool_from_url, PgCatalogRepository, PgCreditRepository, PgLedgerRepository,
    PgRosterRepository,
};

use crate::config::CliConfig;

/// Days until the due date when none is given
const DEFAULT_DUE_DAYS: u64 = 14;

#[derive(Debug, Parser)]
#[command(
    name = "generate-bills",
    about = "Generate term bills for active students",
    version
)]
struct Cli {
    /// Academic year in the form YYYY/YYYY
    #[arg(long)]
    year: String,

    /// Term number (1-3)
    #[arg(long)]
    term: u8,

    /// Restrict to class levels (comma-separated codes, e.g. JHS_1,JHS_2)
    #[arg(long, value_delimiter = ',')]
    class_levels: Vec<String>,

    /// Payment due date (YYYY-MM-DD); defaults to 14 days from today
    #[arg(long)]
    due_date: Option<NaiveDate>,

    /// Notes copied onto every generated bill
    #[arg(long, default_value = "")]
    notes: String,

    /// Skip students who already have a bill for the period
    #[arg(long)]
    skip_existing: bool,
}

impl Cli {
    fn generation_request(&self, today: NaiveDate) -> anyhow::Result<GenerationRequest> {
        let year = AcademicYear::parse(&self.year)
            .with_context(|| format!("invalid --year '{}'", self.year))?;
        let term = Term::new(self.term).with_context(|| format!("invalid --term {}", self.term))?;

        let class_levels = self
            .class_levels
            .iter()
            .map(|code| {
                ClassLevel::from_str(code)
                    .with_context(|| format!("invalid --class-levels entry '{}'", code))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let due_date = match self.due_date {
            Some(date) => date,
            None => today
                .checked_add_days(Days::new(DEFAULT_DUE_DAYS))
                .context("due date out of range")?,
        };

        Ok(GenerationRequest {
            period: AcademicPeriod::new(year, term),
            class_levels,
            due_date,
            notes: self.notes.clone(),
            skip_existing: self.skip_existing,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = CliConfig::load();
    init_tracing(&config.log_level);

    match run(cli, config).await {
        Ok(summary) => report(&summary),
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: CliConfig) -> anyhow::Result<GenerationSummary> {
    let today = Local::now().date_naive();
    let request = cli.generation_request(today)?;

    tracing::info!(
        period = %request.period,
        skip_existing = request.skip_existing,
        "starting bill generation run"
    );

    let pool = create_pool_from_url(&config.database_url)
        .await
        .context("connecting to database")?;

    let roster = Arc::new(PgRosterRepository::new(pool.clone()));
    let catalog = Arc::new(PgCatalogRepository::new(pool.clone()));
    let credits = Arc::new(PgCreditRepository::new(pool.clone()));
    let ledger = Arc::new(PgLedgerRepository::new(pool));

    let discounts = DiscountEngine::new(roster.clone(), credits);
    let generator = ChargeGenerator::new(roster, catalog, ledger, discounts);

    let summary = generator
        .generate_bills_for_period(&request, &Actor::system(), today)
        .await
        .context("bill generation failed")?;

    Ok(summary)
}

/// Prints the run summary; non-zero exit when any student failed
fn report(summary: &GenerationSummary) -> ExitCode {
    println!(
        "created {} bill(s), skipped {} existing, {} student(s) without applicable categories",
        summary.created, summary.skipped, summary.without_categories
    );

    if summary.is_complete() {
        return ExitCode::SUCCESS;
    }

    eprintln!("{} student(s) failed:", summary.failures.len());
    for failure in &summary.failures {
        eprintln!("  {}: {}", failure.student_id, failure.reason);
    }
    ExitCode::FAILURE
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    #[test]
    fn test_parses_full_invocation() {
        let cli = Cli::parse_from([
            "generate-bills",
            "--year",
            "2024/2025",
            "--term",
            "1",
            "--class-levels",
            "JHS_1,JHS_2",
            "--due-date",
            "2024-09-30",
            "--skip-existing",
        ]);

        let request = cli.generation_request(today()).unwrap();
        assert_eq!(request.period.to_string(), "2024/2025 Term 1");
        assert_eq!(
            request.class_levels,
            vec![ClassLevel::Jhs1, ClassLevel::Jhs2]
        );
        assert_eq!(
            request.due_date,
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
        );
        assert!(request.skip_existing);
    }

    #[test]
    fn test_due_date_defaults_two_weeks_out() {
        let cli = Cli::parse_from(["generate-bills", "--year", "2024/2025", "--term", "2"]);
        let request = cli.generation_request(today()).unwrap();
        assert_eq!(
            request.due_date,
            NaiveDate::from_ymd_opt(2024, 9, 15).unwrap()
        );
        assert!(!request.skip_existing);
        assert!(request.class_levels.is_empty());
    }

    #[test]
    fn test_rejects_malformed_period() {
        let cli = Cli::parse_from(["generate-bills", "--year", "2024-2025", "--term", "1"]);
        assert!(cli.generation_request(today()).is_err());

        let cli = Cli::parse_from(["generate-bills", "--year", "2024/2025", "--term", "9"]);
        assert!(cli.generation_request(today()).is_err());
    }
}
