use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod db;
mod error;
mod metrics;
mod models;
mod ranking;
mod report;

#[derive(Parser)]
#[command(name = "orthosim-leaderboard")]
#[command(about = "Trainee performance leaderboard for OrthoSim VR surgery training", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import simulator attempt exports from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the cohort leaderboard and persist the ranks
    #[command(group(
        ArgGroup::new("scope")
            .args(["mentor", "trainee"])
            .required(true)
            .multiple(false)
    ))]
    Rank {
        #[arg(long)]
        mentor: Option<String>,
        #[arg(long)]
        trainee: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Summarize cohort activity
    #[command(group(
        ArgGroup::new("scope")
            .args(["mentor", "trainee"])
            .required(true)
            .multiple(false)
    ))]
    Stats {
        #[arg(long)]
        mentor: Option<String>,
        #[arg(long)]
        trainee: Option<String>,
    },
    /// Show the latest attempts across a mentor's trainees
    Recent {
        #[arg(long)]
        mentor: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["mentor", "trainee"])
            .required(true)
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        mentor: Option<String>,
        #[arg(long)]
        trainee: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attempts from {}.", csv.display());
        }
        Commands::Rank {
            mentor,
            trainee,
            limit,
            json,
        } => {
            let scope = db::resolve_scope(&pool, mentor.as_deref(), trainee.as_deref()).await?;
            let cohort = db::fetch_cohort(&pool, &scope).await?;
            let ranked = ranking::rank_cohort(&cohort);

            let persisted = db::persist_rankings(&pool, &ranked).await;
            info!(persisted, ranked = ranked.len(), "leaderboard ranks persisted");

            if ranked.is_empty() {
                println!("No ranked trainees for this cohort yet.");
                return Ok(());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                let now = Utc::now();
                println!("Leaderboard for {}:", scope.label);
                for entry in ranked.iter().take(limit) {
                    println!(
                        "{:>2}. {} ({}) best {} avg {} across {} attempts, trend {}, last active {}",
                        entry.rank,
                        entry.trainee.name,
                        entry.trainee.email,
                        report::format_score(entry.metrics.best_score),
                        report::format_average(entry.metrics.average_score),
                        entry.metrics.total_attempts,
                        report::format_improvement(entry.metrics.improvement_rate),
                        report::last_activity_label(entry.metrics.last_activity, now)
                    );
                }
            }
        }
        Commands::Stats { mentor, trainee } => {
            let scope = db::resolve_scope(&pool, mentor.as_deref(), trainee.as_deref()).await?;
            let cohort = db::fetch_cohort(&pool, &scope).await?;
            let stats = report::cohort_stats(&cohort);

            println!("Cohort statistics for {}:", scope.label);
            println!(
                "- Trainees: {} ({} active)",
                stats.total_trainees, stats.active_trainees
            );
            println!(
                "- Attempts: {} recorded, {} completed",
                stats.total_attempts, stats.completed_attempts
            );
            println!(
                "- Average score: {}",
                report::format_average(stats.average_score)
            );
            println!(
                "- Training time: {}",
                report::format_training_time(stats.total_training_secs)
            );
        }
        Commands::Recent { mentor, limit } => {
            let scope = db::resolve_scope(&pool, Some(mentor.as_str()), None).await?;
            let attempts = db::fetch_recent_attempts(&pool, &scope, limit).await?;

            if attempts.is_empty() {
                println!("No attempts recorded yet.");
                return Ok(());
            }

            println!("Latest attempts for {}:", scope.label);
            for attempt in attempts.iter() {
                let status = if attempt.is_completed {
                    "completed"
                } else {
                    "abandoned"
                };
                println!(
                    "- {} scored {} on {} ({})",
                    attempt.trainee_name,
                    attempt.score,
                    attempt.attempt_date.date_naive(),
                    status
                );
            }
        }
        Commands::Report {
            mentor,
            trainee,
            out,
        } => {
            let scope = db::resolve_scope(&pool, mentor.as_deref(), trainee.as_deref()).await?;
            let cohort = db::fetch_cohort(&pool, &scope).await?;
            let report = report::build_report(&scope.label, &cohort, Utc::now());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
