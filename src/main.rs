use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use eduspark_progress_analytics::models::StudentInfo;
use eduspark_progress_analytics::store::{AssessmentStore, MemoryStore};
use eduspark_progress_analytics::{db, recorder, report};

#[derive(Parser)]
#[command(name = "eduspark-progress-analytics")]
#[command(about = "Progress analytics for EduSpark learning sessions", long_about = None)]
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
    /// Import activity records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Replay a student's sessions and print their formative assessments
    Assess {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a progress report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Print the report as JSON to stdout instead of writing markdown
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Replays stored sessions through the recorder into an in-memory store.
/// Sessions that fail validation are logged and skipped so one bad import
/// cannot block reporting.
async fn hydrate_student(
    pool: &sqlx::PgPool,
    email: &str,
) -> anyhow::Result<(db::StudentRow, MemoryStore)> {
    let student = db::fetch_students(pool, Some(email))
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("no student with email {email}"))?;

    let sessions = db::fetch_sessions(pool, student.id, None).await?;
    let mut store = MemoryStore::new();
    for session in sessions {
        let session_id = session.id;
        if let Err(err) = recorder::record_session(&mut store, session) {
            tracing::warn!(error = %err, %session_id, "skipping stored session");
        }
    }
    Ok((student, store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
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
            println!("Inserted {inserted} activities from {}.", csv.display());
        }
        Commands::Assess { email, limit } => {
            let (student, store) = hydrate_student(&pool, &email).await?;
            let mut assessments = store.assessments_for(student.id);
            if assessments.is_empty() {
                println!("No sessions recorded for {email}.");
                return Ok(());
            }
            assessments.sort_by(|a, b| {
                let gap_a = a.target_level - a.current_level;
                let gap_b = b.target_level - b.current_level;
                gap_b.partial_cmp(&gap_a).unwrap_or(std::cmp::Ordering::Equal)
            });

            println!("Skills for {} by gap to target:", student.full_name);
            for assessment in assessments.iter().take(limit) {
                println!("- {}", report::generate_assessment_summary(assessment));
            }

            let insight = recorder::build_insight(&store, student.id);
            println!(
                "Recent performance {:.1}, engagement {}, learning velocity {:+.2}/week",
                insight.performance_average,
                insight.engagement.as_str(),
                insight.learning_velocity
            );
            for recommendation in &insight.recommendations {
                println!("  * {recommendation}");
            }
        }
        Commands::Report { email, out, json } => {
            let (student, store) = hydrate_student(&pool, &email).await?;
            let today = chrono::Utc::now().date_naive();
            let info = StudentInfo {
                id: student.id,
                full_name: student.full_name.clone(),
                age: student.age_on(today),
            };
            let comprehensive = report::build_report(&store, &info);
            if json {
                println!("{}", serde_json::to_string_pretty(&comprehensive)?);
            } else {
                std::fs::write(&out, report::render_markdown(&comprehensive))?;
                println!("Report written to {}.", out.display());
            }
        }
    }

    Ok(())
}
