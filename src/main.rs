/// A CLI to seed curriculum lessons with exercise, question, and reward content.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute. If no command is given, help is shown.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seeds a lesson from a content bank JSON file in the ./banks/ directory.
    Seed {
        /// The bank file name inside ./banks/.
        #[arg(long)]
        bank: String,

        /// Overrides the lesson id declared in the bank file.
        #[arg(long)]
        lesson_id: Option<i64>,

        /// Locates the lesson by title fragment(s) instead of by id. May be
        /// repeated; the lookup must resolve to exactly one lesson.
        #[arg(long = "match-title")]
        match_title: Vec<String>,

        /// Narrows a title lookup to one grade.
        #[arg(long)]
        grade: Option<i64>,

        /// Narrows a title lookup to one cycle.
        #[arg(long)]
        cycle: Option<String>,

        /// Deletes the lesson's existing exercises (and their questions,
        /// choices, and rewards) before seeding.
        #[arg(long)]
        delete_existing: bool,

        /// How per-question points are decided.
        #[arg(long, value_enum, default_value_t = PointsPolicy::Difficulty)]
        points: PointsPolicy,

        /// Which reward schedule to apply.
        #[arg(long, value_enum, default_value_t = RewardPolicy::Simple)]
        rewards: RewardPolicy,

        /// Issues unwrapped sequential writes instead of one transaction.
        #[arg(long)]
        best_effort: bool,

        /// Author id recorded on created exercises. Falls back to the
        /// SEEDBANK_AUTHOR_ID environment variable.
        #[arg(long)]
        created_by: Option<i64>,
    },

    /// Generates exercises for lessons that have none, via the OpenAI API
    /// with a per-subject fallback template.
    Generate {
        /// API key; falls back to the OPENAI_API_KEY environment variable.
        #[arg(long)]
        api_key: Option<String>,

        /// Model name to request.
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,

        /// Maximum number of lessons to fill in one run.
        #[arg(long, default_value_t = 10)]
        batch_size: i64,

        /// First lesson id of the scan range.
        #[arg(long, default_value_t = 1)]
        start_id: i64,

        /// Last lesson id of the scan range.
        #[arg(long, default_value_t = 999_999)]
        end_id: i64,

        /// Only fill lessons of this subject.
        #[arg(long)]
        subject: Option<String>,

        /// Only fill lessons of this grade.
        #[arg(long)]
        grade: Option<i64>,

        /// Shows what would be created without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Prints a line per processed lesson.
        #[arg(long, short)]
        verbose: bool,

        /// Fixed pause between API requests, in seconds.
        #[arg(long, default_value_t = 0.0)]
        delay: f64,

        /// Which reward schedule to apply to generated exercises.
        #[arg(long, value_enum, default_value_t = RewardPolicy::Simple)]
        rewards: RewardPolicy,

        /// Author id recorded on created exercises. Falls back to the
        /// SEEDBANK_AUTHOR_ID environment variable.
        #[arg(long)]
        created_by: Option<i64>,
    },

    /// Shows the seeded content of a lesson, one line per exercise.
    Report {
        /// The lesson id to report on.
        #[arg(long)]
        lesson_id: i64,
    },
}

/// Resolves the content author id from the flag or the environment.
/// There is deliberately no baked-in default.
fn resolve_created_by(flag: Option<i64>) -> Option<i64> {
    flag.or_else(|| {
        std::env::var("SEEDBANK_AUTHOR_ID")
            .ok()
            .and_then(|v| v.parse().ok())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- Database Setup ---
    let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:seedbank.db".into());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(
            db_url
                .parse::<sqlx::sqlite::SqliteConnectOptions>()?
                .create_if_missing(true),
        )
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // --- Parse CLI commands ---
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Commands::Seed {
                bank,
                lesson_id,
                match_title,
                grade,
                cycle,
                delete_existing,
                points,
                rewards,
                best_effort,
                created_by,
            } => {
                println!("\n--- Starting Lesson Seeding ---");

                let bank_data = match content_bank::load_bank(&bank) {
                    Ok(bank_data) => bank_data,
                    Err(e) => {
                        let outcome = SeedOutcome::InvalidContent(format!("{:#}", e));
                        outcome.report();
                        return Ok(ExitCode::from(outcome.exit_code()));
                    }
                };

                let Some(created_by) = resolve_created_by(created_by) else {
                    let outcome = SeedOutcome::InvalidContent(
                        "no content author configured; pass --created-by or set SEEDBANK_AUTHOR_ID"
                            .to_string(),
                    );
                    outcome.report();
                    return Ok(ExitCode::from(outcome.exit_code()));
                };

                let target = if match_title.is_empty() {
                    LessonTarget::ById(lesson_id.unwrap_or(bank_data.lesson_id))
                } else {
                    LessonTarget::ByTitle {
                        fragments: match_title,
                        grade,
                        cycle,
                    }
                };

                let opts = SeedOptions {
                    delete_existing,
                    points,
                    rewards,
                    atomic: !best_effort,
                    created_by,
                };
                let outcome = seeder::run(&pool, &target, &bank_data, &opts).await;
                outcome.report();
                if outcome.exit_code() == 0 {
                    println!("--- Seeding Finished ---");
                }
                return Ok(ExitCode::from(outcome.exit_code()));
            }
            Commands::Generate {
                api_key,
                model,
                batch_size,
                start_id,
                end_id,
                subject,
                grade,
                dry_run,
                verbose,
                delay,
                rewards,
                created_by,
            } => {
                println!("\n--- Starting Exercise Generation ---");

                let Some(created_by) = resolve_created_by(created_by) else {
                    let outcome = SeedOutcome::InvalidContent(
                        "no content author configured; pass --created-by or set SEEDBANK_AUTHOR_ID"
                            .to_string(),
                    );
                    outcome.report();
                    return Ok(ExitCode::from(outcome.exit_code()));
                };

                let opts = GenerateOptions {
                    api_key,
                    model,
                    batch_size,
                    start_id,
                    end_id,
                    subject,
                    grade,
                    dry_run,
                    verbose,
                    delay,
                    created_by,
                    rewards,
                };
                match generator::run_generate(&pool, &opts).await {
                    Ok(report) => {
                        println!(
                            "Processed {} lessons: {} generated, {} from fallback templates.",
                            report.lessons, report.generated, report.fallbacks
                        );
                        if !dry_run {
                            println!(
                                "Created {} exercises, {} questions, {} choices, {} rewards.",
                                report.summary.exercises,
                                report.summary.questions,
                                report.summary.choices,
                                report.summary.rewards
                            );
                        }
                        println!("--- Generation Finished ---");
                    }
                    Err(e) => {
                        eprintln!("Error during generation: {:#}", e);
                        return Ok(ExitCode::from(1));
                    }
                }
            }
            Commands::Report { lesson_id } => {
                let lesson = match db::locate_lesson_by_id(&pool, lesson_id).await? {
                    LessonLookup::Found(lesson) => lesson,
                    LessonLookup::NotFound(msg) => {
                        eprintln!("Error: {}", msg);
                        return Ok(ExitCode::from(2));
                    }
                };

                println!("\n--- Content of lesson {} ---", lesson.label());
                let rows = db::exercise_report(&pool, lesson_id).await?;
                if rows.is_empty() {
                    println!("No exercises seeded yet. Use the 'seed' command to add some.");
                } else {
                    for row in &rows {
                        println!(
                            "  {}. {:<40} {:<12} {} questions, {} choices, {} pts",
                            row.order,
                            row.title,
                            row.difficulty_level.as_str(),
                            row.question_count,
                            row.choice_count,
                            row.completion_points
                        );
                    }
                    let (exercises, questions, choices, rewards) =
                        db::lesson_content_counts(&pool, lesson_id).await?;
                    println!(
                        "\nTotals: {} exercises, {} questions, {} choices, {} rewards.",
                        exercises, questions, choices, rewards
                    );
                }
            }
        }
    } else {
        // If no command was given, print help.
        Cli::parse_from(["", "--help"]);
    }

    Ok(ExitCode::SUCCESS)
}

pub mod content_bank;
pub mod db;
pub mod exercises;
pub mod generator;
pub mod lessons;
pub mod outcome;
pub mod rewards;
pub mod seeder;

use crate::content_bank::PointsPolicy;
use crate::db::{LessonLookup, LessonTarget};
use crate::generator::GenerateOptions;
use crate::outcome::SeedOutcome;
use crate::rewards::RewardPolicy;
use crate::seeder::SeedOptions;
use clap::Parser;
use clap::Subcommand;
use sqlx::sqlite::SqlitePoolOptions;
use std::process::ExitCode;
