use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod agent;
mod config;
mod engine;
mod error;
mod generator;
mod roadmap;
mod store;

use agent::{AgentOrchestrator, AgentRunner};
use generator::{ContentGenerator, LlmGenerator};
use roadmap::RoadmapService;
use store::Store;

/// EduAgent - adaptive learning agent
/// Watches learner state, decides the next pedagogical action, and
/// generates lessons, quizzes, and flashcards on a day-by-day roadmap
#[derive(Parser)]
#[command(name = "eduagent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Adaptive learning agent and roadmap engine", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory, database, and default config
    Init,

    /// Run the agent loop until interrupted
    Run,

    /// Run a single agent cycle and exit
    Tick,

    /// Show store counts and configuration
    Status,

    /// Insert sample learners for local experimentation
    Seed,

    /// Submit scored quiz results for a learner
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },

    /// Reset everything the agent has learned about a learner
    Forget {
        /// Learner id
        learner: String,
    },

    /// Manage learning roadmaps
    Roadmap {
        #[command(subcommand)]
        action: RoadmapAction,
    },

    /// Inspect and progress roadmap days
    Day {
        #[command(subcommand)]
        action: DayAction,
    },
}

#[derive(Subcommand)]
enum QuizAction {
    /// Record results and act on the engine's follow-up decision
    Submit {
        #[arg(long)]
        learner: String,
        /// Questions answered correctly
        #[arg(long)]
        score: u32,
        /// Total questions in the quiz
        #[arg(long)]
        total: u32,
        /// Topics the learner struggled with (repeatable)
        #[arg(long = "weak")]
        weak_topics: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RoadmapAction {
    /// Generate a full roadmap outline and create its days
    Create {
        /// Learner id the roadmap belongs to
        #[arg(long)]
        learner: String,
        /// Topic to build the curriculum around
        topic: String,
        /// Number of days
        #[arg(long, default_value = "30")]
        days: u32,
        /// Minutes per day
        #[arg(long, default_value = "30")]
        minutes: u32,
    },

    /// List a learner's roadmaps with progress
    List {
        #[arg(long)]
        learner: String,
    },

    /// Show one roadmap and all of its days
    Show { id: String },

    /// Delete a roadmap and every piece of content hanging off it
    Delete { id: String },
}

#[derive(Subcommand)]
enum DayAction {
    /// Show a day and whatever content exists for it
    Show { id: String },

    /// Generate the lesson, quiz, and flashcards for a day
    Generate {
        id: String,
        #[arg(long)]
        learner: String,
    },

    /// Mark a day completed and unlock the next one
    Complete {
        #[arg(long)]
        roadmap: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            let dir = config::data_dir()?;
            store::init(&dir)?;
            println!("Initialized eduagent at {}", dir.display());
        }
        Commands::Run => {
            run_agent().await?;
        }
        Commands::Tick => {
            let (store, cfg) = open_store()?;
            let generator = build_generator(&cfg)?;
            let orchestrator = AgentOrchestrator::new(store, generator);
            let report = orchestrator.step().await;
            println!(
                "Tick finished: {} learners processed, {} errors",
                report.processed,
                report.errors.len()
            );
            for decision in &report.decisions {
                println!("  decision: {}", decision.kind());
            }
            for err in &report.errors {
                eprintln!("  {err}");
            }
            if report.fatal {
                anyhow::bail!("tick failed");
            }
        }
        Commands::Status => {
            let (store, cfg) = open_store()?;
            let (learners, lessons, quizzes, flashcards) = store.content_counts()?;
            let roadmaps = store.roadmap_count()?;
            let flagged = store.find_learners_needing_attention()?.len();
            println!("EduAgent status");
            println!("  Learners:   {learners} ({flagged} flagged)");
            println!("  Roadmaps:   {roadmaps}");
            println!("  Lessons:    {lessons}");
            println!("  Quizzes:    {quizzes}");
            println!("  Flashcards: {flashcards}");
            println!("  Model:      {}", cfg.generator.model);
            println!(
                "  API key:    {}",
                if cfg.api_key().is_some() {
                    "configured"
                } else {
                    "missing (fallback content only)"
                }
            );
        }
        Commands::Quiz { action } => {
            let QuizAction::Submit {
                learner,
                score,
                total,
                weak_topics,
            } = action;
            let (store, cfg) = open_store()?;
            let generator = build_generator(&cfg)?;
            let orchestrator = AgentOrchestrator::new(store, generator);

            let analysis = engine::QuizAnalysis::new(score, total, weak_topics, Vec::new());
            let decision = orchestrator.apply_quiz_results(&learner, &analysis).await?;
            println!(
                "Recorded {score}/{total} ({:.0}%), follow-up: {}",
                analysis.percentage(),
                decision.kind()
            );
        }
        Commands::Forget { learner } => {
            let (store, _cfg) = open_store()?;
            store.reset_memory(&learner)?;
            println!("Cleared agent memory for {learner}");
        }
        Commands::Seed => {
            let (store, _cfg) = open_store()?;
            seed_learners(&store)?;
            println!("Seeded sample learners");
        }
        Commands::Roadmap { action } => {
            let (store, cfg) = open_store()?;
            let generator = build_generator(&cfg)?;
            let service = RoadmapService::new(store, generator);
            match action {
                RoadmapAction::Create {
                    learner,
                    topic,
                    days,
                    minutes,
                } => {
                    let id = service
                        .create_roadmap(&learner, &topic, days, minutes)
                        .await?;
                    println!("Created roadmap {id} ({days} days of {topic})");
                }
                RoadmapAction::List { learner } => {
                    let roadmaps = service.get_user_roadmaps(&learner)?;
                    if roadmaps.is_empty() {
                        println!("No roadmaps for {learner}");
                    }
                    for entry in roadmaps {
                        println!(
                            "{}  {}  [{}] day {}/{} ({}%)",
                            entry.roadmap.id,
                            entry.roadmap.topic,
                            entry.roadmap.status.as_str(),
                            entry.roadmap.current_day.min(entry.roadmap.total_days),
                            entry.roadmap.total_days,
                            entry.progress_percent
                        );
                    }
                }
                RoadmapAction::Show { id } => {
                    let Some((roadmap, days)) = service.get_roadmap_details(&id)? else {
                        anyhow::bail!("roadmap {id} not found");
                    };
                    println!(
                        "{} [{}] {} days, {} min/day",
                        roadmap.topic,
                        roadmap.status.as_str(),
                        roadmap.total_days,
                        roadmap.daily_minutes
                    );
                    for day in days {
                        let marker = match day.status {
                            store::DayStatus::Completed => "x",
                            store::DayStatus::Available => ">",
                            store::DayStatus::Locked => " ",
                        };
                        println!(
                            "  [{marker}] day {:>2}: {} ({})",
                            day.day_number, day.topic, day.id
                        );
                    }
                }
                RoadmapAction::Delete { id } => {
                    service.delete_roadmap(&id).await?;
                    println!("Deleted roadmap {id}");
                }
            }
        }
        Commands::Day { action } => {
            let (store, cfg) = open_store()?;
            let generator = build_generator(&cfg)?;
            let service = RoadmapService::new(store, generator);
            match action {
                DayAction::Show { id } => {
                    let Some(bundle) = service.get_day_with_lesson(&id)? else {
                        anyhow::bail!("day {id} not found");
                    };
                    println!(
                        "Day {} of {} [{}]: {}",
                        bundle.day.day_number,
                        bundle.roadmap.topic,
                        bundle.day.status.as_str(),
                        bundle.day.topic
                    );
                    match bundle.lesson {
                        Some(lesson) => println!(
                            "  Lesson: {} ({} min)",
                            lesson.title, lesson.estimated_minutes
                        ),
                        None => println!("  Lesson: not generated yet"),
                    }
                    if let Some(quiz) = bundle.quiz {
                        println!("  Quiz:   {}", quiz.title);
                    }
                    println!("  Cards:  {}", bundle.flashcards.len());
                }
                DayAction::Generate { id, learner } => {
                    let lesson = service.generate_day_lesson(&id, &learner).await?;
                    println!("Generated: {}", lesson.title);
                }
                DayAction::Complete { roadmap, id } => {
                    let result = service.complete_day(&roadmap, &id).await?;
                    println!("Completed day {}", result.completed_day);
                    if let Some(next) = result.unlocked_day {
                        println!("Unlocked day {next}");
                    }
                    if result.roadmap_completed {
                        println!("Roadmap finished!");
                    }
                }
            }
        }
    }

    Ok(())
}

fn open_store() -> Result<(Arc<Store>, config::Config)> {
    let dir = config::data_dir()?;
    if !dir.exists() {
        anyhow::bail!(
            "data directory {} not found. Run `eduagent init` first.",
            dir.display()
        );
    }
    let store = Store::open(&dir.join("eduagent.sqlite"))?;
    let cfg = config::Config::load(&dir)?;
    Ok((Arc::new(store), cfg))
}

fn build_generator(cfg: &config::Config) -> Result<Arc<dyn ContentGenerator>> {
    let api_key = match cfg.api_key() {
        Some(key) => key,
        None => {
            warn!("no API key configured; generation will use fallback content");
            String::new()
        }
    };
    let generator = LlmGenerator::new(&cfg.generator, api_key)?;
    Ok(Arc::new(generator))
}

/// The always-on agent loop with signal-driven shutdown. The in-flight
/// tick gets a grace period to finish before the process gives up on it.
async fn run_agent() -> Result<()> {
    let (store, cfg) = open_store()?;
    let generator = build_generator(&cfg)?;
    let orchestrator = AgentOrchestrator::new(store, generator);

    let (tx, rx) = agent::runner::shutdown_channel();
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        let _ = tx.send(true);
    })?;

    let grace = Duration::from_secs(cfg.runner.shutdown_grace_secs);
    let mut shutdown = rx.clone();
    let mut runner = AgentRunner::new(orchestrator, cfg.runner, rx);
    let handle = tokio::spawn(async move { runner.run().await });

    // Block until the signal lands, then give the runner its grace period
    let _ = shutdown.changed().await;
    if tokio::time::timeout(grace, handle).await.is_err() {
        warn!("in-flight tick did not finish within grace period");
    }
    info!("eduagent stopped");
    Ok(())
}

/// Sample learners spanning the decision branches, for local testing.
fn seed_learners(store: &Store) -> Result<()> {
    use chrono::{Duration as ChronoDuration, Utc};
    use store::LearnerState;

    let samples = [
        ("alice", "rust ownership", 25.0, 2, vec![55.0, 60.0]),
        ("bob", "python basics", 60.0, 1, vec![75.0, 82.0, 78.0]),
        ("carol", "linear algebra", 92.0, 30, vec![95.0, 98.0]),
    ];

    for (id, topic, mastery, hours_ago, scores) in samples {
        store.upsert_learner(&LearnerState {
            id: id.to_string(),
            current_topic: topic.to_string(),
            mastery_level: mastery,
            last_activity: Utc::now() - ChronoDuration::hours(hours_ago),
            recent_scores: scores,
            needs_attention: true,
        })?;
        store.get_or_create_memory(id)?;
    }
    Ok(())
}
