use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use recruiting_advisor::batch;
use recruiting_advisor::config::Settings;
use recruiting_advisor::context::RuleContext;
use recruiting_advisor::db::{self, PgStore};
use recruiting_advisor::engine::{SuggestionEngine, SurfacedSuggestions};
use recruiting_advisor::fit::{self, ProfileDimensions};
use recruiting_advisor::matching::{DivisionDatabase, MatchingCache};
use recruiting_advisor::models::{
    Interaction, InteractionDirection, PriorityTier, TargetSchool, TaskStatus, Video,
};
use recruiting_advisor::report;
use recruiting_advisor::rules::CompletedAction;
use recruiting_advisor::status::{calculate_status, StatusSignals};
use recruiting_advisor::store::Store;
use recruiting_advisor::tasks::TaskChecklist;

#[derive(Parser)]
#[command(name = "recruiting-advisor")]
#[command(about = "Recruiting progress scoring and next-step suggestions for student athletes", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import coach interactions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show an athlete's composite status score
    Status {
        #[arg(long)]
        athlete: Uuid,
    },
    /// Evaluate and show the top suggestions
    Suggest {
        #[arg(long)]
        athlete: Uuid,
        /// Pull suggestions that have not been shown yet
        #[arg(long)]
        more: bool,
    },
    /// Dismiss a suggestion
    Dismiss {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        suggestion: Uuid,
    },
    /// Mark a suggestion as done
    Complete {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        suggestion: Uuid,
    },
    /// Change a checklist task's status
    Task {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        task: Uuid,
        #[arg(long)]
        status: String,
    },
    /// Record a coach interaction
    LogInteraction {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        school: Option<Uuid>,
        #[arg(long)]
        coach: Option<String>,
        #[arg(long = "type")]
        interaction_type: Option<String>,
        #[arg(long, default_value = "outbound")]
        direction: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Add a target school, resolving its division from a reference list
    AddSchool {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "c")]
        tier: String,
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// Record a newly uploaded highlight video
    AddVideo {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
    },
    /// Mark an upcoming recruiting event as registered
    RegisterEvent {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        event: Uuid,
    },
    /// Update an athlete's GPA
    UpdateGpa {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long)]
        gpa: f64,
    },
    /// Recompute fit scores for every target school
    RecomputeFit {
        #[arg(long)]
        athlete: Uuid,
    },
    /// Re-evaluate suggestions for every athlete
    Batch {
        #[arg(long)]
        token: Option<String>,
    },
    /// Resolve school names against a reference division list
    Match {
        #[arg(long)]
        reference: PathBuf,
        #[arg(long = "name", required = true)]
        names: Vec<String>,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        athlete: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect(settings: &Settings) -> anyhow::Result<PgStore> {
    let database_url = settings
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(PgStore::new(pool))
}

fn print_suggestions(surfaced: &SurfacedSuggestions) {
    if surfaced.suggestions.is_empty() {
        println!("Nothing to suggest right now.");
        return;
    }
    for suggestion in &surfaced.suggestions {
        println!(
            "- [{}] {} ({}, id {})",
            suggestion.urgency, suggestion.message, suggestion.action_type, suggestion.id
        );
    }
    if surfaced.remaining > 0 {
        println!("{} more available with --more.", surfaced.remaining);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recruiting_advisor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;

    if let Commands::Match { reference, names } = &cli.command {
        let cache = MatchingCache::new(DivisionDatabase::from_csv(reference)?);
        for name in names {
            match cache.lookup(name) {
                Some(found) => println!(
                    "{name}: {} ({})",
                    found.division,
                    found.conference.as_deref().unwrap_or("independent")
                ),
                None => println!("{name}: no match"),
            }
        }
        return Ok(());
    }

    let store = connect(&settings).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&store).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let outcome = db::import_csv(&store, &csv).await?;
            let triggered = engine.after_interactions(&store, &outcome.inserted).await?;
            println!(
                "Inserted {} interactions from {} ({} duplicates skipped). {} suggestions completed, {} new.",
                outcome.inserted.len(),
                csv.display(),
                outcome.skipped,
                triggered.completed + triggered.resolved,
                triggered.created
            );
        }
        Commands::Status { athlete } => {
            let ctx = RuleContext::load(&store, athlete, Utc::now()).await?;
            let status = calculate_status(&StatusSignals::from_context(&ctx));
            println!(
                "{}: {} / 100 ({}, {})",
                ctx.athlete.full_name, status.score, status.label, status.color
            );
            println!("{}", status.label.advice());
            if let Some(phase) = ctx.athlete.phase() {
                for action in status.label.next_actions(phase) {
                    println!("- {action}");
                }
            }
        }
        Commands::Suggest { athlete, more } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let surfaced = if more {
                engine
                    .pull_next(&store, athlete, engine.config().surface_limit)
                    .await?
            } else {
                engine.refresh(&store, athlete).await?;
                engine.surface(&store, athlete).await?
            };
            print_suggestions(&surfaced);
        }
        Commands::Dismiss {
            athlete,
            suggestion,
        } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let dismissed = engine.dismiss(&store, athlete, suggestion).await?;
            println!("Dismissed: {}", dismissed.message);
        }
        Commands::Complete {
            athlete,
            suggestion,
        } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let completed = engine.complete(&store, athlete, suggestion).await?;
            println!("Completed: {}", completed.message);
        }
        Commands::Task {
            athlete,
            task,
            status,
        } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let new_status = TaskStatus::parse(&status)
                .with_context(|| format!("unknown task status {status}"))?;
            let mut checklist = TaskChecklist::load(&store, athlete).await?;
            checklist
                .update_status(&store, task, new_status, engine.now())
                .await?;

            if new_status == TaskStatus::Completed {
                engine
                    .after_mutation(&store, athlete, &CompletedAction::TaskCompleted { task_id: task })
                    .await?;
            } else {
                engine.refresh(&store, athlete).await?;
            }
            let newly_open = checklist
                .definitions()
                .into_iter()
                .filter(|definition| definition.dependency_task_ids.contains(&task))
                .filter(|definition| !checklist.is_locked(definition.id))
                .count();
            println!("Task set to {new_status}. {newly_open} dependent tasks are unlocked.");
        }
        Commands::LogInteraction {
            athlete,
            school,
            coach,
            interaction_type,
            direction,
            notes,
        } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let direction = InteractionDirection::parse(&direction)
                .with_context(|| format!("unknown interaction direction {direction}"))?;
            if store.athlete(athlete).await?.is_none() {
                bail!("athlete {athlete} not found");
            }

            let interaction = Interaction {
                id: Uuid::new_v4(),
                athlete_id: athlete,
                school_id: school,
                coach_name: coach,
                interaction_type,
                direction,
                occurred_at: engine.now(),
                notes,
            };
            store.insert_interaction(&interaction).await?;
            let outcome = engine
                .after_mutation(&store, athlete, &CompletedAction::from(&interaction))
                .await?;
            println!(
                "Interaction logged. {} suggestions completed, {} new.",
                outcome.completed, outcome.created
            );
        }
        Commands::AddSchool {
            athlete,
            name,
            tier,
            reference,
        } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let priority_tier =
                PriorityTier::parse(&tier).with_context(|| format!("unknown priority tier {tier}"))?;
            let found = match reference {
                Some(path) => MatchingCache::new(DivisionDatabase::from_csv(&path)?).lookup(&name),
                None => None,
            };
            if store.athlete(athlete).await?.is_none() {
                bail!("athlete {athlete} not found");
            }

            let school = TargetSchool {
                id: Uuid::new_v4(),
                athlete_id: athlete,
                name,
                priority_tier: Some(priority_tier),
                division: found.as_ref().map(|found| found.division),
                conference: found.and_then(|found| found.conference),
                interest_level: None,
                average_gpa: None,
                roster_needs: Vec::new(),
                region: None,
                fit: None,
            };
            store.save_school(&school).await?;
            fit::recompute_all(&store, &ProfileDimensions, athlete).await?;
            engine
                .after_mutation(&store, athlete, &CompletedAction::SchoolAdded)
                .await?;
            match school.division {
                Some(division) => println!("Added {} ({division}).", school.name),
                None => println!("Added {} (division unknown).", school.name),
            }
        }
        Commands::AddVideo {
            athlete,
            title,
            url,
        } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            if store.athlete(athlete).await?.is_none() {
                bail!("athlete {athlete} not found");
            }
            store
                .save_video(&Video {
                    id: Uuid::new_v4(),
                    athlete_id: athlete,
                    title,
                    url,
                    uploaded_at: engine.now(),
                })
                .await?;
            engine
                .after_mutation(&store, athlete, &CompletedAction::VideoUploaded)
                .await?;
            println!("Video saved.");
        }
        Commands::RegisterEvent { athlete, event } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let mut registered = store
                .events(athlete)
                .await?
                .into_iter()
                .find(|candidate| candidate.id == event)
                .with_context(|| format!("event {event} not found"))?;
            registered.registered = true;
            store.save_event(&registered).await?;
            engine
                .after_mutation(&store, athlete, &CompletedAction::EventRegistered { event_id: event })
                .await?;
            println!("Registered for {}.", registered.name);
        }
        Commands::UpdateGpa { athlete, gpa } => {
            if !(0.0..=5.0).contains(&gpa) {
                bail!("GPA must be between 0.0 and 5.0");
            }
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let mut profile = store
                .athlete(athlete)
                .await?
                .with_context(|| format!("athlete {athlete} not found"))?;
            profile.gpa = Some(gpa);
            store.save_athlete(&profile).await?;
            fit::recompute_all(&store, &ProfileDimensions, athlete).await?;
            engine
                .after_mutation(&store, athlete, &CompletedAction::ProfileUpdated)
                .await?;
            println!("GPA updated to {gpa:.2}.");
        }
        Commands::RecomputeFit { athlete } => {
            let summary = fit::recompute_all(&store, &ProfileDimensions, athlete).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            for failure in &summary.failures {
                println!("- {}: {}", failure.id, failure.reason);
            }
        }
        Commands::Batch { token } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let expected = settings.batch_token.as_deref().unwrap_or_default();
            let summary = batch::run_scheduled(&store, &engine, token.as_deref(), expected).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Report { athlete, out } => {
            let engine = SuggestionEngine::new(settings.engine_config()?);
            let ctx = RuleContext::load(&store, athlete, engine.now()).await?;
            let status = calculate_status(&StatusSignals::from_context(&ctx));
            let active = engine.active(&store, athlete).await?;
            let checklist = TaskChecklist::from_context(&ctx);
            let report = report::build_report(
                &ctx.athlete,
                &status,
                &active,
                &checklist,
                &ctx.schools,
                ctx.now.date_naive(),
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Match { .. } => {}
    }

    Ok(())
}
