use spaced_review::models::sm2::{compute_next_state, preview_intervals};
use spaced_review::*;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "review", version, about = "SM-2 review scheduling for flashcards")]
struct Cli {
    /// SQLite database holding card schedules
    #[arg(long, env = "SPACED_REVIEW_DB", default_value = config::DEFAULT_DB_PATH, global = true)]
    db: PathBuf,

    /// How long to wait on a locked database, in milliseconds
    #[arg(long, env = "SPACED_REVIEW_BUSY_TIMEOUT_MS", default_value = "5000", global = true)]
    busy_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a card with a fresh schedule
    Add,

    /// Record a review of a card
    Review {
        card_id: CardId,

        /// Recall quality, 0 (blackout) to 5 (perfect); clamped into range
        #[arg(allow_negative_numbers = true)]
        quality: i32,

        /// Review time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Print a card's schedule
    Show { card_id: CardId },

    /// List cards due for review
    Due {
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Print the interval each quality would give a card
    Preview { card_id: CardId },

    /// Replay a quality sequence from a new card without touching the database
    Simulate {
        #[arg(required = true, allow_negative_numbers = true)]
        qualities: Vec<i32>,
    },
}

#[derive(Serialize)]
struct CardOutput {
    card_id: CardId,
    #[serde(flatten)]
    state: CardSchedulingState,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        StoreConfig::new(cli.db).with_busy_timeout(Duration::from_millis(cli.busy_timeout_ms));
    let open = || -> Result<_, StoreError> { Ok(ReviewApplier::new(SqliteStore::open(&config)?)) };

    match cli.command {
        Commands::Simulate { qualities } => {
            let mut state = CardSchedulingState::default();
            let now = Utc::now();
            let mut steps = Vec::with_capacity(qualities.len());
            for quality in qualities {
                state = compute_next_state(&state, quality, now);
                steps.push(state.clone());
            }
            print_json(&steps)
        }
        Commands::Add => {
            let applier = open()?;
            let card_id = applier.store().create_card()?;
            let state = applier.store().get_scheduling_state(card_id)?.value;
            print_json(&CardOutput { card_id, state })
        }
        Commands::Review {
            card_id,
            quality,
            now,
        } => {
            let applier = open()?;
            let state = applier.submit_review(card_id, quality, now)?;
            print_json(&CardOutput { card_id, state })
        }
        Commands::Show { card_id } => {
            let applier = open()?;
            let state = applier
                .store()
                .get_scheduling_state(card_id)
                .map_err(ReviewError::from)?
                .value;
            print_json(&CardOutput { card_id, state })
        }
        Commands::Due { now } => {
            let applier = open()?;
            let due: Vec<CardOutput> = applier
                .store()
                .due_cards(now.unwrap_or_else(Utc::now))?
                .into_iter()
                .map(|(card_id, state)| CardOutput { card_id, state })
                .collect();
            print_json(&due)
        }
        Commands::Preview { card_id } => {
            let applier = open()?;
            let state = applier
                .store()
                .get_scheduling_state(card_id)
                .map_err(ReviewError::from)?
                .value;
            let intervals = preview_intervals(&state);
            print_json(&serde_json::json!({
                "card_id": card_id,
                "intervals_by_quality": intervals,
            }))
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
