//! `oneframe` command-line front end for the diary store and emotion reports
#![allow(clippy::print_stdout)] // Command output goes to stdout; diagnostics go through tracing

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use oneframe::config::AppConfig;
use oneframe::db::establish_connection;
use oneframe::logging::init_logging;
use oneframe::report::{ChatCompletionClient, REPORT_PLACEHOLDER};
use oneframe::repository::SqliteDiaryRepository;
use oneframe::week::{format_entry_date, today, week_of};
use oneframe::{DiaryEntry, DiaryService, Emotion, NewDiaryEntry};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a new diary entry
    Add {
        /// Entry title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Entry text
        #[arg(short = 'b', long, default_value = "")]
        content: String,

        /// Emotion tag (행복, 슬픔, 기쁨, 분노, 평온, or any label)
        #[arg(short, long, default_value = "")]
        emotion: String,

        /// Path or URI of the day's photo
        #[arg(short, long, default_value = "")]
        image: String,
    },
    /// List all entries
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one entry
    Show {
        /// Entry id
        id: i64,
    },
    /// Delete an entry by id
    Delete {
        /// Entry id
        id: i64,
    },
    /// Undo the most recent save
    Undo,
    /// Emotion distribution across all entries
    Stats {
        /// Print JSON instead of a legend
        #[arg(long)]
        json: bool,
    },
    /// Days of the week that have entries
    Week {
        /// Any day in the week (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// AI emotion report for a week
    Report {
        /// Any day in the week (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// AI emotion analysis of one entry
    Analyze {
        /// Entry id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    let _log_guard = init_logging(&config.logging)?;

    info!("Starting oneframe");

    // Initialize database with configuration
    let db = establish_connection(&config.database).context("Failed to open diary database")?;
    let mut service = DiaryService::new(Arc::new(SqliteDiaryRepository::new(db)));

    if let Some(api_key) = config.api_key() {
        let client = ChatCompletionClient::new(&config.analysis, api_key)?;
        service = service.with_analyst(Arc::new(client));
    } else if matches!(cli.command, Commands::Report { .. } | Commands::Analyze { .. }) {
        warn!("No API key configured; set OPENAI_API_KEY or analysis.api_key");
    }

    // Process command
    match cli.command {
        Commands::Add {
            title,
            content,
            emotion,
            image,
        } => {
            if !emotion.is_empty() && Emotion::from_label(&emotion).is_none() {
                warn!(%emotion, "Emotion is outside the usual vocabulary");
            }
            let saved = service
                .save_entry(NewDiaryEntry::new(title, content, emotion, image))
                .await?;
            println!("Saved entry #{}", saved.id);
        }
        Commands::List { json } => {
            let entries = service.entries().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No diary entries yet.");
            } else {
                for entry in &entries {
                    println!(
                        "#{:<4} {}  [{}] {}",
                        entry.id,
                        format_entry_date(entry.created_at, &Local),
                        entry.selected_emotion,
                        entry.title
                    );
                }
            }
        }
        Commands::Show { id } => match service.entry(id).await? {
            Some(entry) => print_entry(&entry),
            None => println!("Entry #{id} not found."),
        },
        Commands::Delete { id } => {
            if service.delete_entry(id).await? {
                println!("Deleted entry #{id}");
            } else {
                println!("Entry #{id} not found.");
            }
        }
        Commands::Undo => match service.undo_last_save().await? {
            Some(entry) => {
                println!("Removed entry #{} ({})", entry.id, entry.title);
                if !entry.image_uri.is_empty() {
                    println!("Image no longer referenced: {}", entry.image_uri);
                }
            }
            None => println!("Nothing to undo."),
        },
        Commands::Stats { json } => {
            let distribution = service.emotion_distribution().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&distribution)?);
            } else if distribution.is_empty() {
                println!("No emotions recorded yet.");
            } else {
                for slice in &distribution {
                    println!("{} {:<6} {:>3}%  ({})", slice.color, slice.label, slice.whole_percent(), slice.count);
                }
            }
        }
        Commands::Week { date } => {
            let day = date.unwrap_or_else(today);
            let active = service.week_overview(day).await?;
            for date in week_of(day).days() {
                let mark = if active.contains(&date) { "●" } else { "○" };
                println!("{} {} {mark}", date.format("%a"), date.format("%m.%d"));
            }
        }
        Commands::Report { date } => {
            let day = date.unwrap_or_else(today);
            println!("{REPORT_PLACEHOLDER}\n");
            let outcome = service.spawn_weekly_report(day).wait().await?;
            println!("{outcome}");
        }
        Commands::Analyze { id } => match service.analyze_entry(id).await? {
            Some(outcome) => println!("{outcome}"),
            None => println!("Entry #{id} not found."),
        },
    }

    Ok(())
}

fn print_entry(entry: &DiaryEntry) {
    println!("#{} {}", entry.id, format_entry_date(entry.created_at, &Local));
    println!("Title:   {}", entry.title);
    println!("Emotion: {}", entry.selected_emotion);
    println!("Image:   {}", entry.image_uri);
    println!();
    println!("{}", entry.content);
}
