//! pdca-desk - Local PDCA task tracker
//!
//! Keeps weekly and monthly plans with their tasks, computes completion
//! statistics and exports weekly reports as spreadsheets.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod api;
mod auth;
mod calendar;
mod config;
mod db;
mod error;
mod export;
mod models;
mod report;
mod stats;

use calendar::WeekId;
use config::Config;
use models::NewUser;

#[derive(Parser)]
#[command(name = "pdca-desk")]
#[command(about = "Plan-Do-Check-Act task tracker with weekly reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show the week identifier, range and month for a date
    Week {
        /// Date as YYYY-MM-DD (defaults to today)
        date: Option<String>,
    },

    /// Write a weekly report spreadsheet
    Report {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Account the report is for
        #[arg(short, long)]
        username: String,

        /// Week as YYYY-WW (defaults to the current week)
        #[arg(short, long)]
        week: Option<String>,

        /// Output file (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account
    Add {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Display name (defaults to the username)
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: String,

        /// Security question key used for password recovery
        #[arg(short = 'q', long)]
        security_question: String,

        /// Answer to the security question (case-insensitive)
        #[arg(short = 'a', long)]
        security_answer: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("pdca_desk=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, bind } => {
            let mut cfg = load_config(config)?;

            // Override with CLI args
            if let Some(p) = port {
                cfg.server.port = p;
            }
            if let Some(b) = bind {
                cfg.server.bind = b;
            }

            run_server(cfg).await
        }

        Commands::Init { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from("config.toml"));
            let cfg = Config::default();
            cfg.save_to(&path)?;

            println!("Created config file: {}", path.display());
            println!();
            println!("Next steps:");
            println!("  1. Create an account: pdca-desk user add -u <name> -p <pw> -e <email> -q <question> -a <answer>");
            println!(
                "  2. Start the server: pdca-desk serve --config {}",
                path.display()
            );

            Ok(())
        }

        Commands::User {
            command:
                UserCommands::Add {
                    config,
                    username,
                    password,
                    name,
                    email,
                    security_question,
                    security_answer,
                },
        } => {
            let cfg = load_config(config)?;
            let db = open_database(&cfg)?;

            let new_user = NewUser {
                name: name.unwrap_or_else(|| username.clone()),
                username,
                password,
                email,
                security_question,
                security_answer,
            };
            let user = auth::register(&db, &new_user)?;

            println!("Created account '{}' (id {})", user.username, user.id);
            Ok(())
        }

        Commands::Week { date } => {
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))?,
                None => chrono::Local::now().date_naive(),
            };

            let week = WeekId::of(date);
            let range = week.range();
            let next = week.next();

            println!("Week:       {week} (week {} of {})", week.week(), week.year());
            println!("Range:      {} .. {}", range.start, range.end);
            println!("Month:      {}", week.month());
            println!("Next week:  {next} ({} .. {})", next.range().start, next.range().end);

            Ok(())
        }

        Commands::Report {
            config,
            username,
            week,
            output,
        } => {
            let cfg = load_config(config)?;
            let db = open_database(&cfg)?;

            let Some(user) = db.find_user_by_username(&username)? else {
                bail!("No account named '{username}'");
            };
            let week = match week {
                Some(raw) => raw.parse::<WeekId>()?,
                None => WeekId::of(chrono::Local::now().date_naive()),
            };

            let data = report::build_weekly_report(&db, user.id, week)?;
            let path = output.unwrap_or_else(|| cfg.export.directory.join(export::file_name(&week)));
            export::write_weekly_report(&data, &path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;

            println!(
                "Wrote {} ({} tasks, {} next week)",
                path.display(),
                data.tasks.len(),
                data.next_period_tasks.len()
            );
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(&path),
        None => Config::load(),
    }
}

fn open_database(config: &Config) -> Result<db::Database> {
    db::Database::open(&config.database.path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database.path.display()
        )
    })
}

async fn run_server(config: Config) -> Result<()> {
    let db = open_database(&config)?;

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let state = api::AppState::new(db);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("pdca-desk server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
