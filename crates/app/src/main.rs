//! `grader`: maintenance and offline scoring commands for the grading store.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

#[derive(Parser)]
#[command(name = "grader", version, about = "Rubric grading and calibration tools")]
struct Cli {
    /// SQLite database URL or path
    #[arg(
        long = "db",
        env = "GRADER_DB_URL",
        default_value = "sqlite://grader.sqlite3",
        global = true
    )]
    db_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if needed and apply migrations
    Migrate,

    /// Parse a rubric and summarise its criteria
    CheckRubric {
        /// Rubric JSON file
        #[arg(long)]
        rubric: PathBuf,
    },

    /// Check training examples against a rubric
    CheckExamples {
        #[arg(long)]
        rubric: PathBuf,

        /// JSON array of `{ answer, options_selected }`
        #[arg(long)]
        examples: PathBuf,
    },

    /// Train one classifier per scored criterion
    Train {
        #[arg(long)]
        rubric: PathBuf,

        #[arg(long)]
        examples: PathBuf,

        /// Scoring algorithm id
        #[arg(long, default_value = "length-bucket")]
        algorithm: String,

        /// Where to write the classifier set
        #[arg(long)]
        out: PathBuf,
    },

    /// Score a text file without persisting anything
    Score {
        #[arg(long)]
        rubric: PathBuf,

        #[arg(long)]
        classifiers: PathBuf,

        /// Plain-text answer
        #[arg(long)]
        text: PathBuf,
    },

    /// Store an answer and print its submission id
    Submit {
        /// Plain-text answer
        #[arg(long)]
        text: PathBuf,
    },

    /// Grade a stored submission with trained classifiers
    Grade {
        #[arg(long)]
        submission: String,

        #[arg(long)]
        rubric: PathBuf,

        #[arg(long)]
        classifiers: PathBuf,
    },

    /// Show calibration progress for a submission
    Status {
        #[arg(long)]
        submission: String,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("services=info".parse()?)
        .add_directive("grader=info".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Migrate => commands::migrate::execute(&cli.db_url).await,
        Commands::CheckRubric { rubric } => commands::check::rubric(&rubric),
        Commands::CheckExamples { rubric, examples } => {
            commands::check::examples(&rubric, &examples)
        }
        Commands::Train {
            rubric,
            examples,
            algorithm,
            out,
        } => commands::train::execute(&rubric, &examples, &algorithm, &out),
        Commands::Score {
            rubric,
            classifiers,
            text,
        } => commands::score::execute(&rubric, &classifiers, &text),
        Commands::Submit { text } => commands::grade::submit(&cli.db_url, &text).await,
        Commands::Grade {
            submission,
            rubric,
            classifiers,
        } => commands::grade::execute(&cli.db_url, &submission, &rubric, &classifiers).await,
        Commands::Status { submission } => {
            commands::status::execute(&cli.db_url, &submission).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
