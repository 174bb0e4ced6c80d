//! # Paper Scout CLI (`pscout`)
//!
//! The `pscout` binary is the primary interface for Paper Scout. It provides
//! commands for database initialization, corpus ingestion, one-shot and
//! interactive search, corpus stats, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! pscout --config ./config/pscout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pscout init` | Create the SQLite database and run schema migrations |
//! | `pscout ingest <file>` | Import papers (with or without inline embeddings) |
//! | `pscout search "<query>"` | One-shot semantic search |
//! | `pscout get <id>` | Retrieve a paper by UUID |
//! | `pscout chat` | Interactive search session with query-history context |
//! | `pscout stats` | Corpus overview |
//! | `pscout serve` | Start the JSON HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use paper_scout::{config, get, ingest, migrate, search, server, stats};

/// Paper Scout — session-aware semantic search over research papers.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "pscout",
    about = "Paper Scout — session-aware semantic search over research papers",
    version,
    long_about = "Paper Scout stores papers and their embeddings in SQLite, serves exact \
    inner-product search from an in-memory index, and re-ranks results using a decayed \
    history of the session's past queries."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pscout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the papers and paper_vectors
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// Import papers from a JSON file.
    ///
    /// The file holds an array of records with `title`, optional metadata,
    /// and an optional `embedding` array. Records without an embedding are
    /// embedded via the configured provider. Duplicate titles are skipped.
    Ingest {
        /// Path to the JSON corpus file.
        file: PathBuf,

        /// Show record counts without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of records to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search the corpus with a single query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Retrieve a paper by its UUID.
    ///
    /// Prints the paper's metadata, abstract, and embedding status.
    Get {
        /// Paper UUID.
        id: String,
    },

    /// Interactive search session.
    ///
    /// Each query is added to a bounded history; subsequent searches are
    /// nudged toward the session's recent topics. Type `exit` to quit.
    Chat,

    /// Print corpus statistics.
    Stats,

    /// Start the JSON HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            file,
            dry_run,
            limit,
        } => {
            ingest::run_ingest(&cfg, &file, dry_run, limit).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Chat => {
            search::run_chat(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
