//! # Marquee CLI (`marquee`)
//!
//! ## Usage
//!
//! ```bash
//! marquee --config ./config/marquee.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `marquee init` | Create the SQLite database and schema |
//! | `marquee serve` | Start the HTTP server |
//! | `marquee fetch "<title>"` | Fetch a movie from OMDb and store it |
//! | `marquee comment <imdb_id> "<text>"` | Add a comment to a stored movie |
//! | `marquee top --after <date> --before <date>` | Most commented movies in a date range |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use marquee::{comment, config, fetch, logging, migrate, server, top};

/// Marquee: movie catalog backed by OMDb, with comments and rankings.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/marquee.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "marquee", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/marquee.toml")]
    config: PathBuf,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the movies and comments tables.
    /// Running it again is safe.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Fetch a movie from OMDb by exact title and store it.
    ///
    /// Prints the stored movie as JSON.
    Fetch {
        /// Movie title, e.g. "Heat".
        title: String,
    },

    /// Add a comment to a stored movie.
    Comment {
        /// IMDb id of the movie, e.g. tt0113277.
        movie: String,
        /// Comment text.
        text: String,
    },

    /// Show the most commented movies between two dates (inclusive).
    Top {
        /// First day of the range (YYYY-MM-DD).
        #[arg(long)]
        after: String,
        /// Last day of the range (YYYY-MM-DD).
        #[arg(long)]
        before: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Fetch { title } => {
            fetch::run_fetch(&cfg, &title).await?;
        }
        Commands::Comment { movie, text } => {
            comment::run_comment(&cfg, &movie, &text).await?;
        }
        Commands::Top { after, before } => {
            top::run_top(&cfg, &after, &before).await?;
        }
    }

    Ok(())
}
