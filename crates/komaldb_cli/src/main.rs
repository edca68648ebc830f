//! KomalDB CLI
//!
//! Command-line front end for KomalDB databases.
//!
//! # Commands
//!
//! - `repl` - Interactive statement prompt
//! - `exec` - Execute a single statement
//! - `dump` - Print every key and value
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// KomalDB command-line tools.
#[derive(Parser)]
#[command(name = "komaldb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive statement prompt
    Repl,

    /// Execute one statement, e.g. `exec SET user = {"email": "a@b"}`
    Exec {
        /// Statement words
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        statement: Vec<String>,
    },

    /// Print every key and value
    Dump {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Repl => {
            let path = cli.path.ok_or("Database path required for repl")?;
            commands::repl::run(&path)?;
        }
        Commands::Exec { statement } => {
            let path = cli.path.ok_or("Database path required for exec")?;
            commands::exec::run(&path, &statement)?;
        }
        Commands::Dump { format } => {
            let path = cli.path.ok_or("Database path required for dump")?;
            commands::dump::run(&path, format.as_str())?;
        }
        Commands::Version => {
            println!("KomalDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("KomalDB Core v{}", komaldb_core::VERSION);
        }
    }

    Ok(())
}
