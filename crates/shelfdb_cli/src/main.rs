//! shelfdb CLI
//!
//! Command-line tools for shelfdb storage directories.
//!
//! # Commands
//!
//! - `inspect` - Display version, stores, indexes and record counts
//! - `dump` - Print the records of a store as JSON lines
//! - `load` - Bulk load delimited text into a store
//! - `compact` - Rewrite a journal as a single snapshot
//! - `verify` - Check every journal frame

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// shelfdb command-line database tools.
#[derive(Parser)]
#[command(name = "shelfdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display version, stores, indexes and record counts
    Inspect {
        /// Storage directory
        dir: PathBuf,
        /// Database name
        name: String,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the records of a store as JSON lines
    Dump {
        /// Storage directory
        dir: PathBuf,
        /// Database name
        name: String,
        /// Store name
        store: String,
        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Bulk load delimited text into a store
    Load {
        /// Storage directory
        dir: PathBuf,
        /// Database name
        name: String,
        /// Store name
        store: String,
        /// File whose first line names the fields
        file: PathBuf,
        /// Field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,
    },

    /// Rewrite a journal as a single snapshot
    Compact {
        /// Storage directory
        dir: PathBuf,
        /// Database name
        name: String,
    },

    /// Check every journal frame
    Verify {
        /// Storage directory
        dir: PathBuf,
        /// Database name
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { dir, name, format } => commands::inspect::run(&dir, &name, &format)?,
        Commands::Dump {
            dir,
            name,
            store,
            limit,
        } => commands::dump::run(&dir, &name, &store, limit)?,
        Commands::Load {
            dir,
            name,
            store,
            file,
            delimiter,
        } => commands::load::run(&dir, &name, &store, &file, delimiter)?,
        Commands::Compact { dir, name } => commands::compact::run(&dir, &name)?,
        Commands::Verify { dir, name } => commands::verify::run(&dir, &name)?,
    }

    Ok(())
}
