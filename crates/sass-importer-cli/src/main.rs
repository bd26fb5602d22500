//! sass-import - command-line host for the SCSS/SASS importer

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sass-import")]
#[command(version)]
#[command(about = "Import SCSS/SASS sources into structured stylesheets", long_about = None)]
struct Cli {
    /// Log debug output from the import pipeline
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds an importer.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Importer config file (defaults to ./sass-importer.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SASS compiler binary name or path
    #[arg(long, value_name = "BIN")]
    pub compiler: Option<String>,

    /// Kill the compiler after SECS seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import files, or every SCSS/SASS file under the given directories
    Import {
        /// Files or directories to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print the recorded imports as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the resolved import dependencies of one file
    Deps {
        /// Source file
        file: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sass_import=debug"
    } else {
        "sass_import=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Import {
            paths,
            json,
            config,
        } => commands::import::execute(commands::import::ImportArgs {
            paths,
            json,
            config,
        }),
        Commands::Deps { file, config } => commands::deps::execute(&file, &config),
    }
}
