//! LOOM CLI
//!
//! Compile, check, query and visualize infrastructure specifications.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "LOOM - declarative infrastructure specification compiler", long_about = None)]
struct Cli {
    /// JSON compile config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Module search path, overriding the config and LOOM_PATH (repeatable)
    #[arg(short = 'I', long = "path", global = true)]
    search_paths: Vec<PathBuf>,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form of a specification
    Eval {
        /// Specification file
        file: PathBuf,
        /// Print the compiled records as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Compile and check invariants
    Check {
        /// Specification file
        file: PathBuf,
        /// Additional invariants, one per line
        #[arg(short, long)]
        invariants: Option<PathBuf>,
    },
    /// Run failure queries against invariants
    Query {
        /// Specification file
        file: PathBuf,
        /// Invariants, one per line
        #[arg(short, long)]
        invariants: PathBuf,
        /// Queries, one per line
        #[arg(short, long)]
        queries: PathBuf,
    },
    /// Print the communication graph in Graphviz DOT format
    Viz {
        /// Specification file
        file: PathBuf,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,loom=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = commands::load_config(cli.config.as_deref(), &cli.search_paths)?;
    match &cli.command {
        Commands::Eval { file, json } => commands::eval(file, &config, *json),
        Commands::Check { file, invariants } => {
            commands::check(file, &config, invariants.as_deref())
        }
        Commands::Query {
            file,
            invariants,
            queries,
        } => commands::query(file, &config, invariants, queries),
        Commands::Viz { file } => commands::viz(file, &config),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let output = run(&cli).map_err(|err| eyre!("{err:#}"))?;
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
    Ok(())
}
