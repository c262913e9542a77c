//! DeepContext CLI, the main entry point.
//!
//! Commands:
//! - `agent`   Answer one question with the ReAct loop
//! - `serve`   Run the tool server over stdin/stdout
//! - `init`    Write a default config and create the knowledge store
//! - `doctor`  Diagnose configuration and store health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "deepcontext",
    about = "DeepContext: research agent over Markdown notes and a knowledge graph",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on one question and print its answer
    Agent {
        /// The question to answer (defaults to `agent.default_query`)
        #[arg(short, long)]
        query: Option<String>,

        /// Override the oracle-call budget for this run
        #[arg(long)]
        max_turns: Option<u32>,

        /// Serve tools from this process instead of spawning a tool server
        #[arg(long)]
        in_process: bool,
    },

    /// Serve the note and knowledge-graph tools over stdio
    Serve,

    /// Initialize configuration and the knowledge store
    Init,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout is reserved for answers and, under `serve`, protocol frames.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Agent {
            query,
            max_turns,
            in_process,
        } => commands::agent::run(query, max_turns, in_process).await?,
        Commands::Serve => commands::serve::run().await?,
        Commands::Init => commands::init::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
