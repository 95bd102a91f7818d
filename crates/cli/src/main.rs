//! llmask CLI, the main entry point.
//!
//! Commands:
//! - `init`        Write the default config file
//! - `ask`         Ask a free-form question, optionally with background files
//! - `arithmetic`  Arithmetic with tool calls and worked examples
//! - `story`       Interactive story-concept conversation

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "llmask",
    about = "Ask an LLM a question, get back a schema-checked JSON answer",
    version
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
    /// Write the default configuration file
    Init,

    /// Ask a question and print the structured answer
    Ask {
        /// The question to ask
        prompt: String,

        /// Background material; the content type is guessed from the extension
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Do not stream the model's output to stdout
        #[arg(long)]
        no_stream: bool,
    },

    /// Solve an arithmetic problem with the sum/mult/exp tools
    Arithmetic {
        /// Override the built-in problem
        #[arg(short, long)]
        question: Option<String>,
    },

    /// Build a story concept interactively, one line at a time
    Story,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries streamed model output.
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
        Commands::Init => commands::init::run()?,
        Commands::Ask {
            prompt,
            files,
            no_stream,
        } => commands::ask::run(prompt, files, !no_stream).await?,
        Commands::Arithmetic { question } => commands::arithmetic::run(question).await?,
        Commands::Story => commands::story::run().await?,
    }

    Ok(())
}
