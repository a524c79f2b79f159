use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docweave::cli::{run_context_clear, run_context_status, run_generate, GenerateArgs};

#[derive(Parser)]
#[command(
    name = "docweave",
    version,
    about = "Assemble long-form docs (API docs, CLI docs, OpenAPI specs) through resumable, cached generation runs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the generation pipeline: inputs -> outline -> sections -> output
    Generate(GenerateArgs),
    /// Inspect or reset named generation contexts
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
}

#[derive(Subcommand)]
enum ContextAction {
    /// Show what a context has cached so far
    Status {
        #[arg(default_value = "default")]
        name: String,
        #[arg(long)]
        context_dir: Option<PathBuf>,
    },
    /// Delete a context so the next run starts from scratch
    Clear {
        #[arg(default_value = "default")]
        name: String,
        #[arg(long)]
        context_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args).await,
        Command::Context { action } => match action {
            ContextAction::Status { name, context_dir } => {
                run_context_status(context_dir, &name).await
            }
            ContextAction::Clear { name, context_dir } => {
                run_context_clear(context_dir, &name).await
            }
        },
    }
}
