use std::path::PathBuf;

use clap::{Parser, Subcommand};
use printforge_lib::bootstrap::{self, tracing::init_tracing_subscriber};
use printforge_lib::commands::auth::{self, AuthCommand};
use printforge_lib::commands::models::{self, ModelsArgs};
use printforge_lib::commands::process::{self, ProcessArgs, RunEnd};
use printforge_lib::commands::upload::{self, UploadArgs};
use printforge_lib::commands::callback;
use tracing::error;

#[derive(Debug, Parser)]
#[command(
    name = "printforge",
    version,
    about = "Simulated image-to-3D workflow for PrintForge AI"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed the simulation for a reproducible run
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload local images through the simulated transfer
    Upload(UploadArgs),
    /// Watch a simulated processing run
    Process(ProcessArgs),
    /// Reconcile an OAuth callback URL
    Callback {
        url: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Account commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Browse generated models
    Models(ModelsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing_subscriber()?;

    let config = bootstrap::load_config(cli.config)?;
    let (deps, mut navigations) = bootstrap::wire_dependencies(config, cli.seed)?;

    let result = match cli.command {
        Command::Upload(args) => upload::run(&deps, args)
            .await
            .and_then(|stats| {
                if stats.uploaded == 0 {
                    anyhow::bail!("no file was uploaded");
                }
                Ok(())
            }),
        Command::Process(args) => {
            match process::run(&deps, &mut navigations, args).await {
                Ok(RunEnd::Failed { code }) => Err(anyhow::anyhow!("processing failed: {code}")),
                Ok(_) => Ok(()),
                Err(err) => Err(err),
            }
        }
        Command::Callback { url, json } => callback::run(&deps, &mut navigations, &url, json)
            .await
            .map(|_| ()),
        Command::Auth(command) => auth::run(&deps, &mut navigations, command).await,
        Command::Models(args) => models::run(&deps, args),
    };

    if let Err(err) = &result {
        error!(error = %err, "command failed");
    }
    result
}
