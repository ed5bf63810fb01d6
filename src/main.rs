use clap::{Parser, Subcommand};

use quire::commands;
use quire::commands::build::BuildArgs;

#[derive(Parser)]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: QuireCommand,
}

#[derive(Subcommand)]
enum QuireCommand {
    /// Build the site
    Build(BuildArgs),
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        QuireCommand::Build(args) => {
            commands::build::run(&args)?;
        }
    }

    Ok(())
}
