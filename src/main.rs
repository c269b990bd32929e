#[path = "main/cli.rs"]
mod cli;
#[path = "main/commands.rs"]
mod commands;
#[path = "main/shared.rs"]
mod shared;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{cmd_engine, cmd_errors, cmd_type, Engine};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Errors { category } => cmd_errors(category.as_deref()),
        Commands::Type { annotation } => cmd_type(annotation),
        Commands::Cast(args) => cmd_engine(Engine::Cast, args),
        Commands::Convert(args) => cmd_engine(Engine::Convert, args),
        Commands::Stamp(args) => cmd_engine(Engine::Stamp, args),
    }
}
