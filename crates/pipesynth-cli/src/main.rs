#![doc = include_str!("../README.md")]

mod cli;
mod commands;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub(crate) use types::OutputFormat;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Synth {
            config,
            oracles,
            search,
            strategy,
            workers,
            max_iterations,
            timeout,
            refinement,
            constraints,
            output,
        } => commands::synth::run_synth_command(commands::synth::SynthArgs {
            config,
            oracles,
            search,
            strategy,
            workers,
            max_iterations,
            timeout,
            refinement,
            constraints,
            output,
        }),
        Commands::Verify {
            config,
            holes,
            oracles,
        } => commands::verify::run_verify_command(config, holes, oracles),
        Commands::Placements { config, format } => {
            commands::placements::run_placements_command(config, &format)
        }
    }
}
