pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use chunkplan_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = handlers::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Select { parts } => handlers::handle_select(config, &parts),
        Commands::Plan {
            parts,
            first,
            count,
            json,
        } => handlers::handle_plan(config, &parts, first, count, json),
        Commands::Simulate {
            parts,
            block_size,
            seed,
        } => handlers::handle_simulate(config, &parts, block_size, &seed),
        Commands::Describe { part } => handlers::handle_describe(part),
    }
}
