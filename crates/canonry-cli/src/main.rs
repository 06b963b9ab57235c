//! Canonry CLI: the `canonry` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            corpus,
            config,
            strict,
            json,
        } => commands::validate::run(corpus, config, strict, json),

        Commands::Repair {
            corpus,
            config,
            mode,
            policy,
            max_missing,
            json,
        } => commands::repair::run(corpus, config, mode, policy, max_missing, json),

        Commands::Rename {
            current_id,
            new_id,
            corpus,
            config,
            apply,
            json,
        } => commands::rename::run(current_id, new_id, corpus, config, apply, json),

        Commands::Normalize {
            corpus,
            apply,
            json,
        } => commands::normalize::run(corpus, apply, json),

        Commands::Graph { command } => commands::graph::run(command),

        Commands::Init { path, json } => commands::init::run(path, json),
    }
}
