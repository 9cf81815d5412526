mod cli;
mod config;
mod matcher;
mod model;
mod pipeline;
mod publish;
mod recurrence;
mod resolver;
mod store;

use std::process;

use clap::Parser;

fn main() {
    let parsed = cli::Cli::parse();

    let config = match config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(parsed, &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
