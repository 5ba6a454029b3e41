use clap::Parser;
use log::LevelFilter;

mod cli;
mod commands;
mod exit_codes;
mod output;
mod plan;
mod recording;
mod report;

use cli::{Cli, Command};

/// Warnings by default; each `-v` raises the level one step
fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .format_timestamp(None)
        .init();

    let code = match cli.command {
        Command::Analyze(args) => commands::analyze::execute(args),
        Command::Process(args) => commands::process::execute(args),
        Command::Filters(args) => commands::filters::execute(args),
        Command::Validate(args) => commands::validate::execute(args),
    };
    std::process::exit(code);
}
