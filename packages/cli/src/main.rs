mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{create, inspect, normalize, replay, InspectArgs, NewArgs, NormalizeArgs, ReplayArgs};
use tracing::Level;

/// Worksheet CLI - create, inspect and replay notebook worksheets
#[derive(Parser, Debug)]
#[command(name = "worksheet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new worksheet
    New(NewArgs),

    /// List the segments of worksheets
    Inspect(InspectArgs),

    /// Rewrite worksheets in canonical form
    Normalize(NormalizeArgs),

    /// Drive a worksheet with a stream of JSON events
    Replay(ReplayArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if let Err(err) = run(cli.command) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();

    match command {
        Command::New(args) => create(args, &cwd),
        Command::Inspect(args) => inspect(args, &cwd),
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
    }
}
