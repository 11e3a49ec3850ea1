mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, repair, replay, CheckArgs, InitArgs, RepairArgs, ReplayArgs};
use tracing_subscriber::EnvFilter;

/// Footnotes CLI - keep footnote references and definitions in sync
#[derive(Parser, Debug)]
#[command(name = "footnotes")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log pipeline activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty document with a footnote list
    Init(InitArgs),

    /// Report footnote consistency violations
    Check(CheckArgs),

    /// Renumber references and rebuild the footnote list
    Repair(RepairArgs),

    /// Run a JSON command script against a document
    Replay(ReplayArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Check(args) => check(args, &cwd),
                Command::Repair(args) => repair(args, &cwd),
                Command::Replay(args) => replay(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
