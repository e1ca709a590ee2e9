mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    compile, inspect, reload, upgrade, validate, CompileArgs, InspectArgs, ReloadArgs,
    UpgradeArgs, ValidateArgs,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// KIR - compile .kry sources into binary UI artifacts
#[derive(Parser, Debug)]
#[command(name = "kir")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile .kry files to .kirb artifacts
    Compile(CompileArgs),

    /// Print the header, tree and manifest of an artifact
    Inspect(InspectArgs),

    /// Check artifacts without loading them
    Validate(ValidateArgs),

    /// Rewrite artifacts at the current format version
    Upgrade(UpgradeArgs),

    /// Recompile a source against a live artifact, keeping its state
    Reload(ReloadArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} cannot determine current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = run(cli.command, &cwd);

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(commands::exit_code(&err));
    }
}

fn run(command: Command, cwd: &Path) -> anyhow::Result<()> {
    match command {
        Command::Compile(args) => compile(args, cwd),
        Command::Inspect(args) => inspect(args),
        Command::Validate(args) => validate(args, cwd),
        Command::Upgrade(args) => upgrade(args, cwd),
        Command::Reload(args) => reload(args, cwd),
    }
}
