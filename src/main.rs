//! vidcache - CLI entry point

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cache_dir = cli.cache_dir.as_deref();
    match cli.command {
        Commands::Thumbnail { file, output } => {
            commands::thumbnail::handle(&file, output.as_deref(), cache_dir)
        }
        Commands::Duration { file } => commands::duration::handle(&file, cache_dir),
        Commands::Scan { dir } => commands::scan::handle(&dir, cache_dir),
        Commands::Precache { dir } => commands::precache::handle(&dir, cache_dir),
        Commands::Clear => commands::clear::handle(cache_dir),
        Commands::Status => commands::status::handle(cache_dir),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(cache_dir),
        },
    }
}

/// Log to stderr so stdout stays clean for command output.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
