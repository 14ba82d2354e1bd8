mod commands;
mod logging;
mod progress;

use std::path::Path;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, PathArgs};
use dotenv::dotenv;
use media_sorter_core::config::{self, AppConfig};
use media_sorter_core::storage::{DuplicateIndex, HashIndex};
use media_sorter_core::{hasher, SortEngine};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    match args.command {
        Some(Commands::Process(paths)) => {
            let config = load_config(&paths)?;
            if let Err(err) = run_process(config) {
                error!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
        Some(Commands::Check { file, paths }) => {
            let config = load_config(&paths)?;
            run_check(&config, &file)?;
        }
        Some(Commands::IndexStats(paths)) => {
            let config = load_config(&paths)?;
            run_index_stats(&config)?;
        }
        Some(Commands::PrintConfig(paths)) => {
            let config = load_config(&paths)?;
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn load_config(paths: &PathArgs) -> anyhow::Result<AppConfig> {
    config::load_configuration_with(&paths.overrides()).context("Error loading configuration")
}

fn open_index(config: &AppConfig) -> anyhow::Result<HashIndex> {
    HashIndex::open_with_journal(&config.index_path, config.index_journal_mode)
        .with_context(|| format!("Error opening index {}", config.index_path))
}

fn run_process(config: AppConfig) -> anyhow::Result<()> {
    let engine = SortEngine::new(config);
    let reporter = CliReporter::new();
    let result = engine.run(&reporter)?;
    let stats = &result.stats;

    println!();
    info!(
        "Finished in {}",
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    info!(
        "{} processed, {} moved, {} duplicates deleted",
        format!("{}", stats.files_processed).cyan(),
        format!("{}", stats.files_moved).green(),
        format!("{}", stats.duplicates_deleted).red(),
    );
    if stats.files_failed + stats.files_skipped + stats.files_unindexed > 0 {
        info!(
            "{} failed, {} skipped while the index was locked, {} moved but not indexed",
            format!("{}", stats.files_failed).yellow(),
            format!("{}", stats.files_skipped).yellow(),
            format!("{}", stats.files_unindexed).yellow(),
        );
    }

    Ok(())
}

fn run_check(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let fingerprint = hasher::hash_file(file)
        .with_context(|| format!("Error hashing {}", file.display()))?;
    let index = open_index(config)?;

    match index.lookup(&fingerprint)? {
        Some(entry) => println!(
            "{} {} ({:.2} MB, .{})",
            "indexed".red(),
            fingerprint,
            entry.size_mb,
            entry.extension
        ),
        None => println!("{} {}", "new".green(), fingerprint),
    }
    Ok(())
}

fn run_index_stats(config: &AppConfig) -> anyhow::Result<()> {
    let index = open_index(config)?;
    info!(
        "{} entries, {} MB indexed",
        format!("{}", index.count_entries()?).cyan(),
        format!("{:.2}", index.total_size_mb()?).cyan(),
    );
    Ok(())
}
