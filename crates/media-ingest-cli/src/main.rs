mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use media_ingest_core::analysis::decoration::DecorationScope;
use media_ingest_core::lifecycle::UnitStatus;
use media_ingest_core::storage::{Database, IngestHistory};
use media_ingest_core::{AppConfig, Classification, PassMode, ResolveEngine};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    let config = match media_ingest_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Err(err) = run_command(command, &config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_command(command: Commands, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { path, fingerprint } => run_ingest(config, &path, fingerprint),
        Commands::Resolve { dry_run } => run_resolve(config, dry_run),
        Commands::AnalyzeFolders => run_analyze_folders(config),
        Commands::Inspect { limit } => run_inspect(config, limit),
        Commands::SetStatus { unit_id, status } => run_set_status(config, unit_id, &status),
        Commands::PrintConfig => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        Commands::TruncateDb => {
            let confirmed = prompt_confirm(
                "Are you SURE you want to COMPLETELY DELETE the Database?",
                Some(false),
            )?;
            if confirmed {
                open_database(config)?
                    .truncate_all()
                    .context("truncating database")?;
                println!("All tables truncated");
            }
            Ok(())
        }
    }
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    Database::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))
}

fn run_ingest(config: &AppConfig, path: &str, fingerprint: bool) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let outcome = media_ingest_core::ingest::record_ingest(&db, path, fingerprint)?;
    println!(
        "INGEST_INTENT path={} exists={} id={}",
        outcome.path, outcome.exists, outcome.id
    );
    Ok(())
}

fn run_resolve(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let engine = ResolveEngine::new(config.clone());
    let reporter = CliReporter::new();
    let mode = if dry_run {
        PassMode::DryRun
    } else {
        PassMode::Apply
    };

    let result = engine.resolve(&db, mode, &reporter, &reporter)?;

    println!();
    info!(
        "{} records evaluated, {} committed in {}",
        format!("{}", result.records_evaluated).cyan(),
        format!("{}", result.records_committed).cyan(),
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    for classification in Classification::ALL {
        let count = result.count(classification);
        if count > 0 {
            info!("  {:<20} {}", classification.as_str(), count);
        }
    }
    if result.unresolved() > 0 {
        info!(
            "{} records left unprocessed (ambiguous or orphan)",
            format!("{}", result.unresolved()).yellow()
        );
    }
    if dry_run {
        info!("{}", "Dry run: catalog unchanged".yellow());
    }
    if result.cancelled {
        info!("{}", "Pass cancelled before completion".red());
    }

    Ok(())
}

fn run_analyze_folders(config: &AppConfig) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let engine = ResolveEngine::new(config.clone());
    let analyses = engine.analyze(&db)?;

    for analysis in &analyses {
        println!(
            "{} {} primaries={} assets={} ignored={}{}",
            "FOLDER".bold(),
            analysis.folder,
            analysis.primary_count,
            analysis.asset_count,
            analysis.ignored_count,
            if analysis.bottom_level { "" } else { " nested" },
        );
        for candidate in &analysis.cores.candidates {
            println!(
                "  CORE {} stems={}",
                candidate.core_tokens.join(" ").green(),
                candidate.primary_stems.len()
            );
        }
        for candidate in analysis.multi_primary_candidates() {
            let stems: Vec<&str> = candidate.primary_stems.iter().map(String::as_str).collect();
            println!(
                "  GROUP {} <- {}",
                candidate.core_tokens.join(" ").cyan(),
                stems.join(", ")
            );
        }
        for (token, units) in &analysis.decorations.token_unit_counts {
            let scope = analysis
                .decorations
                .scope_of(token)
                .unwrap_or(DecorationScope::Local);
            println!("  DECORATION {} {} units={}", token, scope, units);
        }
        println!("  SINGLETONS {}", analysis.singleton_count());
    }

    info!("{} folders with primary media", analyses.len());
    Ok(())
}

fn run_inspect(config: &AppConfig, limit: usize) -> anyhow::Result<()> {
    let db = open_database(config)?;

    println!("{}", format!("Last {} ingest records", limit).bold());
    for record in db.most_recent(limit)? {
        println!(
            "  #{} {} processed={} observed_at={}{}",
            record.id,
            record.path,
            record.processed,
            record.observed_at,
            record
                .fingerprint
                .as_deref()
                .map(|fp| format!(" fingerprint={}", fp))
                .unwrap_or_default(),
        );
    }

    println!("{}", format!("Last {} media units", limit).bold());
    for unit in db.recent_units(limit)? {
        let alternates: Vec<&str> = unit.alternate_extensions.iter().map(String::as_str).collect();
        println!(
            "  #{} [{}] {} core={} status={} alternates=[{}] assets={}",
            unit.id,
            unit.folder,
            unit.current_path,
            unit.core_tokens.join(" ").green(),
            unit.status,
            alternates.join(","),
            unit.attached_assets.len(),
        );
    }

    Ok(())
}

fn run_set_status(config: &AppConfig, unit_id: i64, status: &str) -> anyhow::Result<()> {
    let status: UnitStatus = status.parse().map_err(media_ingest_core::Error::Other)?;
    let db = open_database(config)?;
    let unit = db.set_unit_status(unit_id, status)?;
    println!("UNIT {} status={}", unit.id, unit.status);
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
