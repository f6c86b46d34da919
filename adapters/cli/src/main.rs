#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that validates definitions and runs headless
//! simulations of the Horde engine.

mod scripts;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use horde_core::ArchetypeId;
use horde_definitions::{DefinitionRegistry, JsonDirectorySource};
use horde_engine::{Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

/// Custom entity and campaign orchestration.
#[derive(Debug, Parser)]
#[command(name = "horde", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Loads every definition in a directory and reports rejections.
    Validate {
        /// Directory holding `npcs.json` and `invasions.json`.
        definitions: PathBuf,
    },
    /// Runs the engine against a flat in-memory world.
    Simulate {
        /// Directory holding `npcs.json` and `invasions.json`.
        definitions: PathBuf,
        /// Engine configuration file; defaults apply when it is absent.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of connected players.
        #[arg(long, default_value_t = 1)]
        players: usize,
        /// Number of ticks to run.
        #[arg(long, default_value_t = 3_600)]
        ticks: u64,
        /// Seed overriding the configured one.
        #[arg(long)]
        seed: Option<u64>,
        /// Kill the oldest entity every this many ticks; zero disables kills.
        #[arg(long, default_value_t = 30)]
        kill_every: u64,
        /// Let the host spawn an entity per player every this many ticks.
        #[arg(long, default_value_t = 120)]
        native_every: u64,
        /// Archetype of host-spawned entities.
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        native_archetype: ArchetypeId,
        /// Administrator command run from the console before the first tick.
        #[arg(long = "command", value_name = "LINE")]
        commands: Vec<String>,
    },
}

/// Entry point for the Horde command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    match Cli::parse().command {
        Mode::Validate { definitions } => validate(definitions),
        Mode::Simulate {
            definitions,
            config,
            players,
            ticks,
            seed,
            kill_every,
            native_every,
            native_archetype,
            commands,
        } => {
            let scenario = simulation::Scenario {
                players,
                ticks,
                kill_every,
                native_every,
                native_archetype,
                commands,
            };
            simulate(definitions, config, seed, &scenario)
        }
    }
}

fn validate(definitions: PathBuf) -> Result<()> {
    let source = JsonDirectorySource::new(&definitions);
    let mut scripts = scripts::builtin_host();
    let mut registry = DefinitionRegistry::new();
    let report = registry
        .load(&source, &mut scripts)
        .with_context(|| format!("failed to read definitions from {}", definitions.display()))?;

    println!(
        "{} entities, {} campaigns accepted",
        report.entities, report.campaigns
    );
    for rejection in &report.rejected {
        println!(
            "rejected {} `{}`: {}",
            rejection.kind, rejection.name, rejection.reason
        );
    }
    registry.dispose(&mut scripts);
    anyhow::ensure!(
        report.rejected.is_empty(),
        "{} definition(s) rejected",
        report.rejected.len()
    );
    Ok(())
}

fn simulate(
    definitions: PathBuf,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    scenario: &simulation::Scenario,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }

    let mut engine = Engine::new(
        config,
        Box::new(JsonDirectorySource::new(definitions)),
        Box::new(scripts::builtin_host()),
    );
    if let Some(path) = config_path {
        engine = engine.with_config_path(path);
    }
    let report = engine.reload().context("initial load failed")?;
    tracing::info!(
        entities = report.entities,
        campaigns = report.campaigns,
        rejected = report.rejected.len(),
        "definitions loaded"
    );

    let summary = simulation::run(&mut engine, scenario)?;
    engine.dispose();

    for message in &summary.messages {
        println!("> {message}");
    }
    println!("ticks:          {}", summary.ticks);
    println!("kills:          {}", summary.kills);
    println!("alive entities: {}", summary.alive);
    println!("custom:         {}", summary.custom);
    println!("items dropped:  {}", summary.drops);
    println!("script faults:  {}", summary.script_faults);
    match &summary.campaign {
        Some(campaign) => println!("campaign:       {campaign}"),
        None => println!("campaign:       none"),
    }
    Ok(())
}
