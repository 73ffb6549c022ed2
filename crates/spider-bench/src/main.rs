use std::path::PathBuf;

use clap::Parser;

use spider_bench::config::{ResolvedOutputs, SimulationConfig};
use spider_bench::logging::init_logging;
use spider_bench::simulation::SimulationRunner;

/// Batch simulation harness for the Spider solitaire solver.
#[derive(Debug, Parser)]
#[command(
    name = "spider-bench",
    author,
    version,
    about = "Deterministic Spider solitaire simulation harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "sim/spider.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    iterations: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the suit mode (1, 2 or 4).
    #[arg(long, value_name = "SUITS")]
    suit_mode: Option<u8>,

    /// Insert a delay between solver moves, in milliseconds.
    #[arg(long, value_name = "MS")]
    pace_ms: Option<u64>,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SimulationConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(iterations) = cli.iterations {
        config.games.iterations = iterations;
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    if let Some(suits) = cli.suit_mode {
        config.games.suit_mode = suits;
    }

    if let Some(ms) = cli.pace_ms {
        config.pacing_ms = Some(ms);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let iterations = config.games.iterations;
    let suits = config.games.suit_mode;

    println!(
        "Loaded configuration '{run_id}' ({iterations} game{} in {suits}-suit mode)",
        if iterations == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    let win_pct = if summary.games_played == 0 {
        0.0
    } else {
        summary.wins as f64 * 100.0 / summary.games_played as f64
    };
    println!(
        "Simulation complete for '{run_id}': {} games, {} won ({win_pct:.1}%) → {} rows at {}",
        summary.games_played,
        summary.wins,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());

    Ok(())
}
