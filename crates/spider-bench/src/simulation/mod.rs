use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use spider_bot::{GameOutcome, Solver, SolverError};
use spider_core::game::board::SpiderGame;
use spider_core::model::suit::SuitMode;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsError, WinLossTally};
use crate::config::{ResolvedOutputs, SimulationConfig};

/// Progress notifications for embedding hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEvent {
    Finished {
        iterations: usize,
        wins: usize,
        losses: usize,
    },
}

/// Primary entry point for running a batch of solver games.
pub struct SimulationRunner {
    config: SimulationConfig,
    outputs: ResolvedOutputs,
    suit_mode: SuitMode,
    events: Option<Sender<SimulationEvent>>,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub wins: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to encode a result row: {0}")]
    Json(#[from] serde_json::Error),
    #[error("solver aborted the run: {0}")]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error("suit mode {0} is not playable (expected 1, 2 or 4 suits)")]
    SuitMode(u8),
}

#[derive(Debug, Serialize)]
struct GameLogRow {
    run_id: String,
    game_index: usize,
    seed: u64,
    suits: u8,
    outcome: &'static str,
    foundations: usize,
    duration_ms: f64,
}

impl SimulationRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: SimulationConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let suit_mode = config
            .games
            .mode()
            .ok_or(RunnerError::SuitMode(config.games.suit_mode))?;
        Ok(Self {
            config,
            outputs,
            suit_mode,
            events: None,
        })
    }

    pub fn with_events(mut self, sender: Sender<SimulationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Execute the batch, streaming one JSONL row per game. Each game gets a
    /// fresh seed drawn from the master RNG, so a fixed config seed
    /// reproduces the whole batch exactly.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut tally = WinLossTally::default();
        let mut rows_written = 0usize;

        for game_index in 0..self.config.games.iterations {
            let seed = rng.next_u64();
            let mut game = SpiderGame::with_seed(seed);
            game.set_suit_mode(self.suit_mode);

            let mut solver = Solver::new();
            if let Some(ms) = self.config.pacing_ms {
                solver = solver.with_pacing(Duration::from_millis(ms));
            }

            let start = Instant::now();
            let outcome = solver.play_game(&mut game)?;
            let duration = start.elapsed();
            tally.record(outcome, game.foundations_completed(), duration);

            if tracing::enabled!(Level::INFO) {
                event!(
                    target: "spider_bench::simulation",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index,
                    seed,
                    outcome = ?outcome,
                    foundations = game.foundations_completed(),
                    "game finished"
                );
            }

            let row = GameLogRow {
                run_id: self.config.run_id.clone(),
                game_index,
                seed,
                suits: self.suit_mode.suit_count(),
                outcome: match outcome {
                    GameOutcome::Won => "won",
                    GameOutcome::Lost => "lost",
                },
                foundations: game.foundations_completed(),
                duration_ms: duration.as_secs_f64() * 1000.0,
            };
            serde_json::to_writer(&mut writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;
        }

        writer.flush()?;

        let (games_played, wins) = (tally.games(), tally.wins());
        let summary = tally.into_summary(
            self.config.run_id.clone(),
            self.suit_mode.suit_count(),
        )?;
        summary.write_markdown(&self.outputs.summary_md)?;

        event!(
            target: "spider_bench::simulation",
            Level::INFO,
            run_id = %self.config.run_id,
            games = games_played,
            wins,
            "simulation complete"
        );
        self.emit(SimulationEvent::Finished {
            iterations: games_played,
            wins,
            losses: games_played - wins,
        });

        Ok(RunSummary {
            games_played,
            wins,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
        })
    }

    fn emit(&self, event: SimulationEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
