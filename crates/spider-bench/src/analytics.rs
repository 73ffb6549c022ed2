use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use spider_bot::GameOutcome;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to construct the reference normal distribution")]
    Distribution,
}

/// Streaming win/loss accumulator for a batch of games.
#[derive(Debug, Default, Clone)]
pub struct WinLossTally {
    games: usize,
    wins: usize,
    foundations_total: usize,
    duration_total: Duration,
}

impl WinLossTally {
    pub fn record(&mut self, outcome: GameOutcome, foundations: usize, duration: Duration) {
        self.games += 1;
        if outcome == GameOutcome::Won {
            self.wins += 1;
        }
        self.foundations_total += foundations;
        self.duration_total += duration;
    }

    pub fn games(&self) -> usize {
        self.games
    }

    pub fn wins(&self) -> usize {
        self.wins
    }

    pub fn losses(&self) -> usize {
        self.games - self.wins
    }

    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }

    pub fn into_summary(self, run_id: String, suits: u8) -> Result<SimulationSummary, AnalyticsError> {
        let ci95 = wilson_interval(self.wins, self.games)?;
        let (avg_foundations, avg_duration_ms) = if self.games == 0 {
            (0.0, 0.0)
        } else {
            (
                self.foundations_total as f64 / self.games as f64,
                self.duration_total.as_secs_f64() * 1000.0 / self.games as f64,
            )
        };
        Ok(SimulationSummary {
            run_id,
            suits,
            games: self.games,
            wins: self.wins,
            losses: self.games - self.wins,
            win_rate: self.win_rate(),
            ci95,
            avg_foundations,
            avg_duration_ms,
        })
    }
}

/// Wilson score interval for the win proportion. With no games there is no
/// information, so the whole unit interval comes back.
pub fn wilson_interval(wins: usize, games: usize) -> Result<(f64, f64), AnalyticsError> {
    if games == 0 {
        return Ok((0.0, 1.0));
    }

    let normal = Normal::new(0.0, 1.0).map_err(|_| AnalyticsError::Distribution)?;
    let z = normal.inverse_cdf(0.5 + CONFIDENCE / 2.0);
    let n = games as f64;
    let p = wins as f64 / n;

    let z_sq = z * z;
    let denom = 1.0 + z_sq / n;
    let center = (p + z_sq / (2.0 * n)) / denom;
    let margin = (z / denom) * (p * (1.0 - p) / n + z_sq / (4.0 * n * n)).sqrt();
    Ok(((center - margin).max(0.0), (center + margin).min(1.0)))
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub run_id: String,
    pub suits: u8,
    pub games: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub ci95: (f64, f64),
    pub avg_foundations: f64,
    pub avg_duration_ms: f64,
}

impl SimulationSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Simulation Summary\n\n");
        rows.push_str(&format!(
            "Run `{}`: {} game{} in {}-suit mode\n\n",
            self.run_id,
            self.games,
            if self.games == 1 { "" } else { "s" },
            self.suits
        ));
        rows.push_str(
            "| Games | Wins | Losses | Win % | 95% CI | Avg foundations | Avg ms/game |\n",
        );
        rows.push_str(
            "|-------|------|--------|-------|--------|-----------------|-------------|\n",
        );
        rows.push_str(&format!(
            "| {games} | {wins} | {losses} | {win:.1}% | [{ci_low:.1}%, {ci_high:.1}%] | {found:.2} | {ms:.2} |\n",
            games = self.games,
            wins = self.wins,
            losses = self.losses,
            win = self.win_rate * 100.0,
            ci_low = self.ci95.0 * 100.0,
            ci_high = self.ci95.1 * 100.0,
            found = self.avg_foundations,
            ms = self.avg_duration_ms,
        ));

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}
