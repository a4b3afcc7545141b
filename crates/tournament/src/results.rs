//! Tournament scripts and standings reports
//!
//! A script is a TOML file replayed through the rating engine and the
//! bracket:
//!
//! ```toml
//! [rating]
//! positioning_games = 4
//!
//! [bracket]
//! branching_factor = 2
//!
//! [[game]]
//! winners = ["alice"]
//! losers = ["bob", "carol"]
//!
//! [[game]]
//! winners = [["alice", "dave"]]
//! losers = [["bob", "carol"]]
//!
//! [[report]]
//! labels = ["alice"]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::bracket::{ArchivePolicy, BracketConfig, BracketError, BracketTree, WeightingKind};
use crate::elo::{RatingConfig, RatingEngine, RatingError};

/// Errors raised while loading or replaying a script
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("game #{index} rejected: {source}")]
    Game { index: usize, source: RatingError },
    #[error("report #{index} rejected: {source}")]
    Report { index: usize, source: BracketError },
    #[error("invalid bracket settings: {0}")]
    Bracket(BracketError),
}

/// Bracket settings as written in a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketSettings {
    pub branching_factor: usize,
    pub prune_depth: usize,
    pub weighting: WeightingKind,
    pub archive_policy: ArchivePolicy,
}

impl Default for BracketSettings {
    fn default() -> Self {
        Self {
            branching_factor: 4,
            prune_depth: 0,
            weighting: WeightingKind::Frequency,
            archive_policy: ArchivePolicy::Retain,
        }
    }
}

impl BracketSettings {
    pub fn to_config(&self) -> BracketConfig {
        BracketConfig::new(self.branching_factor)
            .with_prune_depth(self.prune_depth)
            .with_weighting(self.weighting.strategy())
            .with_archive_policy(self.archive_policy)
    }
}

/// A single game entry: either individual players or teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameEntry {
    Teams {
        winners: Vec<Vec<String>>,
        #[serde(default)]
        losers: Vec<Vec<String>>,
    },
    Players {
        winners: Vec<String>,
        #[serde(default)]
        losers: Vec<String>,
    },
}

/// A match report for the bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub labels: Vec<String>,
}

/// Complete tournament script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentScript {
    pub rating: RatingConfig,
    pub bracket: BracketSettings,
    #[serde(rename = "game")]
    pub games: Vec<GameEntry>,
    #[serde(rename = "report")]
    pub reports: Vec<ReportEntry>,
}

impl TournamentScript {
    /// Load a script from a TOML file
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ScriptError> {
        Ok(toml::from_str(contents)?)
    }

    /// Replay every game, in order, through a fresh rating engine.
    pub fn replay_ratings(&self) -> Result<RatingEngine<String>, ScriptError> {
        let mut engine = RatingEngine::new(self.rating.clone());
        for (index, game) in self.games.iter().enumerate() {
            let outcome = match game {
                GameEntry::Players { winners, losers } => engine.submit_game(winners, losers),
                GameEntry::Teams { winners, losers } => {
                    engine.submit_team_game(winners.as_slice(), losers.as_slice())
                }
            };
            outcome.map_err(|source| ScriptError::Game { index, source })?;
        }
        Ok(engine)
    }

    /// Replay every report, in order, through a fresh bracket.
    pub fn replay_bracket(&self) -> Result<BracketTree, ScriptError> {
        let mut bracket =
            BracketTree::new(self.bracket.to_config()).map_err(ScriptError::Bracket)?;
        for (index, report) in self.reports.iter().enumerate() {
            bracket
                .push(report.labels.iter().cloned())
                .map_err(|source| ScriptError::Report { index, source })?;
        }
        Ok(bracket)
    }
}

/// Generate a text leaderboard
pub fn leaderboard_report<C>(engine: &RatingEngine<C>) -> String
where
    C: Display + Eq + std::hash::Hash + Clone,
{
    let mut report = String::new();
    report.push_str("\n=== Leaderboard ===\n");
    report.push_str(&format!(
        "{:<30} {:>8} {:>6} {:>6}\n",
        "Competitor", "Elo", "W", "L"
    ));
    report.push_str(&"-".repeat(53));
    report.push('\n');
    for standing in engine.leaderboard() {
        report.push_str(&format!(
            "{:<30} {:>8} {:>6} {:>6}\n",
            standing.competitor.to_string(),
            standing.rating,
            standing.wins,
            standing.losses
        ));
    }
    report.push_str(&format!(
        "\nGames: {}, mean rating: {:.1}\n",
        engine.total_games(),
        engine.mean()
    ));
    report
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod results_tests;
