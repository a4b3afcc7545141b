//! Ranking and bracket engine
//!
//! This crate provides:
//! - An Elo rating engine with adaptive sensitivity and team games
//! - A consensus bracket that settles reported results up an n-ary tree
//! - TOML tournament scripts and simulated series for both
//!
//! # Usage
//!
//! ```bash
//! # Replay the games of a script and print the leaderboard
//! cargo run -p tournament -- rate season.toml
//!
//! # Replay the reports of a script and print the bracket
//! cargo run -p tournament -- bracket season.toml
//!
//! # Watch ratings converge on simulated players
//! cargo run -p tournament -- simulate --players 8 --games 1000 --seed 1
//! ```

mod bracket;
mod elo;
mod match_runner;
mod results;

pub use bracket::*;
pub use elo::*;
pub use match_runner::*;
pub use rank_core::{Frequency, NodeId, Split, Tally, TreeError, Weighting};
pub use results::*;
