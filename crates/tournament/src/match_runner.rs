//! Match runner for simulated games between rated competitors
//!
//! Every simulated player has a hidden rating. Games are drawn at random and
//! decided with the same strength curve the rating engine uses, which makes
//! the runner a convenient way to watch ratings converge.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::elo::{strength, RatingConfig, RatingEngine, RatingError};

/// Configuration for a simulated series
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Number of games to play
    pub num_games: u32,
    /// Number of simulated players
    pub players: usize,
    /// Players per side (1 for individual games)
    pub team_size: usize,
    /// Hidden rating of the weakest player
    pub weakest: f64,
    /// Hidden rating of the strongest player
    pub strongest: f64,
    /// Rating engine settings
    pub rating: RatingConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            num_games: 500,
            players: 8,
            team_size: 1,
            weakest: 1200.0,
            strongest: 1800.0,
            rating: RatingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("{players} players cannot fill two sides of {team_size}")]
    NotEnoughPlayers { players: usize, team_size: usize },
    #[error(transparent)]
    Rating(#[from] RatingError),
}

/// Ratings produced by a simulated series
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub engine: RatingEngine<String>,
    /// Hidden ratings, weakest first
    pub hidden: Vec<(String, f64)>,
    /// Games won by the side with the lower hidden rating
    pub upsets: u32,
}

impl MatchOutcome {
    /// Fraction of player pairs ranked in the same order as their hidden
    /// ratings.
    pub fn ordering_agreement(&self) -> f64 {
        let mut agree = 0usize;
        let mut pairs = 0usize;
        for (i, (low, _)) in self.hidden.iter().enumerate() {
            for (high, _) in &self.hidden[i + 1..] {
                pairs += 1;
                let low_rating = self.engine.rating(low).unwrap_or(self.engine.mean());
                let high_rating = self.engine.rating(high).unwrap_or(self.engine.mean());
                if high_rating > low_rating {
                    agree += 1;
                }
            }
        }
        if pairs == 0 {
            return 1.0;
        }
        agree as f64 / pairs as f64
    }
}

/// Runs simulated series
pub struct MatchRunner {
    config: MatchConfig,
}

impl MatchRunner {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Play `num_games` random games and feed them to a fresh engine.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<MatchOutcome, MatchError> {
        let config = &self.config;
        let team_size = config.team_size.max(1);
        if config.players < team_size * 2 {
            return Err(MatchError::NotEnoughPlayers {
                players: config.players,
                team_size,
            });
        }

        let hidden = self.hidden_ratings();
        let mut engine = RatingEngine::new(config.rating.clone());
        let mut upsets = 0;

        for game_num in 0..config.num_games {
            let picked = sample(rng, hidden.len(), team_size * 2).into_vec();
            let (first, second) = picked.split_at(team_size);
            let first_rating = side_rating(&hidden, first);
            let second_rating = side_rating(&hidden, second);

            let p_first = 1.0 / (1.0 + strength(second_rating - first_rating));
            let first_wins = rng.gen_bool(p_first);
            let (winners, losers) = if first_wins {
                (first, second)
            } else {
                (second, first)
            };
            if (first_wins && first_rating < second_rating)
                || (!first_wins && second_rating < first_rating)
            {
                upsets += 1;
            }

            let winners: Vec<String> = winners.iter().map(|&i| hidden[i].0.clone()).collect();
            let losers: Vec<String> = losers.iter().map(|&i| hidden[i].0.clone()).collect();
            if team_size == 1 {
                engine.submit_game(&winners, &losers)?;
            } else {
                engine.submit_team_game(&[winners], &[losers])?;
            }
            debug!(game = game_num + 1, first_wins, "simulated game");
        }

        info!(
            games = config.num_games,
            players = config.players,
            upsets,
            "simulation finished"
        );
        Ok(MatchOutcome {
            engine,
            hidden,
            upsets,
        })
    }

    /// Evenly spaced hidden ratings between the weakest and strongest player
    fn hidden_ratings(&self) -> Vec<(String, f64)> {
        let config = &self.config;
        let steps = config.players.saturating_sub(1).max(1) as f64;
        (0..config.players)
            .map(|i| {
                let rating = config.weakest + (config.strongest - config.weakest) * i as f64 / steps;
                (format!("p{:02}", i + 1), rating)
            })
            .collect()
    }
}

fn side_rating(hidden: &[(String, f64)], members: &[usize]) -> f64 {
    members.iter().map(|&i| hidden[i].1).sum::<f64>() / members.len() as f64
}

/// Quick utility to run a seeded series of individual games
pub fn quick_match(players: usize, num_games: u32, seed: u64) -> Result<MatchOutcome, MatchError> {
    let config = MatchConfig {
        players,
        num_games,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(seed);
    MatchRunner::new(config).run(&mut rng)
}

#[cfg(test)]
#[path = "match_runner_tests.rs"]
mod match_runner_tests;
