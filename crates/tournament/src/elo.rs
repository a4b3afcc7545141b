//! Elo rating calculation and tracking
//!
//! Ratings follow a base-2 logistic model: a competitor rated
//! `STRENGTH_SPREAD` points above another is expected to win twice as often.
//! Every game is evaluated against the ratings as they stood before the game
//! and all deltas are applied together.

use rank_core::Tally;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use tracing::{debug, trace};

/// Default starting mean for a fresh engine
pub const DEFAULT_ELO: f64 = 1500.0;

/// Base of the strength curve
pub const STRENGTH_BASE: f64 = 2.0;

/// Rating gap that doubles the odds of winning
pub const STRENGTH_SPREAD: f64 = 150.0;

/// Rating change scale before the sensitivity factor
pub const BASE_CHANGE: f64 = 30.0;

/// Number of recent results remembered per competitor
pub const FORM_CAPACITY: usize = 16;

/// Sensitivity used while a competitor is still being positioned
pub const BOOTSTRAP_K: f64 = 1.66;

/// Offset added to (or subtracted from) the recent form once positioned
pub const FORM_BIAS: f64 = 1.1;

/// Games a newcomer plays with the bootstrap sensitivity
pub const DEFAULT_POSITIONING_GAMES: u32 = 8;

/// Which participant count drives the loss contribution of a team game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormUnit {
    /// `n` is the number of teams
    #[default]
    Teams,
    /// `n` is the number of players across all teams
    Players,
}

/// Rating engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Mean rating of an engine that has not seen any game
    pub initial_mean: f64,
    /// Scale rating changes by recent form
    pub adaptive: bool,
    /// Games played with `BOOTSTRAP_K` before form takes over
    pub positioning_games: u32,
    pub form_unit: FormUnit,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_mean: DEFAULT_ELO,
            adaptive: true,
            positioning_games: DEFAULT_POSITIONING_GAMES,
            form_unit: FormUnit::Teams,
        }
    }
}

/// Reasons a game submission is rejected. The engine is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("a game needs at least one winner")]
    NoWinners,
    #[error("a game needs at least one participant")]
    NoParticipants,
    #[error("a competitor appears more than once in the same game")]
    DuplicateCompetitor,
    #[error("all teams must have the same size: expected {expected}, found {found}")]
    TeamSizeMismatch { expected: usize, found: usize },
}

/// Per-competitor standing
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub rating: f64,
    pub wins: u32,
    pub losses: u32,
    /// Signed per-game contributions, oldest first
    form: VecDeque<f64>,
}

impl RatingRecord {
    fn new(rating: f64) -> Self {
        Self {
            rating,
            wins: 0,
            losses: 0,
            form: VecDeque::with_capacity(FORM_CAPACITY),
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Recent per-game contributions, oldest first.
    pub fn form(&self) -> impl Iterator<Item = f64> + '_ {
        self.form.iter().copied()
    }

    pub fn form_sum(&self) -> f64 {
        self.form.iter().sum()
    }

    /// Form sum as it would read after recording `contribution`.
    fn form_sum_with(&self, contribution: f64) -> f64 {
        let evicted = if self.form.len() == FORM_CAPACITY {
            self.form.front().copied().unwrap_or(0.0)
        } else {
            0.0
        };
        self.form_sum() - evicted + contribution
    }

    fn record_form(&mut self, contribution: f64) {
        if self.form.len() == FORM_CAPACITY {
            self.form.pop_front();
        }
        self.form.push_back(contribution);
    }
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing<C> {
    pub competitor: C,
    pub rating: i64,
    pub wins: u32,
    pub losses: u32,
}

/// Pending change for one participant of a game
struct Update<C> {
    competitor: C,
    delta: f64,
    won: bool,
    contribution: f64,
}

/// Elo rating system for individual and team games
#[derive(Debug, Clone)]
pub struct RatingEngine<C> {
    config: RatingConfig,
    records: HashMap<C, RatingRecord>,
    /// Ratings ordered for iteration
    standings: Tally<C>,
    mean: f64,
    total_games: u64,
}

impl<C: Eq + Hash + Clone> Default for RatingEngine<C> {
    fn default() -> Self {
        Self::new(RatingConfig::default())
    }
}

impl<C: Eq + Hash + Clone> RatingEngine<C> {
    pub fn new(config: RatingConfig) -> Self {
        Self {
            mean: config.initial_mean,
            config,
            records: HashMap::new(),
            standings: Tally::new(),
            total_games: 0,
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Record a game where every winner beat every loser.
    ///
    /// Winners share the win evenly. Unknown competitors join at the current
    /// mean rating.
    pub fn submit_game(&mut self, winners: &[C], losers: &[C]) -> Result<(), RatingError> {
        if winners.is_empty() {
            return Err(RatingError::NoWinners);
        }
        ensure_distinct(winners.iter().chain(losers))?;

        let participants = winners.len() + losers.len();
        let top = strongest(winners.iter().chain(losers).map(|c| self.current_rating(c)));
        let pool: f64 = winners
            .iter()
            .chain(losers)
            .map(|c| strength(self.current_rating(c) - top))
            .sum();
        let winner_share = 1.0 / winners.len() as f64;
        let loss_contribution = -1.0 / participants.saturating_sub(1).max(1) as f64;

        let sides = winners
            .iter()
            .map(|c| (c, true))
            .chain(losers.iter().map(|c| (c, false)));
        let updates: Vec<Update<C>> = sides
            .map(|(competitor, won)| {
                let expected = strength(self.current_rating(competitor) - top) / pool;
                let actual = if won { winner_share } else { 0.0 };
                let contribution = if won { 1.0 } else { loss_contribution };
                let k = self.sensitivity(competitor, contribution, won);
                Update {
                    competitor: competitor.clone(),
                    delta: (actual - expected) * BASE_CHANGE * k,
                    won,
                    contribution,
                }
            })
            .collect();

        self.apply(updates);
        debug!(
            winners = winners.len(),
            losers = losers.len(),
            mean = self.mean,
            total_games = self.total_games,
            "game accepted"
        );
        Ok(())
    }

    /// Record a game between equally sized teams.
    ///
    /// Each team is first rated as a whole from the mean rating of its
    /// members; the team delta is then split between members according to
    /// their expected share within the team.
    pub fn submit_team_game<T: AsRef<[C]>>(
        &mut self,
        winning_teams: &[T],
        losing_teams: &[T],
    ) -> Result<(), RatingError> {
        let Some(first) = winning_teams.first() else {
            return Err(RatingError::NoWinners);
        };
        let size = first.as_ref().len();
        for team in winning_teams.iter().chain(losing_teams) {
            let found = team.as_ref().len();
            if found != size {
                return Err(RatingError::TeamSizeMismatch {
                    expected: size,
                    found,
                });
            }
        }
        if size == 0 {
            return Err(RatingError::NoParticipants);
        }
        ensure_distinct(
            winning_teams
                .iter()
                .chain(losing_teams)
                .flat_map(|team| team.as_ref()),
        )?;

        let teams: Vec<(&[C], bool)> = winning_teams
            .iter()
            .map(|team| (team.as_ref(), true))
            .chain(losing_teams.iter().map(|team| (team.as_ref(), false)))
            .collect();
        let team_ratings: Vec<f64> = teams
            .iter()
            .map(|(members, _)| {
                members.iter().map(|c| self.current_rating(c)).sum::<f64>() / size as f64
            })
            .collect();
        let team_top = strongest(team_ratings.iter().copied());
        let pool: f64 = team_ratings
            .iter()
            .map(|&rating| strength(rating - team_top))
            .sum();
        let winner_share = 1.0 / winning_teams.len() as f64;
        let form_count = match self.config.form_unit {
            FormUnit::Teams => teams.len(),
            FormUnit::Players => teams.len() * size,
        };
        let loss_contribution = -1.0 / form_count.saturating_sub(1).max(1) as f64;

        let mut updates = Vec::with_capacity(teams.len() * size);
        for (&(members, won), &team_rating) in teams.iter().zip(&team_ratings) {
            let actual = if won { winner_share } else { 0.0 };
            let team_delta = (actual - strength(team_rating - team_top) / pool) * BASE_CHANGE;
            let member_top = strongest(members.iter().map(|c| self.current_rating(c)));
            let inner_pool: f64 = members
                .iter()
                .map(|c| strength(self.current_rating(c) - member_top))
                .sum();
            let contribution = if won { 1.0 } else { loss_contribution };

            for competitor in members {
                let expected = strength(self.current_rating(competitor) - member_top) / inner_pool;
                let share = member_share(expected, size, team_delta >= 0.0);
                let k = self.sensitivity(competitor, contribution, won);
                updates.push(Update {
                    competitor: competitor.clone(),
                    delta: team_delta * size as f64 * share * k,
                    won,
                    contribution,
                });
            }
        }

        self.apply(updates);
        debug!(
            winning_teams = winning_teams.len(),
            losing_teams = losing_teams.len(),
            team_size = size,
            mean = self.mean,
            total_games = self.total_games,
            "team game accepted"
        );
        Ok(())
    }

    /// Rounded rating, or the rounded mean for a competitor never seen.
    pub fn score(&self, competitor: &C) -> i64 {
        self.current_rating(competitor).round() as i64
    }

    /// Exact rating of a known competitor.
    pub fn rating(&self, competitor: &C) -> Option<f64> {
        self.records.get(competitor).map(|record| record.rating)
    }

    pub fn record(&self, competitor: &C) -> Option<&RatingRecord> {
        self.records.get(competitor)
    }

    pub fn wins(&self, competitor: &C) -> u32 {
        self.records.get(competitor).map_or(0, |record| record.wins)
    }

    pub fn losses(&self, competitor: &C) -> u32 {
        self.records.get(competitor).map_or(0, |record| record.losses)
    }

    pub fn num_games(&self, competitor: &C) -> u32 {
        self.records.get(competitor).map_or(0, RatingRecord::games)
    }

    /// Number of accepted game submissions.
    pub fn total_games(&self) -> u64 {
        self.total_games
    }

    /// Running mean of all ratings.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of competitors seen so far.
    pub fn population(&self) -> usize {
        self.records.len()
    }

    /// Competitors with their rounded rating, highest first.
    pub fn iter(&self) -> impl Iterator<Item = (&C, i64)> + '_ {
        self.standings
            .iter()
            .map(|(competitor, rating)| (competitor, rating.round() as i64))
    }

    /// Get a sorted leaderboard
    pub fn leaderboard(&self) -> Vec<Standing<C>> {
        self.iter()
            .map(|(competitor, rating)| Standing {
                competitor: competitor.clone(),
                rating,
                wins: self.wins(competitor),
                losses: self.losses(competitor),
            })
            .collect()
    }

    /// Probability that `side` wins against `others` under the current ratings.
    pub fn expected_score(&self, side: &[C], others: &[C]) -> f64 {
        let top = strongest(side.iter().chain(others).map(|c| self.current_rating(c)));
        let own: f64 = side
            .iter()
            .map(|c| strength(self.current_rating(c) - top))
            .sum();
        let rest: f64 = others
            .iter()
            .map(|c| strength(self.current_rating(c) - top))
            .sum();
        if own + rest == 0.0 {
            return 0.5;
        }
        own / (own + rest)
    }

    fn current_rating(&self, competitor: &C) -> f64 {
        self.rating(competitor).unwrap_or(self.mean)
    }

    /// Sensitivity factor `k` for one participant, evaluated before the
    /// game is applied.
    fn sensitivity(&self, competitor: &C, contribution: f64, won: bool) -> f64 {
        if !self.config.adaptive {
            return 1.0;
        }
        let (games, form_sum) = match self.records.get(competitor) {
            Some(record) => (record.games(), record.form_sum_with(contribution)),
            None => (0, contribution),
        };
        if games <= self.config.positioning_games {
            return BOOTSTRAP_K;
        }
        let bias = if won { FORM_BIAS } else { -FORM_BIAS };
        (form_sum / f64::from(self.config.positioning_games.max(1)) + bias).abs()
    }

    fn apply(&mut self, updates: Vec<Update<C>>) {
        let entry_mean = self.mean;
        for update in &updates {
            if !self.records.contains_key(&update.competitor) {
                self.records
                    .insert(update.competitor.clone(), RatingRecord::new(entry_mean));
            }
        }
        let population = self.records.len() as f64;

        let mut total_delta = 0.0;
        for update in updates {
            let adaptive = self.config.adaptive;
            let Some(record) = self.records.get_mut(&update.competitor) else {
                continue;
            };
            record.rating += update.delta;
            if update.won {
                record.wins += 1;
            } else {
                record.losses += 1;
            }
            if adaptive {
                record.record_form(update.contribution);
            }
            trace!(delta = update.delta, rating = record.rating, "rating updated");
            let rating = record.rating;
            total_delta += update.delta;
            self.standings.put(update.competitor, rating);
        }

        self.mean += total_delta / population;
        self.total_games += 1;
    }
}

/// Relative playing strength for a rating.
///
/// Overflows for ratings far from zero, so pools pass the difference to
/// their strongest member.
pub fn strength(rating: f64) -> f64 {
    STRENGTH_BASE.powf(rating / STRENGTH_SPREAD)
}

/// Highest of `ratings`. Strengths taken relative to it stay within `(0, 1]`.
fn strongest(ratings: impl IntoIterator<Item = f64>) -> f64 {
    ratings.into_iter().fold(f64::NEG_INFINITY, f64::max)
}

/// Share of a team delta carried by one member.
///
/// A team that gained rating credits its weaker members more; a team that
/// lost rating charges its stronger members more. Shares sum to one.
fn member_share(expected: f64, team_size: usize, gained: bool) -> f64 {
    if !gained {
        return expected;
    }
    if team_size <= 1 {
        return 1.0;
    }
    (1.0 - expected) / (team_size - 1) as f64
}

fn ensure_distinct<'a, C, I>(competitors: I) -> Result<(), RatingError>
where
    C: Eq + Hash + 'a,
    I: IntoIterator<Item = &'a C>,
{
    let mut seen = HashSet::new();
    for competitor in competitors {
        if !seen.insert(competitor) {
            return Err(RatingError::DuplicateCompetitor);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "elo_tests.rs"]
mod elo_tests;
