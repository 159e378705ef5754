//! Confidence-factor handicap for nation scores.
//!
//! Small samples are pulled toward zero by adding a shared smoothing constant
//! to the game count: `adjusted = raw% * n / (n + cf)`. With `n = 0` the result
//! is 0, as `cf -> 0` it approaches the raw percentage, and as `cf` grows
//! relative to `n` it approaches 0. Everything here is pure.

use serde::Serialize;

use crate::json_safe::{round1, round2};

/// Scale of the published `total_score` column.
pub const RANKING_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Handicap {
    pub k_value: f64,
    pub confidence_factor: f64,
    pub min_games_required: f64,
}

impl Handicap {
    /// `k = avg / 2`, `cf = 2k`, minimum games `k / 4`.
    pub fn from_average_games(avg_games: f64) -> Self {
        let k_value = if avg_games.is_finite() { avg_games.max(0.0) / 2.0 } else { 0.0 };
        Self::from_k(k_value)
    }

    pub fn from_k(k_value: f64) -> Self {
        Self {
            k_value,
            confidence_factor: 2.0 * k_value,
            min_games_required: k_value / 4.0,
        }
    }

    /// Baked values win over derived ones; missing pieces are derived from `k`.
    pub fn resolve(
        k_value: Option<f64>,
        confidence_factor: Option<f64>,
        min_games_required: Option<f64>,
        avg_games: f64,
    ) -> Self {
        let k_value = k_value
            .or_else(|| confidence_factor.map(|cf| cf / 2.0))
            .unwrap_or_else(|| Self::from_average_games(avg_games).k_value);
        let derived = Self::from_k(k_value);
        Self {
            k_value,
            confidence_factor: confidence_factor.unwrap_or(derived.confidence_factor),
            min_games_required: min_games_required.unwrap_or(derived.min_games_required),
        }
    }

    pub fn meets_minimum(&self, total_games: u64) -> bool {
        total_games as f64 >= self.min_games_required
    }
}

/// Mean of `total_games` over the nations of one game type; 0 when empty.
pub fn average_games(totals: impl IntoIterator<Item = u64>) -> f64 {
    let (sum, count) = totals
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), games| (sum.saturating_add(games), count + 1));
    if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NationTally {
    pub wins: i64,
    pub losses: i64,
    pub total_games: u64,
}

impl NationTally {
    /// wins = sum of positive net scores, losses = |sum of negative ones|.
    pub fn from_scores(scores: impl IntoIterator<Item = i64>, total_games: u64) -> Self {
        let (wins, losses) = scores.into_iter().fold((0i64, 0i64), |(w, l), score| {
            if score > 0 {
                (w.saturating_add(score), l)
            } else {
                (w, l.saturating_add(score.saturating_neg()))
            }
        });
        Self {
            wins,
            losses,
            total_games,
        }
    }

    pub fn differential(&self) -> i64 {
        self.wins.saturating_sub(self.losses)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlayerDistribution {
    pub positive_players: usize,
    pub negative_players: usize,
    pub zero_players: usize,
}

impl PlayerDistribution {
    pub fn from_scores(scores: impl IntoIterator<Item = i64>) -> Self {
        let mut out = Self::default();
        for score in scores {
            match score.signum() {
                1 => out.positive_players += 1,
                -1 => out.negative_players += 1,
                _ => out.zero_players += 1,
            }
        }
        out
    }
}

/// `(wins - losses) / total_games * 100`, 0 without games.
pub fn raw_percentage(tally: &NationTally) -> f64 {
    if tally.total_games == 0 {
        0.0
    } else {
        tally.differential() as f64 / tally.total_games as f64 * 100.0
    }
}

pub fn adjusted_score(raw_percentage: f64, total_games: u64, confidence_factor: f64) -> f64 {
    let n = total_games as f64;
    let denom = n + confidence_factor.max(0.0);
    if total_games == 0 || denom <= 0.0 {
        0.0
    } else {
        raw_percentage * n / denom
    }
}

/// The pipeline's `total_score` scale: `(w - l) / (n + cf) * 10000`, rounded.
pub fn ranking_score(tally: &NationTally, confidence_factor: f64) -> f64 {
    let denom = tally.total_games as f64 + confidence_factor.max(0.0);
    if denom <= 0.0 {
        0.0
    } else {
        (tally.differential() as f64 / denom * RANKING_SCALE).round()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandicapInfo {
    pub k_value: f64,
    pub confidence_factor: f64,
    pub min_games_required: f64,
    pub meets_minimum: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTotals {
    pub total_wins: i64,
    pub total_losses: i64,
    pub net_score: i64,
    pub win_rate_percentage: f64,
}

/// Every intermediate of one nation's score, for the explanation view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub raw_percentage: f64,
    pub adjusted_score: f64,
    pub ranking_score: f64,
    pub total_games: u64,
    pub handicap_info: HandicapInfo,
    pub player_distribution: PlayerDistribution,
    pub score_breakdown: ScoreTotals,
}

pub fn score(tally: &NationTally, handicap: &Handicap, distribution: PlayerDistribution) -> ScoreBreakdown {
    let raw = raw_percentage(tally);
    let win_rate = if tally.total_games == 0 {
        0.0
    } else {
        round1(tally.wins as f64 / tally.total_games as f64 * 100.0)
    };
    ScoreBreakdown {
        raw_percentage: round2(raw),
        adjusted_score: round2(adjusted_score(raw, tally.total_games, handicap.confidence_factor)),
        ranking_score: ranking_score(tally, handicap.confidence_factor),
        total_games: tally.total_games,
        handicap_info: HandicapInfo {
            k_value: round1(handicap.k_value),
            confidence_factor: round1(handicap.confidence_factor),
            min_games_required: round1(handicap.min_games_required),
            meets_minimum: handicap.meets_minimum(tally.total_games),
        },
        player_distribution: distribution,
        score_breakdown: ScoreTotals {
            total_wins: tally.wins,
            total_losses: tally.losses,
            net_score: tally.differential(),
            win_rate_percentage: win_rate,
        },
    }
}
