use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::json_safe::{serialize_rounded, serialize_rounded_opt};

/// Column names of the pipeline artifacts. These are a compatibility contract
/// with the generated files and must not be renamed.
pub mod columns {
    pub const USER_ID: &str = "user_id";
    pub const NAME: &str = "name";
    pub const COUNTRY_CODE: &str = "countryCode";
    pub const COUNTRY_NAME: &str = "country_name";
    pub const LEADERBOARD_ID: &str = "leaderboard_id";
    pub const GAME_TYPE: &str = "game_type";
    pub const LEADERBOARD_RATING: &str = "leaderboard_rating";
    pub const START_TIME: &str = "start_time";
    pub const GAMES_PLAYED: &str = "games_played";

    pub const TOTAL_SCORE: &str = "total_score";
    pub const RAW_SCORE: &str = "raw_score";
    pub const TOTAL_GAMES: &str = "total_games";
    pub const TOTAL_PLAYERS: &str = "total_players";
    pub const K_VALUE: &str = "k_value";
    pub const CONFIDENCE_FACTOR: &str = "confidence_factor";
    pub const MIN_GAMES_REQUIRED: &str = "min_games_required";
    pub const TOP_CONTRIBUTORS: &str = "top_contributors";
    pub const RANK: &str = "rank";

    pub const SCORE: &str = "score";
    pub const WINS: &str = "wins";

    pub const ISO_ALPHA2: &str = "alpha-2";
    pub const ISO_NAME: &str = "name";
}

pub const GLOBAL_SCOPE: &str = "global";

/// Which subset of players a leaderboard covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Global,
    /// A country code (upper-cased) or a region name such as `Benelux`.
    Named(String),
}

impl Scope {
    pub fn parse(raw: &str) -> Option<Scope> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.eq_ignore_ascii_case(GLOBAL_SCOPE) {
            return Some(Scope::Global);
        }
        if is_country_code(raw) {
            return Some(Scope::Named(raw.to_ascii_uppercase()));
        }
        Some(Scope::Named(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scope::Global => GLOBAL_SCOPE,
            Scope::Named(name) => name,
        }
    }

    pub fn is_country(&self) -> bool {
        matches!(self, Scope::Named(name) if is_country_code(name))
    }
}

pub fn is_country_code(raw: &str) -> bool {
    raw.len() == 2 && raw.chars().all(|c| c.is_ascii_alphabetic())
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    pub scope: Scope,
    pub game_type: String,
}

impl CacheKey {
    pub fn new(scope: Scope, game_type: impl Into<String>) -> Self {
        Self {
            scope,
            game_type: game_type.into(),
        }
    }
}

/// One row of the leaderboard artifact as produced by the rating pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerLeaderboardRow {
    pub player_id: i64,
    pub player_name: String,
    pub country_code: Option<String>,
    pub game_type: String,
    pub scope: Scope,
    pub rating: f64,
    pub games_played: Option<u64>,
    pub start_time: Option<i64>,
}

/// A leaderboard row after preprocessing: sorted and rank-annotated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub rank: usize,
    #[serde(rename = "user_id")]
    pub player_id: i64,
    #[serde(rename = "name")]
    pub player_name: String,
    #[serde(rename = "countryCode")]
    pub country_code: String,
    #[serde(rename = "leaderboard_rating", serialize_with = "serialize_rounded")]
    pub rating: f64,
    pub games_played: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerContribution {
    #[serde(rename = "user_id")]
    pub player_id: Option<i64>,
    pub name: String,
    pub score: i64,
    pub wins: i64,
}

/// One row of the player-contributions artifact: a player's net score for a nation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionRecord {
    pub game_type: String,
    pub country_code: String,
    pub country_name: String,
    pub player_id: i64,
    pub player_name: String,
    pub score: i64,
    pub wins: Option<i64>,
}

impl ContributionRecord {
    pub fn as_contribution(&self) -> PlayerContribution {
        PlayerContribution {
            player_id: Some(self.player_id),
            name: self.player_name.clone(),
            score: self.score,
            wins: self.wins.unwrap_or(self.score.max(0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationRankingRow {
    pub rank: usize,
    #[serde(rename = "countryCode")]
    pub country_code: String,
    pub country_name: String,
    pub game_type: String,
    #[serde(serialize_with = "serialize_rounded")]
    pub total_score: f64,
    #[serde(rename = "raw_score")]
    pub raw_differential: Option<i64>,
    pub total_games: u64,
    pub total_players: Option<u64>,
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub k_value: Option<f64>,
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub confidence_factor: Option<f64>,
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub min_games_required: Option<f64>,
    pub top_contributors: Vec<PlayerContribution>,
    /// Columns the server does not interpret, passed through to clients.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NationRankingRow {
    /// The baked minimum-games badge; rows without the column always qualify.
    pub fn meets_minimum(&self) -> bool {
        self.min_games_required
            .is_none_or(|min| self.total_games as f64 >= min)
    }
}
