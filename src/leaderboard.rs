use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use rayon::prelude::*;

use crate::error::{LoadError, SourceKind};
use crate::model::{CacheKey, PlayerLeaderboardRow, RankedPlayer, Scope, columns};
use crate::table::Table;

/// Rows decoded from an artifact plus how many were dropped as malformed.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

pub const REQUIRED_COLUMNS: [&str; 6] = [
    columns::USER_ID,
    columns::NAME,
    columns::COUNTRY_CODE,
    columns::LEADERBOARD_ID,
    columns::GAME_TYPE,
    columns::LEADERBOARD_RATING,
];

pub fn leaderboard_rows(
    table: &Table,
    path: &Path,
) -> Result<Parsed<PlayerLeaderboardRow>, LoadError> {
    table.require_columns(SourceKind::Leaderboard, path, &REQUIRED_COLUMNS)?;

    let mut rows = Vec::with_capacity(table.len());
    let mut skipped = 0usize;
    for row in table.rows() {
        let player_id = row.get(columns::USER_ID).as_i64();
        let game_type = row.get(columns::GAME_TYPE).as_text();
        let scope = row
            .get(columns::LEADERBOARD_ID)
            .as_text()
            .and_then(|raw| Scope::parse(&raw));
        let rating = row.get(columns::LEADERBOARD_RATING).as_finite();
        let (Some(player_id), Some(game_type), Some(scope), Some(rating)) =
            (player_id, game_type, scope, rating)
        else {
            skipped += 1;
            continue;
        };

        rows.push(PlayerLeaderboardRow {
            player_id,
            player_name: row
                .get(columns::NAME)
                .as_text()
                .unwrap_or_else(|| format!("Player_{player_id}")),
            country_code: row
                .get(columns::COUNTRY_CODE)
                .as_text()
                .map(|code| code.to_ascii_uppercase()),
            game_type,
            scope,
            rating,
            games_played: row
                .get(columns::GAMES_PLAYED)
                .as_i64()
                .and_then(|v| u64::try_from(v).ok()),
            start_time: row.get(columns::START_TIME).as_timestamp(),
        });
    }
    Ok(Parsed { rows, skipped })
}

/// Every (scope, game type) leaderboard, sorted and ranked up front so a
/// request is a single map lookup.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardCache {
    entries: BTreeMap<CacheKey, Vec<RankedPlayer>>,
}

/// Build the cache for every key present in `rows`, plus a `global` entry per
/// game type that merges all scopes. A player listed more than once under a
/// key keeps only the row with the latest `start_time` (first wins on ties).
pub fn preprocess_leaderboard(rows: &[PlayerLeaderboardRow]) -> LeaderboardCache {
    let mut groups: HashMap<CacheKey, HashMap<i64, usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let global = CacheKey::new(Scope::Global, row.game_type.clone());
        let own = CacheKey::new(row.scope.clone(), row.game_type.clone());
        let keys = if own == global {
            vec![global]
        } else {
            vec![own, global]
        };
        for key in keys {
            let slot = groups.entry(key).or_default();
            slot.entry(row.player_id)
                .and_modify(|current| {
                    if rows[idx].start_time > rows[*current].start_time {
                        *current = idx;
                    }
                })
                .or_insert(idx);
        }
    }

    let entries = groups
        .into_par_iter()
        .map(|(key, players)| {
            let latest: Vec<&PlayerLeaderboardRow> =
                players.values().map(|&idx| &rows[idx]).collect();
            (key, rank_players(latest))
        })
        .collect();

    LeaderboardCache { entries }
}

/// Rating descending, player id ascending on ties, ranks recomputed from 1.
fn rank_players(mut players: Vec<&PlayerLeaderboardRow>) -> Vec<RankedPlayer> {
    players.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    players
        .into_iter()
        .enumerate()
        .map(|(idx, row)| RankedPlayer {
            rank: idx + 1,
            player_id: row.player_id,
            player_name: row.player_name.clone(),
            country_code: row.country_code.clone().unwrap_or_default(),
            rating: row.rating,
            games_played: row.games_played,
        })
        .collect()
}

impl LeaderboardCache {
    pub fn get(&self, scope: &Scope, game_type: &str) -> Option<&[RankedPlayer]> {
        self.entries
            .get(&CacheKey::new(scope.clone(), game_type))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &[RankedPlayer])> {
        self.entries.iter().map(|(key, rows)| (key, rows.as_slice()))
    }

    pub fn game_types(&self) -> BTreeSet<&str> {
        self.entries.keys().map(|k| k.game_type.as_str()).collect()
    }

    pub fn has_game_type(&self, game_type: &str) -> bool {
        self.entries.contains_key(&CacheKey::new(Scope::Global, game_type))
    }

    /// Non-global scopes that have at least one entry.
    pub fn scopes(&self) -> BTreeSet<&Scope> {
        self.entries
            .keys()
            .map(|k| &k.scope)
            .filter(|s| **s != Scope::Global)
            .collect()
    }

    pub fn has_scope(&self, scope: &Scope) -> bool {
        *scope == Scope::Global || self.entries.keys().any(|k| k.scope == *scope)
    }

    /// Global-scope position of a player, for enriching other views.
    pub fn global_position(&self, game_type: &str, player_id: i64) -> Option<&RankedPlayer> {
        self.get(&Scope::Global, game_type)?
            .iter()
            .find(|p| p.player_id == player_id)
    }
}
