use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_json::{Map, Value};

use crate::confidence::average_games;
use crate::countries::CountryNameMap;
use crate::error::{LoadError, SourceKind};
use crate::json_safe::safe_json_convert;
use crate::leaderboard::Parsed;
use crate::model::{ContributionRecord, NationRankingRow, PlayerContribution, columns};
use crate::table::{Cell, RowRef, Table};

pub const NATION_COLUMNS: [&str; 4] = [
    columns::GAME_TYPE,
    columns::COUNTRY_CODE,
    columns::TOTAL_SCORE,
    columns::TOTAL_GAMES,
];

pub const CONTRIBUTION_COLUMNS: [&str; 5] = [
    columns::GAME_TYPE,
    columns::COUNTRY_CODE,
    columns::USER_ID,
    columns::NAME,
    columns::SCORE,
];

fn country_code(row: &RowRef<'_>) -> Option<String> {
    row.get(columns::COUNTRY_CODE)
        .as_text()
        .map(|code| code.to_ascii_uppercase())
}

fn country_name(row: &RowRef<'_>, code: &str, countries: &CountryNameMap) -> String {
    row.get(columns::COUNTRY_NAME)
        .as_text()
        .unwrap_or_else(|| countries.display_name(code))
}

/// Nation-ranking columns with a typed meaning; everything else passes through.
const NATION_TYPED_COLUMNS: [&str; 12] = [
    columns::GAME_TYPE,
    columns::COUNTRY_CODE,
    columns::COUNTRY_NAME,
    columns::RANK,
    columns::TOTAL_SCORE,
    columns::RAW_SCORE,
    columns::TOTAL_GAMES,
    columns::TOTAL_PLAYERS,
    columns::K_VALUE,
    columns::CONFIDENCE_FACTOR,
    columns::MIN_GAMES_REQUIRED,
    columns::TOP_CONTRIBUTORS,
];

fn passthrough(table: &Table, row: &RowRef<'_>) -> Map<String, Value> {
    table
        .columns()
        .iter()
        .filter(|name| !NATION_TYPED_COLUMNS.contains(&name.as_str()))
        .map(|name| (name.clone(), safe_json_convert(&row.get(name).infer_scalar())))
        .collect()
}

fn non_negative(cell: &Cell) -> Option<u64> {
    cell.as_i64().and_then(|v| u64::try_from(v).ok())
}

/// Decode `top_contributors`, either a nested list column or its JSON text form.
fn contributors(cell: &Cell) -> Vec<PlayerContribution> {
    let Some(items) = cell.as_list() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let name = item.field(columns::NAME).as_text()?;
            let score = item.field(columns::SCORE).as_i64().unwrap_or(0);
            Some(PlayerContribution {
                player_id: item.field(columns::USER_ID).as_i64(),
                name,
                score,
                wins: item.field(columns::WINS).as_i64().unwrap_or(score.max(0)),
            })
        })
        .collect()
}

pub fn nation_rows(
    table: &Table,
    path: &Path,
    countries: &CountryNameMap,
) -> Result<Parsed<NationRankingRow>, LoadError> {
    table.require_columns(SourceKind::NationRankings, path, &NATION_COLUMNS)?;

    let mut rows = Vec::with_capacity(table.len());
    let mut skipped = 0usize;
    for row in table.rows() {
        let (Some(game_type), Some(code), Some(total_score), Some(total_games)) = (
            row.get(columns::GAME_TYPE).as_text(),
            country_code(&row),
            row.get(columns::TOTAL_SCORE).as_finite(),
            non_negative(row.get(columns::TOTAL_GAMES)),
        ) else {
            skipped += 1;
            continue;
        };
        rows.push(NationRankingRow {
            rank: 0,
            country_name: country_name(&row, &code, countries),
            country_code: code,
            game_type,
            total_score,
            raw_differential: row.get(columns::RAW_SCORE).as_i64(),
            total_games,
            total_players: non_negative(row.get(columns::TOTAL_PLAYERS)),
            k_value: row.get(columns::K_VALUE).as_finite(),
            confidence_factor: row.get(columns::CONFIDENCE_FACTOR).as_finite(),
            min_games_required: row.get(columns::MIN_GAMES_REQUIRED).as_finite(),
            top_contributors: contributors(row.get(columns::TOP_CONTRIBUTORS)),
            extra: passthrough(table, &row),
        });
    }
    Ok(Parsed { rows, skipped })
}

pub fn contribution_rows(
    table: &Table,
    path: &Path,
    countries: &CountryNameMap,
) -> Result<Parsed<ContributionRecord>, LoadError> {
    table.require_columns(SourceKind::PlayerContributions, path, &CONTRIBUTION_COLUMNS)?;

    let mut rows = Vec::with_capacity(table.len());
    let mut skipped = 0usize;
    for row in table.rows() {
        let (Some(game_type), Some(code), Some(player_id), Some(score)) = (
            row.get(columns::GAME_TYPE).as_text(),
            country_code(&row),
            row.get(columns::USER_ID).as_i64(),
            row.get(columns::SCORE).as_i64(),
        ) else {
            skipped += 1;
            continue;
        };
        rows.push(ContributionRecord {
            country_name: country_name(&row, &code, countries),
            country_code: code,
            game_type,
            player_id,
            player_name: row
                .get(columns::NAME)
                .as_text()
                .unwrap_or_else(|| format!("Player_{player_id}")),
            score,
            wins: row.get(columns::WINS).as_i64(),
        });
    }
    Ok(Parsed { rows, skipped })
}

/// Per-nation player contributions, grouped by game type in source order.
#[derive(Debug, Clone, Default)]
pub struct Contributions {
    by_game: HashMap<String, Vec<ContributionRecord>>,
    len: usize,
}

impl Contributions {
    pub fn new(records: Vec<ContributionRecord>) -> Self {
        let len = records.len();
        let mut by_game: HashMap<String, Vec<ContributionRecord>> = HashMap::new();
        for record in records {
            by_game.entry(record.game_type.clone()).or_default().push(record);
        }
        Self { by_game, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every record of a game type; empty for an unknown game type.
    pub fn get(&self, game_type: &str) -> &[ContributionRecord] {
        self.by_game.get(game_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_game_type(&self, game_type: &str) -> bool {
        self.by_game.contains_key(game_type)
    }

    pub fn for_nation<'a>(
        &'a self,
        country_code: &'a str,
        game_type: &str,
    ) -> impl Iterator<Item = &'a ContributionRecord> + 'a {
        self.get(game_type)
            .iter()
            .filter(move |record| record.country_code == country_code)
    }
}

/// Published nation rankings, one sorted list per game type.
#[derive(Debug, Clone, Default)]
pub struct NationRankings {
    by_game: BTreeMap<String, Vec<NationRankingRow>>,
}

impl NationRankings {
    /// Sort by `total_score` descending (country code on ties), drop rows below
    /// their own baked minimum and recompute ranks from 1.
    pub fn build(rows: Vec<NationRankingRow>, contributions: Option<&Contributions>) -> Self {
        let mut by_game: BTreeMap<String, Vec<NationRankingRow>> = BTreeMap::new();
        for mut row in rows {
            if !row.meets_minimum() {
                continue;
            }
            if row.total_players.is_none()
                && let Some(contributions) = contributions
            {
                let count = contributions
                    .for_nation(&row.country_code, &row.game_type)
                    .count();
                row.total_players = Some(count as u64);
            }
            by_game.entry(row.game_type.clone()).or_default().push(row);
        }
        for rows in by_game.values_mut() {
            rows.sort_by(|a, b| {
                b.total_score
                    .total_cmp(&a.total_score)
                    .then_with(|| a.country_code.cmp(&b.country_code))
            });
            for (idx, row) in rows.iter_mut().enumerate() {
                row.rank = idx + 1;
            }
        }
        Self { by_game }
    }

    pub fn get(&self, game_type: &str) -> Option<&[NationRankingRow]> {
        self.by_game.get(game_type).map(Vec::as_slice)
    }

    pub fn find(&self, country_code: &str, game_type: &str) -> Option<&NationRankingRow> {
        self.get(game_type)?
            .iter()
            .find(|row| row.country_code == country_code)
    }

    pub fn game_types(&self) -> impl Iterator<Item = &str> {
        self.by_game.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_game.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_game.is_empty()
    }

    /// Mean `total_games` of the published nations of one game type.
    pub fn average_games(&self, game_type: &str) -> f64 {
        average_games(
            self.get(game_type)
                .unwrap_or(&[])
                .iter()
                .map(|row| row.total_games),
        )
    }
}
