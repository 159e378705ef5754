//! Read-only request handlers over one snapshot. Each operation borrows the
//! snapshot it was given, so a request sees a single load generation.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Value, json};

use crate::confidence::{self, Handicap, NationTally, PlayerDistribution, ScoreBreakdown};
use crate::data_manager::{Snapshot, SourceStatus};
use crate::error::QueryError;
use crate::json_safe::serialize_rounded_opt;
use crate::model::{
    ContributionRecord, NationRankingRow, PlayerContribution, RankedPlayer, Scope,
};
use crate::nations::{Contributions, NationRankings};
use crate::teams::{self, TeamAnalysis, TeamRankings, TeamSearch, TeamType};

pub const TOP_CONTRIBUTORS: usize = 10;

/// A validated `limit`/`offset` pair. Without a `limit` the whole list is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn parse(limit: Option<&str>, offset: Option<&str>, max_page_size: usize) -> Result<Self, QueryError> {
        let limit = match limit.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => None,
            Some(raw) => {
                let value = raw.parse::<usize>().map_err(|_| {
                    QueryError::BadRequest(format!("limit must be a non-negative integer, got {raw:?}"))
                })?;
                if value == 0 || value > max_page_size {
                    return Err(QueryError::BadRequest(format!(
                        "limit must be between 1 and {max_page_size}, got {value}"
                    )));
                }
                Some(value)
            }
        };
        let offset = match offset.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => 0,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                QueryError::BadRequest(format!("offset must be a non-negative integer, got {raw:?}"))
            })?,
        };
        Ok(Self { offset, limit })
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit).min(items.len()),
            None => items.len(),
        };
        &items[start..end]
    }
}

fn nations(snapshot: &Snapshot) -> Result<&NationRankings, QueryError> {
    snapshot.nations.as_ref().ok_or_else(|| {
        QueryError::Unavailable("nation rankings are not available in this data generation".into())
    })
}

fn contributions(snapshot: &Snapshot) -> Result<&Contributions, QueryError> {
    snapshot.contributions.as_ref().ok_or_else(|| {
        QueryError::Unavailable("player contributions are not available in this data generation".into())
    })
}

fn team_analysis(snapshot: &Snapshot) -> Result<&TeamAnalysis, QueryError> {
    snapshot.teams.as_ref().ok_or_else(|| {
        QueryError::Unavailable("team analysis is not available in this data generation".into())
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardPage<'a> {
    pub scope: String,
    pub game_type: String,
    pub total_players: usize,
    pub offset: usize,
    pub has_more: bool,
    pub players: &'a [RankedPlayer],
}

pub fn leaderboard<'a>(
    snapshot: &'a Snapshot,
    scope: &str,
    game_type: &str,
    page: Page,
) -> Result<LeaderboardPage<'a>, QueryError> {
    let scope = Scope::parse(scope)
        .ok_or_else(|| QueryError::BadRequest("leaderboard scope must not be empty".into()))?;
    if !snapshot.leaderboards.has_game_type(game_type) {
        return Err(QueryError::NotFound(format!("unknown game type {game_type:?}")));
    }
    if !snapshot.leaderboards.has_scope(&scope) {
        return Err(QueryError::NotFound(format!("no leaderboards for scope {scope}")));
    }
    let rows = snapshot.get_leaderboard(&scope, game_type)?;
    let players = page.slice(rows);
    Ok(LeaderboardPage {
        scope: scope.to_string(),
        game_type: game_type.to_string(),
        total_players: rows.len(),
        offset: page.offset,
        has_more: page.offset.saturating_add(players.len()) < rows.len(),
        players,
    })
}

pub fn nation_rankings<'a>(
    snapshot: &'a Snapshot,
    game_type: &str,
) -> Result<&'a [NationRankingRow], QueryError> {
    nations(snapshot)?
        .get(game_type)
        .ok_or_else(|| QueryError::NotFound(format!("no nation rankings for game type {game_type:?}")))
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributionEntry<'a> {
    pub user_id: i64,
    pub name: &'a str,
    #[serde(rename = "countryCode")]
    pub country_code: &'a str,
    pub country_name: &'a str,
    pub score: i64,
}

impl<'a> From<&'a ContributionRecord> for ContributionEntry<'a> {
    fn from(record: &'a ContributionRecord) -> Self {
        Self {
            user_id: record.player_id,
            name: &record.player_name,
            country_code: &record.country_code,
            country_name: &record.country_name,
            score: record.score,
        }
    }
}

pub fn player_contributions<'a>(
    snapshot: &'a Snapshot,
    game_type: &str,
) -> Result<Vec<ContributionEntry<'a>>, QueryError> {
    let contributions = contributions(snapshot)?;
    if !contributions.has_game_type(game_type) {
        return Err(QueryError::NotFound(format!(
            "no player contributions for game type {game_type:?}"
        )));
    }
    Ok(contributions.get(game_type).iter().map(ContributionEntry::from).collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSearchResult<'a> {
    pub user_id: i64,
    pub player_name: &'a str,
    pub game_type: String,
    pub total_score: i64,
    pub global_rank: Option<usize>,
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub rating: Option<f64>,
    pub contributions: Vec<ContributionEntry<'a>>,
}

/// Case-insensitive substring search over contributing players, with each
/// player's per-nation contributions and their global leaderboard position.
pub fn search_players<'a>(
    snapshot: &'a Snapshot,
    game_type: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<PlayerSearchResult<'a>>, QueryError> {
    let contributions = contributions(snapshot)?;
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    if !contributions.has_game_type(game_type) && !snapshot.leaderboards.has_game_type(game_type) {
        return Err(QueryError::NotFound(format!("unknown game type {game_type:?}")));
    }

    let mut grouped: HashMap<i64, Vec<&ContributionRecord>> = HashMap::new();
    for record in contributions.get(game_type) {
        if record.player_name.to_lowercase().contains(&needle) {
            grouped.entry(record.player_id).or_default().push(record);
        }
    }

    let mut results: Vec<PlayerSearchResult<'a>> = grouped
        .into_iter()
        .map(|(user_id, mut records)| {
            records.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.country_code.cmp(&b.country_code)));
            let first: &'a ContributionRecord = records[0];
            let position = snapshot.leaderboards.global_position(game_type, user_id);
            PlayerSearchResult {
                user_id,
                player_name: &first.player_name,
                game_type: game_type.to_string(),
                total_score: records.iter().map(|r| r.score).sum(),
                global_rank: position.map(|p| p.rank),
                rating: position.map(|p| p.rating),
                contributions: records.into_iter().map(ContributionEntry::from).collect(),
            }
        })
        .collect();
    results.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| a.player_name.cmp(b.player_name))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    results.truncate(limit);
    Ok(results)
}

#[derive(Debug, Clone, Serialize)]
pub struct NationScoreBreakdown<'a> {
    pub country_code: &'a str,
    pub country_name: &'a str,
    pub game_type: &'a str,
    pub rank: usize,
    #[serde(serialize_with = "crate::json_safe::serialize_rounded")]
    pub total_score: f64,
    pub raw_score: i64,
    pub total_players: usize,
    #[serde(flatten)]
    pub score: ScoreBreakdown,
    pub top_contributors: Vec<PlayerContribution>,
}

/// Full confidence-factor trail for one nation, computed on demand.
pub fn nation_score_breakdown<'a>(
    snapshot: &'a Snapshot,
    country_code: &str,
    game_type: &str,
) -> Result<NationScoreBreakdown<'a>, QueryError> {
    let nations = nations(snapshot)?;
    let contributions = contributions(snapshot)?;
    let code = country_code.trim().to_ascii_uppercase();
    let row = nations.find(&code, game_type).ok_or_else(|| {
        QueryError::NotFound(format!("no ranking data for {code} in {game_type}"))
    })?;
    let players: Vec<&ContributionRecord> = contributions.for_nation(&row.country_code, game_type).collect();
    if players.is_empty() {
        return Err(QueryError::NotFound(format!(
            "no player data for {code} in {game_type}"
        )));
    }

    let scores = || players.iter().map(|p| p.score);
    let handicap = Handicap::resolve(
        row.k_value,
        row.confidence_factor,
        row.min_games_required,
        nations.average_games(game_type),
    );
    let tally = NationTally::from_scores(scores(), row.total_games);
    let score = confidence::score(&tally, &handicap, PlayerDistribution::from_scores(scores()));

    let mut top: Vec<&ContributionRecord> = players.iter().copied().filter(|p| p.score > 0).collect();
    top.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.player_name.cmp(&b.player_name)));
    top.truncate(TOP_CONTRIBUTORS);

    Ok(NationScoreBreakdown {
        country_code: &row.country_code,
        country_name: &row.country_name,
        game_type: &row.game_type,
        rank: row.rank,
        total_score: row.total_score,
        raw_score: row.raw_differential.unwrap_or_else(|| tally.differential()),
        total_players: players.len(),
        score,
        top_contributors: top.into_iter().map(ContributionRecord::as_contribution).collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeEntry {
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Combination {
    pub scope: String,
    pub game_type: String,
    pub total_players: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableLeaderboards {
    pub nations: Vec<ScopeEntry>,
    pub regions: Vec<ScopeEntry>,
    pub game_types: Vec<String>,
    pub combinations: Vec<Combination>,
}

/// Every cached (scope, game type) pair, plus the selector lists derived from them.
pub fn available_leaderboards(snapshot: &Snapshot) -> AvailableLeaderboards {
    let mut nations = Vec::new();
    let mut regions = Vec::new();
    for scope in snapshot.leaderboards.scopes() {
        let code = scope.as_str().to_string();
        if scope.is_country() {
            nations.push(ScopeEntry {
                id: code.clone(),
                name: snapshot.countries.display_name(&code),
                code,
            });
        } else {
            regions.push(ScopeEntry {
                id: code.clone(),
                name: code.clone(),
                code,
            });
        }
    }
    nations.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
    regions.sort_by(|a, b| a.name.cmp(&b.name));

    AvailableLeaderboards {
        nations,
        regions,
        game_types: snapshot.leaderboards.game_types().into_iter().map(str::to_string).collect(),
        combinations: snapshot
            .leaderboards
            .iter()
            .map(|(key, rows)| Combination {
                scope: key.scope.to_string(),
                game_type: key.game_type.clone(),
                total_players: rows.len(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Datasets {
    pub leaderboard: bool,
    pub countries: bool,
    pub nation_rankings: bool,
    pub player_contributions: bool,
    pub team_analysis: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus<'a> {
    pub status: &'static str,
    pub generation: u64,
    pub loaded_at: String,
    pub last_updated: &'a str,
    pub leaderboard_entries: usize,
    pub datasets: Datasets,
    pub sources: &'a [SourceStatus],
}

pub fn status(snapshot: &Snapshot) -> SystemStatus<'_> {
    SystemStatus {
        status: "online",
        generation: snapshot.generation,
        loaded_at: snapshot.loaded_at.to_rfc3339(),
        last_updated: &snapshot.last_updated,
        leaderboard_entries: snapshot.leaderboards.len(),
        datasets: Datasets {
            leaderboard: true,
            countries: true,
            nation_rankings: snapshot.nations.is_some(),
            player_contributions: snapshot.contributions.is_some(),
            team_analysis: snapshot.teams.is_some(),
        },
        sources: &snapshot.sources,
    }
}

pub fn team_rankings(snapshot: &Snapshot) -> Result<TeamRankings<'_>, QueryError> {
    Ok(teams::team_rankings(team_analysis(snapshot)?))
}

pub fn team_rankings_by_type(snapshot: &Snapshot, team_type: &str) -> Result<Value, QueryError> {
    let analysis = team_analysis(snapshot)?;
    let kind = TeamType::parse(team_type)
        .ok_or_else(|| QueryError::NotFound(format!("team type {team_type:?} not found")))?;
    let mut body = serde_json::Map::new();
    body.insert(kind.as_str().to_string(), crate::json_safe::to_json(kind.teams(analysis)));
    Ok(Value::Object(body))
}

pub fn player_suggestions(snapshot: &Snapshot, partial: &str) -> Result<Value, QueryError> {
    let analysis = team_analysis(snapshot)?;
    Ok(json!({
        "suggestions": teams::player_suggestions(analysis, partial),
        "query": partial,
    }))
}

pub fn search_teams<'a>(
    snapshot: &'a Snapshot,
    player: &str,
    search_type: Option<&str>,
) -> Result<TeamSearch<'a>, QueryError> {
    let analysis = team_analysis(snapshot)?;
    match search_type.map(TeamType::parse) {
        None | Some(Some(TeamType::PartyTeams)) => Ok(teams::search_teams(analysis, player)),
        Some(_) => Err(QueryError::BadRequest(format!(
            "unsupported search type {:?}; only party_teams can be searched",
            search_type.unwrap_or_default()
        ))),
    }
}
