//! Party-team analysis produced by the roster pipeline.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LoadError, SourceKind};

pub const MAX_SUGGESTIONS: usize = 10;
pub const MAX_TEAM_RESULTS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    #[serde(default)]
    pub analysis_date: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub summary: Value,
    #[serde(default)]
    pub rosters: Vec<Roster>,
    #[serde(default)]
    pub communities: Vec<Community>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub roster_id: Value,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub player_count: Option<u64>,
    #[serde(default)]
    pub roster: Vec<RosterMember>,
    #[serde(default)]
    pub stats_overall: RosterStats,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterMember {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub matches_played_with_team: Option<u64>,
    #[serde(default)]
    pub attendance_percent: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterStats {
    #[serde(default)]
    pub wins: u64,
    #[serde(default)]
    pub losses: u64,
    #[serde(default)]
    pub matches: u64,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Community {
    #[serde(default)]
    pub roster: Vec<RosterMember>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeamAnalysis {
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let kind = SourceKind::TeamAnalysis;
        let file = File::open(path).map_err(|err| LoadError::unreadable(kind, path, err))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|err| LoadError::malformed(kind, path, err.to_string()))
    }

    fn members(&self) -> impl Iterator<Item = &RosterMember> {
        self.rosters
            .iter()
            .flat_map(|team| team.roster.iter())
            .chain(self.communities.iter().flat_map(|c| c.roster.iter()))
    }
}

/// The team view: the document header plus the party teams.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRankings<'a> {
    pub analysis_date: Option<&'a str>,
    pub config: &'a Value,
    pub summary: &'a Value,
    pub party_teams: &'a [Roster],
    pub frequent_pairs: [Value; 0],
}

pub fn team_rankings(analysis: &TeamAnalysis) -> TeamRankings<'_> {
    TeamRankings {
        analysis_date: analysis.analysis_date.as_deref(),
        config: &analysis.config,
        summary: &analysis.summary,
        party_teams: &analysis.rosters,
        frequent_pairs: [],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamType {
    PartyTeams,
    /// Pair-based views are no longer computed and are always empty.
    FrequentTeammates,
    FrequentPairs,
}

impl TeamType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "party_teams" => Some(TeamType::PartyTeams),
            "frequent_teammates" => Some(TeamType::FrequentTeammates),
            "frequent_pairs" => Some(TeamType::FrequentPairs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamType::PartyTeams => "party_teams",
            TeamType::FrequentTeammates => "frequent_teammates",
            TeamType::FrequentPairs => "frequent_pairs",
        }
    }

    pub fn teams(self, analysis: &TeamAnalysis) -> &[Roster] {
        match self {
            TeamType::PartyTeams => &analysis.rosters,
            TeamType::FrequentTeammates | TeamType::FrequentPairs => &[],
        }
    }
}

/// Distinct member names containing `partial` (case-insensitive), sorted, at most ten.
pub fn player_suggestions(analysis: &TeamAnalysis, partial: &str) -> Vec<String> {
    let needle = partial.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let names: BTreeSet<&str> = analysis
        .members()
        .map(|member| member.name.as_str())
        .filter(|name| !name.is_empty() && name.to_lowercase().contains(&needle))
        .collect();
    names
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMatch<'a> {
    #[serde(flatten)]
    pub team: &'a Roster,
    pub player_details: &'a [RosterMember],
    pub team_type: &'static str,
    pub search_match: &'a RosterMember,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSearch<'a> {
    pub player_name: String,
    pub search_type: &'static str,
    pub items_found: usize,
    pub teams: Vec<TeamMatch<'a>>,
}

/// Party teams with a member whose name contains `player`. Exact name matches
/// come first, then the most active teams; at most twenty are returned while
/// `items_found` counts every hit.
pub fn search_teams<'a>(analysis: &'a TeamAnalysis, player: &str) -> TeamSearch<'a> {
    let needle = player.trim().to_lowercase();
    let mut hits: Vec<TeamMatch<'a>> = if needle.is_empty() {
        Vec::new()
    } else {
        analysis
            .rosters
            .iter()
            .filter_map(|team| {
                let member = team
                    .roster
                    .iter()
                    .find(|m| m.name.to_lowercase().contains(&needle))?;
                Some(TeamMatch {
                    team,
                    player_details: &team.roster,
                    team_type: "party",
                    search_match: member,
                })
            })
            .collect()
    };
    hits.sort_by_key(|hit| {
        let exact = hit.search_match.name.to_lowercase() == needle;
        (!exact, std::cmp::Reverse(hit.team.stats_overall.matches))
    });
    let items_found = hits.len();
    hits.truncate(MAX_TEAM_RESULTS);
    TeamSearch {
        player_name: player.to_string(),
        search_type: TeamType::PartyTeams.as_str(),
        items_found,
        teams: hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis() -> TeamAnalysis {
        serde_json::from_value(json!({
            "analysis_date": "2025-06-01",
            "config": { "min_games": 5 },
            "summary": { "teams": 3 },
            "rosters": [
                {
                    "roster_id": 1,
                    "team_name": "Alpha",
                    "player_count": 2,
                    "roster": [{ "user_id": 1, "name": "Frosty" }, { "user_id": 2, "name": "Bolt" }],
                    "stats_overall": { "wins": 8, "losses": 2, "matches": 10, "win_rate": 0.8 },
                    "top_maps": ["Glitters"]
                },
                {
                    "roster_id": 2,
                    "team_name": "Beta",
                    "roster": [{ "user_id": 3, "name": "Frost" }],
                    "stats_overall": { "matches": 3 }
                },
                {
                    "roster_id": 3,
                    "team_name": "Gamma",
                    "roster": [{ "user_id": 4, "name": "frostbite" }],
                    "stats_overall": { "matches": 40 }
                }
            ],
            "communities": [{ "id": 9, "roster": [{ "name": "Frostwind" }] }]
        }))
        .expect("fixture parses")
    }

    #[test]
    fn suggestions_merge_rosters_and_communities() {
        let a = analysis();
        assert_eq!(
            player_suggestions(&a, "FROST"),
            vec!["Frost", "Frostwind", "Frosty", "frostbite"]
        );
        assert!(player_suggestions(&a, " ").is_empty());
    }

    #[test]
    fn exact_match_ranks_before_activity() {
        let a = analysis();
        let found = search_teams(&a, "frost");
        assert_eq!(found.items_found, 3);
        let names: Vec<_> = found
            .teams
            .iter()
            .map(|t| t.team.team_name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["Beta", "Gamma", "Alpha"]);
    }

    #[test]
    fn unknown_roster_keys_pass_through() {
        let a = analysis();
        let value = serde_json::to_value(team_rankings(&a)).expect("encodes");
        assert_eq!(value["party_teams"][0]["top_maps"], json!(["Glitters"]));
        assert_eq!(value["frequent_pairs"], json!([]));
        assert_eq!(TeamType::parse("frequent_pairs").map(|t| t.teams(&a).len()), Some(0));
        assert!(TeamType::parse("clans").is_none());
    }
}
