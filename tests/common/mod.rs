#![allow(dead_code)]

use std::fs;
use std::path::Path;

use bar_leaderboard::config::DataSources;
use tempfile::TempDir;

pub const LEADERBOARD_HEADER: &[&str] = &[
    "user_id",
    "name",
    "countryCode",
    "leaderboard_id",
    "game_type",
    "leaderboard_rating",
    "start_time",
];

/// A temporary data directory holding CSV/JSON artifacts.
pub struct DataDir {
    pub dir: TempDir,
    pub sources: DataSources,
}

impl DataDir {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path();
        let sources = DataSources {
            leaderboard: root.join("final_leaderboard.csv"),
            countries: root.join("iso_country.csv"),
            nation_rankings: root.join("nation_rankings.csv"),
            contributions: root.join("player_contributions.csv"),
            team_analysis: root.join("roster_analysis_results.json"),
        };
        Self { dir, sources }
    }

    /// Leaderboard and countries only: the minimum the server starts with.
    pub fn required_only() -> Self {
        let data = Self::empty();
        data.write_leaderboard(&standard_leaderboard());
        data.write_countries();
        data
    }

    /// Every artifact present.
    pub fn full() -> Self {
        let data = Self::required_only();
        data.write_nations();
        data.write_contributions();
        data.write_teams();
        data
    }

    pub fn write_leaderboard(&self, rows: &[Vec<&str>]) {
        write_csv(&self.sources.leaderboard, LEADERBOARD_HEADER, rows);
    }

    pub fn write_countries(&self) {
        write_csv(
            &self.sources.countries,
            &["name", "alpha-2"],
            &[
                vec!["Germany", "DE"],
                vec!["France", "FR"],
                vec!["Namibia", "NA"],
                vec!["Sweden", " SE "],
            ],
        );
    }

    pub fn write_nations(&self) {
        write_csv(
            &self.sources.nation_rankings,
            &[
                "game_type",
                "countryCode",
                "total_score",
                "raw_score",
                "total_games",
                "k_value",
                "confidence_factor",
                "min_games_required",
                "top_contributors",
            ],
            &[
                vec!["Duel", "DE", "1333", "20", "100", "25", "50", "6.25", r#"[{"name": "Alpha", "score": 45}]"#],
                vec!["Duel", "FR", "-500", "-5", "50", "25", "50", "6.25", ""],
                vec!["Duel", "NA", "2000", "2", "4", "25", "50", "6.25", ""],
                vec!["Large Team", "SE", "800", "12", "100", "10", "20", "2.5", ""],
            ],
        );
    }

    pub fn write_contributions(&self) {
        write_csv(
            &self.sources.contributions,
            &["game_type", "countryCode", "user_id", "name", "score"],
            &[
                vec!["Duel", "DE", "1", "Alpha", "45"],
                vec!["Duel", "DE", "2", "Bravo", "15"],
                vec!["Duel", "DE", "7", "Golf", "-40"],
                vec!["Duel", "DE", "8", "Hotel", "0"],
                vec!["Duel", "FR", "3", "Charlie", "-10"],
                vec!["Duel", "FR", "2", "Bravo", "5"],
                vec!["Large Team", "SE", "5", "Echo", "12"],
            ],
        );
    }

    pub fn write_teams(&self) {
        let doc = serde_json::json!({
            "analysis_date": "2025-06-01",
            "config": { "min_games": 5 },
            "summary": { "total_rosters": 2 },
            "rosters": [
                {
                    "roster_id": "r1",
                    "team_name": "Northern Lights",
                    "player_count": 2,
                    "roster": [
                        { "user_id": 5, "name": "Echo", "country": "SE" },
                        { "user_id": 6, "name": "Foxtrot", "country": "SE" }
                    ],
                    "stats_overall": { "wins": 12, "losses": 4, "matches": 16, "win_rate": 0.75 }
                },
                {
                    "roster_id": "r2",
                    "team_name": "Echo Chamber",
                    "player_count": 1,
                    "roster": [{ "user_id": 9, "name": "Echoes", "country": "DE" }],
                    "stats_overall": { "wins": 30, "losses": 30, "matches": 60, "win_rate": 0.5 }
                }
            ],
            "communities": [{ "roster": [{ "name": "Echelon" }] }]
        });
        fs::write(
            &self.sources.team_analysis,
            serde_json::to_vec_pretty(&doc).expect("team json encodes"),
        )
        .expect("write team analysis");
    }
}

pub fn standard_leaderboard() -> Vec<Vec<&'static str>> {
    vec![
        vec!["1", "Alpha", "DE", "DE", "Duel", "1500", "2025-06-01 10:00:00"],
        vec!["2", "Bravo", "DE", "DE", "Duel", "1800", "2025-06-01 10:00:00"],
        vec!["3", "Charlie", "FR", "FR", "Duel", "1200", "2025-06-01 10:00:00"],
        vec!["4", "Delta", "NA", "NA", "Duel", "1650.555", "2025-06-01 10:00:00"],
        vec!["1", "Alpha", "DE", "Western Europe", "Duel", "1500", "2025-06-01 10:00:00"],
        vec!["5", "Echo", "SE", "SE", "Large Team", "2100", "2025-06-01 10:00:00"],
        vec!["6", "Foxtrot", "SE", "SE", "Large Team", "1900", "2025-06-01 10:00:00"],
    ]
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<&str>]) {
    let mut writer = csv::Writer::from_path(path).expect("open csv");
    writer.write_record(header).expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    writer.flush().expect("flush csv");
}
