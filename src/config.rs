use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::SourceKind;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_DATA_DIR: &str = "data";

pub const LEADERBOARD_FILE: &str = "final_leaderboard.parquet";
pub const COUNTRIES_FILE: &str = "iso_country.csv";
pub const NATION_RANKINGS_FILE: &str = "nation_rankings.parquet";
pub const CONTRIBUTIONS_FILE: &str = "player_contributions.parquet";
pub const TEAM_ANALYSIS_FILE: &str = "roster_analysis_results.json";

/// Resolved locations of every artifact the server reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSources {
    pub leaderboard: PathBuf,
    pub countries: PathBuf,
    pub nation_rankings: PathBuf,
    pub contributions: PathBuf,
    pub team_analysis: PathBuf,
}

impl DataSources {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            leaderboard: dir.join(LEADERBOARD_FILE),
            countries: dir.join(COUNTRIES_FILE),
            nation_rankings: dir.join(NATION_RANKINGS_FILE),
            contributions: dir.join(CONTRIBUTIONS_FILE),
            team_analysis: dir.join(TEAM_ANALYSIS_FILE),
        }
    }

    pub fn path(&self, kind: SourceKind) -> &Path {
        match kind {
            SourceKind::Leaderboard => &self.leaderboard,
            SourceKind::Countries => &self.countries,
            SourceKind::NationRankings => &self.nation_rankings,
            SourceKind::PlayerContributions => &self.contributions,
            SourceKind::TeamAnalysis => &self.team_analysis,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = (SourceKind, &Path)> {
        SourceKind::ALL.into_iter().map(|kind| (kind, self.path(kind)))
    }
}

/// Request-time limits shared by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub max_page_size: usize,
    pub search_limit: usize,
    pub allow_reload: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
            search_limit: 50,
            allow_reload: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub sources: DataSources,
    pub query: QuerySettings,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let opt = |key: &str| {
            lookup(key).and_then(|val| {
                let val = val.trim().to_string();
                if val.is_empty() { None } else { Some(val) }
            })
        };

        let bind_raw = opt("BAR_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| anyhow::anyhow!("BAR_BIND_ADDR={bind_raw:?} is not an address: {err}"))?;

        let dir = PathBuf::from(opt("BAR_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let file = |key: &str, default: &str| dir.join(opt(key).unwrap_or_else(|| default.to_string()));
        let sources = DataSources {
            leaderboard: file("BAR_LEADERBOARD_FILE", LEADERBOARD_FILE),
            countries: file("BAR_COUNTRIES_FILE", COUNTRIES_FILE),
            nation_rankings: file("BAR_NATION_RANKINGS_FILE", NATION_RANKINGS_FILE),
            contributions: file("BAR_CONTRIBUTIONS_FILE", CONTRIBUTIONS_FILE),
            team_analysis: file("BAR_TEAM_ANALYSIS_FILE", TEAM_ANALYSIS_FILE),
        };

        let defaults = QuerySettings::default();
        let query = QuerySettings {
            max_page_size: opt("BAR_MAX_PAGE_SIZE")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(defaults.max_page_size)
                .clamp(1, 10_000),
            search_limit: opt("BAR_SEARCH_LIMIT")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(defaults.search_limit)
                .clamp(1, 500),
            allow_reload: opt("BAR_ALLOW_RELOAD")
                .map(|val| matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.allow_reload),
        };

        Ok(Self {
            bind_addr,
            sources,
            query,
        })
    }
}

/// Value of `--flag=value` or `--flag value` among `args`.
pub fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('='))
            && !raw.trim().is_empty()
        {
            return Some(PathBuf::from(raw.trim()));
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next.trim()));
        }
    }
    None
}
