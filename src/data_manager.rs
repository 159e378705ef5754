//! Load generations: one immutable snapshot of every artifact, published as a
//! whole so readers never observe a mix of old and new data.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::DataSources;
use crate::countries::CountryNameMap;
use crate::error::{LoadError, QueryError, SourceKind};
use crate::leaderboard::{LeaderboardCache, leaderboard_rows, preprocess_leaderboard};
use crate::model::{RankedPlayer, Scope};
use crate::nations::{Contributions, NationRankings, contribution_rows, nation_rows};
use crate::table::Table;
use crate::teams::TeamAnalysis;

pub const UNKNOWN_TIMESTAMP: &str = "unknown";

/// Outcome of loading one source, reported by the status endpoint and `check_data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub source: &'static str,
    pub path: String,
    pub required: bool,
    pub loaded: bool,
    pub rows: usize,
    pub skipped_rows: usize,
    pub error: Option<String>,
}

impl SourceStatus {
    fn new(kind: SourceKind, path: &Path) -> Self {
        Self {
            source: kind.label(),
            path: path.display().to_string(),
            required: kind.is_required(),
            loaded: false,
            rows: 0,
            skipped_rows: 0,
            error: None,
        }
    }

    fn loaded(mut self, rows: usize, skipped_rows: usize) -> Self {
        self.loaded = true;
        self.rows = rows;
        self.skipped_rows = skipped_rows;
        self
    }

    fn failed(mut self, err: &LoadError) -> Self {
        self.error = Some(err.to_string());
        self
    }
}

#[derive(Debug)]
pub struct Snapshot {
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    pub last_updated: String,
    pub leaderboards: LeaderboardCache,
    pub countries: CountryNameMap,
    pub nations: Option<NationRankings>,
    pub contributions: Option<Contributions>,
    pub teams: Option<TeamAnalysis>,
    pub sources: Vec<SourceStatus>,
}

fn read_required(kind: SourceKind, path: &Path) -> Result<Table, LoadError> {
    if !path.is_file() {
        return Err(LoadError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }
    Table::read(kind, path)
}

/// Run `load` for an optional source. Absence and failures both degrade to `None`.
fn load_optional<T>(
    kind: SourceKind,
    path: &Path,
    statuses: &mut Vec<SourceStatus>,
    load: impl FnOnce() -> Result<(T, usize, usize), LoadError>,
) -> Option<T> {
    let status = SourceStatus::new(kind, path);
    if !path.is_file() {
        warn!(source = %kind, path = %path.display(), "optional source not found; endpoints depending on it are unavailable");
        statuses.push(SourceStatus {
            error: Some("not found".to_string()),
            ..status
        });
        return None;
    }
    match load() {
        Ok((value, rows, skipped)) => {
            info!(source = %kind, rows, "loaded");
            log_skipped(kind, skipped);
            statuses.push(status.loaded(rows, skipped));
            Some(value)
        }
        Err(err) => {
            warn!(source = %kind, error = %err, "optional source unavailable");
            statuses.push(status.failed(&err));
            None
        }
    }
}

fn log_skipped(kind: SourceKind, skipped: usize) {
    if skipped > 0 {
        warn!(source = %kind, skipped, "skipped malformed rows");
    }
}

impl Snapshot {
    /// Read every source and build all derived structures. Required sources
    /// fail the whole load; optional ones are marked unavailable.
    pub fn load_all(sources: &DataSources, generation: u64) -> Result<Self, LoadError> {
        let mut statuses = Vec::with_capacity(SourceKind::ALL.len());

        let path = &sources.leaderboard;
        let table = read_required(SourceKind::Leaderboard, path)?;
        let parsed = leaderboard_rows(&table, path)?;
        drop(table);
        let leaderboards = preprocess_leaderboard(&parsed.rows);
        info!(
            rows = parsed.rows.len(),
            entries = leaderboards.len(),
            "loaded leaderboard and preprocessed every (scope, game type) pair"
        );
        log_skipped(SourceKind::Leaderboard, parsed.skipped);
        statuses.push(
            SourceStatus::new(SourceKind::Leaderboard, path).loaded(parsed.rows.len(), parsed.skipped),
        );

        let path = &sources.countries;
        let table = read_required(SourceKind::Countries, path)?;
        let countries = CountryNameMap::from_table(&table, path)?;
        info!(countries = countries.len(), "loaded country names");
        statuses.push(
            SourceStatus::new(SourceKind::Countries, path)
                .loaded(countries.len(), table.len().saturating_sub(countries.len())),
        );

        let path = &sources.contributions;
        let contributions = load_optional(SourceKind::PlayerContributions, path, &mut statuses, || {
            let table = Table::read(SourceKind::PlayerContributions, path)?;
            let parsed = contribution_rows(&table, path, &countries)?;
            let rows = parsed.rows.len();
            Ok((Contributions::new(parsed.rows), rows, parsed.skipped))
        });

        let path = &sources.nation_rankings;
        let nations = load_optional(SourceKind::NationRankings, path, &mut statuses, || {
            let table = Table::read(SourceKind::NationRankings, path)?;
            let parsed = nation_rows(&table, path, &countries)?;
            let rankings = NationRankings::build(parsed.rows, contributions.as_ref());
            let rows = rankings.len();
            Ok((rankings, rows, parsed.skipped))
        });

        let path = &sources.team_analysis;
        let teams = load_optional(SourceKind::TeamAnalysis, path, &mut statuses, || {
            let analysis = TeamAnalysis::read(path)?;
            let rows = analysis.rosters.len();
            Ok((analysis, rows, 0))
        });

        Ok(Self {
            generation,
            loaded_at: Utc::now(),
            last_updated: last_updated(sources.all().map(|(_, path)| path)),
            leaderboards,
            countries,
            nations,
            contributions,
            teams,
            sources: statuses,
        })
    }

    /// Cached rows for a key. An unknown key is `NotFound`, never an empty list.
    pub fn get_leaderboard(&self, scope: &Scope, game_type: &str) -> Result<&[RankedPlayer], QueryError> {
        self.leaderboards.get(scope, game_type).ok_or_else(|| {
            QueryError::NotFound(format!("no {game_type} leaderboard for scope {scope}"))
        })
    }
}

/// Modification time of the freshest existing file, for display. Missing or
/// unreadable files are ignored; with none left the result is "unknown".
pub fn last_updated<'a>(paths: impl IntoIterator<Item = &'a Path>) -> String {
    paths
        .into_iter()
        .filter_map(|path| path.metadata().ok()?.modified().ok())
        .filter_map(|time| time.duration_since(UNIX_EPOCH).ok())
        .max()
        .and_then(|since| {
            let secs = i64::try_from(since.as_secs()).ok()?;
            DateTime::from_timestamp(secs, since.subsec_nanos())
        })
        .map(|dt| dt.format("%B %d, %Y at %H:%M UTC").to_string())
        .unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string())
}

/// Owner of the current generation. Readers clone an `Arc` and keep a
/// consistent view for as long as they hold it; reloads build the next
/// generation off to the side and swap the pointer.
#[derive(Debug)]
pub struct DataManager {
    sources: DataSources,
    current: RwLock<Arc<Snapshot>>,
    next_generation: AtomicU64,
    reload_lock: Mutex<()>,
}

impl DataManager {
    pub fn load_all(sources: DataSources) -> Result<Self, LoadError> {
        let snapshot = Snapshot::load_all(&sources, 1)?;
        info!(generation = snapshot.generation, last_updated = %snapshot.last_updated, "data generation ready");
        Ok(Self {
            sources,
            current: RwLock::new(Arc::new(snapshot)),
            next_generation: AtomicU64::new(2),
            reload_lock: Mutex::new(()),
        })
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Rebuild from disk and publish. On failure the current generation stays.
    pub fn reload(&self) -> Result<Arc<Snapshot>, LoadError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let snapshot = match Snapshot::load_all(&self.sources, generation) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                warn!(generation, error = %err, "reload failed; keeping current generation");
                return Err(err);
            }
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        info!(generation, "data generation swapped in");
        Ok(snapshot)
    }
}
