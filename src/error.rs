use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The tabular artifacts the offline pipelines hand over to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Leaderboard,
    Countries,
    NationRankings,
    PlayerContributions,
    TeamAnalysis,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Leaderboard,
        SourceKind::Countries,
        SourceKind::NationRankings,
        SourceKind::PlayerContributions,
        SourceKind::TeamAnalysis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Leaderboard => "leaderboard",
            SourceKind::Countries => "countries",
            SourceKind::NationRankings => "nation rankings",
            SourceKind::PlayerContributions => "player contributions",
            SourceKind::TeamAnalysis => "team analysis",
        }
    }

    /// Required sources abort startup when absent; the rest degrade their endpoints.
    pub fn is_required(self) -> bool {
        matches!(self, SourceKind::Leaderboard | SourceKind::Countries)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{kind} source not found at {}", .path.display())]
    Missing { kind: SourceKind, path: PathBuf },
    #[error("{kind} source at {} could not be read: {reason}", .path.display())]
    Unreadable {
        kind: SourceKind,
        path: PathBuf,
        reason: String,
    },
    #[error(
        "{kind} source at {} is missing required columns: {}",
        .path.display(),
        .columns.join(", ")
    )]
    MissingColumns {
        kind: SourceKind,
        path: PathBuf,
        columns: Vec<String>,
    },
    #[error("{kind} source at {} is malformed: {reason}", .path.display())]
    Malformed {
        kind: SourceKind,
        path: PathBuf,
        reason: String,
    },
    #[error(
        "{kind} source at {} has an unsupported format (expected .parquet, .csv or .json)",
        .path.display()
    )]
    UnsupportedFormat { kind: SourceKind, path: PathBuf },
}

impl LoadError {
    pub fn kind(&self) -> SourceKind {
        match self {
            LoadError::Missing { kind, .. }
            | LoadError::Unreadable { kind, .. }
            | LoadError::MissingColumns { kind, .. }
            | LoadError::Malformed { kind, .. }
            | LoadError::UnsupportedFormat { kind, .. } => *kind,
        }
    }

    pub fn unreadable(kind: SourceKind, path: &Path, err: impl fmt::Display) -> Self {
        LoadError::Unreadable {
            kind,
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub fn malformed(kind: SourceKind, path: &Path, reason: impl Into<String>) -> Self {
        LoadError::Malformed {
            kind,
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Client-visible failures of the query layer. None of them is a server fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    BadRequest(String),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::NotFound(_) => "not_found",
            QueryError::Unavailable(_) => "unavailable",
            QueryError::BadRequest(_) => "bad_request",
        }
    }
}
