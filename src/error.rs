//! Error type shared by the graph, merge, and storage layers

use thiserror::Error;

/// Coarse classification of a [`VcsError`], stable for callers that branch on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidGraph,
    UnknownBranch,
    NothingToMerge,
    SelfMerge,
    ValidationError,
    NotFound,
    TransportError,
}

/// Errors produced while building, querying, or extending a version history
#[derive(Debug, Error)]
pub enum VcsError {
    /// Dangling parent reference, cycle, or duplicate identity in the record set
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Unknown branch '{0}'")]
    UnknownBranch(String),

    /// Merge requested with no commits on `from_branch` newer than the last merge
    #[error("Nothing to merge from '{from_branch}' into '{into_branch}' ({new_commits} new commits)")]
    NothingToMerge {
        from_branch: String,
        into_branch: String,
        new_commits: usize,
    },

    #[error("Cannot merge branch '{0}' into itself")]
    SelfMerge(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl VcsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VcsError::InvalidGraph(_) => ErrorKind::InvalidGraph,
            VcsError::UnknownBranch(_) => ErrorKind::UnknownBranch,
            VcsError::NothingToMerge { .. } => ErrorKind::NothingToMerge,
            VcsError::SelfMerge(_) => ErrorKind::SelfMerge,
            VcsError::Validation(_) => ErrorKind::ValidationError,
            VcsError::NotFound(_) => ErrorKind::NotFound,
            VcsError::Transport(_) => ErrorKind::TransportError,
        }
    }

    /// True for rejections the caller can recover from by choosing different input
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::InvalidGraph | ErrorKind::TransportError)
    }
}

impl From<serde_json::Error> for VcsError {
    fn from(e: serde_json::Error) -> Self {
        VcsError::Transport(format!("Serialization error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, VcsError>;
