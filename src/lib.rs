//! promptvc - Version control for LLM prompt configurations
//!
//! Every save of a prompt + model config becomes an immutable version record.
//! Records form a forest through parent links, carry a branch label, and can
//! be merged across branches.
//!
//! # Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `record` | Version records, drafts, config blobs |
//! | `graph` | Commit graph index and branch queries |
//! | `layout` | Tree layout for indented rendering |
//! | `color` | Stable per-branch colors |
//! | `merge` | Merge eligibility and merge commits |
//! | `diff` | Line and config diffs |
//! | `store` / `db` | In-memory and SQLite persistence |
//! | `history` | Load / commit / merge session over a store |
//!
//! # Quick Start
//!
//! ```no_run
//! use promptvc::{ConfigBlob, History, MemoryStore, VersionDraft};
//!
//! let mut history = History::open_or_init(MemoryStore::new(), "support-bot").unwrap();
//!
//! let root = history
//!     .commit(VersionDraft::new("support-bot", "Be helpful.", ConfigBlob::new("openai", "gpt-4o", 0.7)))
//!     .unwrap();
//!
//! // Branch off the root
//! history
//!     .commit(
//!         VersionDraft::new("support-bot", "Be helpful. Cite sources.", root.config.clone())
//!             .with_parent(Some(&root.id))
//!             .on_branch("citations"),
//!     )
//!     .unwrap();
//!
//! if history.can_merge("citations", "main").unwrap().eligible {
//!     history.merge("citations", "main", "").unwrap();
//! }
//! ```

pub mod color;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod graph;
pub mod history;
pub mod init;
pub mod layout;
pub mod merge;
pub mod record;
pub mod schema;
pub mod store;

pub use color::{color_of, BranchColor, BranchColors, DEFAULT_PALETTE};
pub use config::Config;
pub use db::{Database, GroupSummary, CURRENT_SCHEMA};
pub use diff::{
    diff_branches, diff_config, diff_lines, diff_versions, ConfigChange, ConfigField, DiffRow,
    LineDiff, LineKind, VersionDiff,
};
pub use error::{ErrorKind, Result, VcsError};
pub use graph::CommitGraph;
pub use history::History;
pub use layout::{layout, render_plain, LayoutRow};
pub use merge::{can_merge, merge_draft, MergeCheck};
pub use record::{ConfigBlob, VersionDraft, VersionRecord, DEFAULT_BRANCH};
pub use store::{MemoryStore, VersionStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _ = CURRENT_SCHEMA;
        assert_eq!(DEFAULT_BRANCH, "main");
        assert!(CommitGraph::build(Vec::new()).unwrap().is_empty());
    }
}
