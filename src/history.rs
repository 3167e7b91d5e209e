//! Editing session over one config group
//!
//! [`History`] keeps a built [`CommitGraph`] next to the store it came from
//! and rebuilds it after every write, so callers always query a graph that
//! matches what is persisted.

use log::{debug, info};

use crate::diff::{diff_branches, diff_versions, VersionDiff};
use crate::error::{Result, VcsError};
use crate::graph::CommitGraph;
use crate::merge::{can_merge, default_merge_message, merge_draft, MergeCheck};
use crate::record::{VersionDraft, VersionRecord};
use crate::store::VersionStore;

pub struct History<S: VersionStore> {
    store: S,
    group: String,
    graph: CommitGraph,
}

impl<S: VersionStore> History<S> {
    /// Load an existing group. Fails with `NotFound` if it has no records.
    pub fn open(store: S, group: &str) -> Result<Self> {
        let graph = CommitGraph::build(store.load_versions(group)?)?;
        debug!("Opened group '{}' with {} versions", group, graph.len());
        Ok(Self {
            store,
            group: group.to_string(),
            graph,
        })
    }

    /// Load a group, starting from an empty graph if it does not exist yet
    pub fn open_or_init(store: S, group: &str) -> Result<Self> {
        let records = match store.load_versions(group) {
            Ok(records) => records,
            Err(VcsError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            graph: CommitGraph::build(records)?,
            store,
            group: group.to_string(),
        })
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Reload from the store
    pub fn refresh(&mut self) -> Result<()> {
        let records = match self.store.load_versions(&self.group) {
            Ok(records) => records,
            Err(VcsError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        self.graph = CommitGraph::build(records)?;
        Ok(())
    }

    /// Save a draft into this group and return the sealed record
    pub fn commit(&mut self, draft: VersionDraft) -> Result<VersionRecord> {
        if draft.config_group_id != self.group {
            return Err(VcsError::Validation(format!(
                "Draft belongs to group '{}', session is on '{}'",
                draft.config_group_id, self.group
            )));
        }
        let record = self.store.save_version(draft)?;
        self.refresh()?;
        Ok(record)
    }

    pub fn can_merge(&self, from: &str, into: &str) -> Result<MergeCheck<'_>> {
        can_merge(&self.graph, from, into)
    }

    /// Record a merge of `from` into `into`. An empty message gets the default.
    pub fn merge(&mut self, from: &str, into: &str, message: &str) -> Result<VersionRecord> {
        let message = if message.trim().is_empty() {
            default_merge_message(from, into)
        } else {
            message.to_string()
        };
        let draft = merge_draft(&self.graph, from, into, &message)?;
        let record = self.store.save_version(draft)?;
        info!("Merged '{}' into '{}' as v{}", from, into, record.version);
        self.refresh()?;
        Ok(record)
    }

    /// Diff two versions addressed by any reference `CommitGraph::find` accepts
    pub fn diff(&self, from: &str, to: &str) -> Result<VersionDiff<'_>> {
        let a = self
            .graph
            .find(from)
            .ok_or_else(|| VcsError::NotFound(format!("version '{}'", from)))?;
        let b = self
            .graph
            .find(to)
            .ok_or_else(|| VcsError::NotFound(format!("version '{}'", to)))?;
        Ok(diff_versions(a, b))
    }

    pub fn diff_branches(&self, from: &str, to: &str) -> Result<VersionDiff<'_>> {
        diff_branches(&self.graph, from, to)
    }
}
