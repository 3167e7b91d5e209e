//! Commit graph over a snapshot of version records
//!
//! Records live in an arena (`Vec<VersionRecord>`); parent links stay as ids
//! and every relation (children, roots, branch membership) is a derived index
//! rebuilt on construction. Nothing in here mutates a record.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Result, VcsError};
use crate::record::{chronological, VersionRecord};

/// Queryable, immutable view over a set of version records
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    records: Vec<VersionRecord>,
    index: HashMap<String, usize>,
    /// Parent slot -> child slots, sorted chronologically
    children: HashMap<usize, Vec<usize>>,
    roots: Vec<usize>,
    /// Branch name -> slots on that branch, sorted chronologically
    by_branch: HashMap<String, Vec<usize>>,
}

impl CommitGraph {
    /// Build the graph, rejecting dangling parents, cycles, and duplicate identities
    pub fn build(records: Vec<VersionRecord>) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        {
            let mut versions: HashSet<(&str, u32)> = HashSet::with_capacity(records.len());
            for (slot, record) in records.iter().enumerate() {
                if index.insert(record.id.clone(), slot).is_some() {
                    return Err(VcsError::InvalidGraph(format!("duplicate record id {}", record.id)));
                }
                if !versions.insert((record.config_group_id.as_str(), record.version)) {
                    return Err(VcsError::InvalidGraph(format!(
                        "duplicate version {} in group {}",
                        record.version, record.config_group_id
                    )));
                }
            }
        }

        let mut parent_of: Vec<Option<usize>> = Vec::with_capacity(records.len());
        for record in &records {
            let parent = match &record.parent_id {
                None => None,
                Some(pid) => match index.get(pid) {
                    Some(&p) => Some(p),
                    None => {
                        return Err(VcsError::InvalidGraph(format!(
                            "record {} references missing parent {}",
                            record.id, pid
                        )))
                    }
                },
            };
            parent_of.push(parent);
        }

        detect_cycles(&records, &parent_of)?;

        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        let mut by_branch: HashMap<String, Vec<usize>> = HashMap::new();
        for (slot, parent) in parent_of.iter().enumerate() {
            match parent {
                Some(p) => children.entry(*p).or_default().push(slot),
                None => roots.push(slot),
            }
            by_branch
                .entry(records[slot].branch.clone())
                .or_default()
                .push(slot);
        }

        let order = |a: &usize, b: &usize| chronological(&records[*a], &records[*b]);
        for kids in children.values_mut() {
            kids.sort_by(order);
        }
        roots.sort_by(order);
        for slots in by_branch.values_mut() {
            slots.sort_by(order);
        }

        let graph = Self {
            records,
            index,
            children,
            roots,
            by_branch,
        };

        for branch in graph.disconnected_branches() {
            warn!("Branch '{}' does not form a connected subtree", branch);
        }
        debug!(
            "Built commit graph: {} records, {} roots, {} branches",
            graph.records.len(),
            graph.roots.len(),
            graph.by_branch.len()
        );

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in their original input order
    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&VersionRecord> {
        self.index.get(id).map(|&slot| &self.records[slot])
    }

    /// Resolve a user-supplied reference: full id, `v3` or `3`, then a unique id prefix
    pub fn find(&self, reference: &str) -> Option<&VersionRecord> {
        if let Some(record) = self.get(reference) {
            return Some(record);
        }
        let number = reference.strip_prefix('v').unwrap_or(reference);
        if let Ok(version) = number.parse::<u32>() {
            if let Some(record) = self.records.iter().find(|r| r.version == version) {
                return Some(record);
            }
        }
        // Unique id prefix, as printed by short_id()
        let mut matches = self.records.iter().filter(|r| r.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(only), None) if !reference.is_empty() => Some(only),
            _ => None,
        }
    }

    /// Direct children of `id`, oldest first
    pub fn children(&self, id: &str) -> Vec<&VersionRecord> {
        self.index
            .get(id)
            .and_then(|slot| self.children.get(slot))
            .map(|kids| kids.iter().map(|&k| &self.records[k]).collect())
            .unwrap_or_default()
    }

    /// Records without a parent, oldest first
    pub fn roots(&self) -> Vec<&VersionRecord> {
        self.roots.iter().map(|&r| &self.records[r]).collect()
    }

    pub fn branches(&self) -> BTreeSet<&str> {
        self.by_branch.keys().map(|b| b.as_str()).collect()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.by_branch.contains_key(branch)
    }

    /// All commits carrying `branch`, oldest first
    pub fn commits_on_branch(&self, branch: &str) -> Vec<&VersionRecord> {
        self.by_branch
            .get(branch)
            .map(|slots| slots.iter().map(|&s| &self.records[s]).collect())
            .unwrap_or_default()
    }

    /// Commits on `branch` strictly newer than `cutoff`; `None` means no cutoff
    pub fn commits_on_branch_after(
        &self,
        branch: &str,
        cutoff: Option<DateTime<Utc>>,
    ) -> Vec<&VersionRecord> {
        self.commits_on_branch(branch)
            .into_iter()
            .filter(|r| match cutoff {
                Some(c) => r.timestamp > c,
                None => true,
            })
            .collect()
    }

    /// Latest commit on `branch`
    pub fn head(&self, branch: &str) -> Option<&VersionRecord> {
        self.by_branch
            .get(branch)
            .and_then(|slots| slots.last())
            .map(|&s| &self.records[s])
    }

    /// First commit on `branch`; the one that originated the label
    pub fn branch_origin(&self, branch: &str) -> Option<&VersionRecord> {
        self.by_branch
            .get(branch)
            .and_then(|slots| slots.first())
            .map(|&s| &self.records[s])
    }

    /// Latest commit in the whole graph
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.records.iter().max_by(|a, b| chronological(a, b))
    }

    /// Path from the root of `id`'s tree down to `id` itself
    pub fn lineage(&self, id: &str) -> Vec<&VersionRecord> {
        let mut path = Vec::new();
        let mut cursor = self.get(id);
        while let Some(record) = cursor {
            path.push(record);
            if path.len() > self.records.len() {
                break;
            }
            cursor = record.parent_id.as_deref().and_then(|p| self.get(p));
        }
        path.reverse();
        path
    }

    /// Version number the next saved record of this graph's group would take
    pub fn next_version(&self) -> u32 {
        self.records.iter().map(|r| r.version).max().unwrap_or(0) + 1
    }

    /// Branches whose commits do not hang together as a single subtree.
    ///
    /// A connected branch has exactly one commit whose parent is absent or on
    /// another branch (its origin).
    pub fn disconnected_branches(&self) -> Vec<&str> {
        let mut broken: Vec<&str> = self
            .by_branch
            .iter()
            .filter(|(branch, slots)| {
                let entry_points = slots
                    .iter()
                    .filter(|&&s| {
                        let parent = self.records[s].parent_id.as_deref().and_then(|p| self.get(p));
                        match parent {
                            Some(parent) => &parent.branch != *branch,
                            None => true,
                        }
                    })
                    .count();
                entry_points != 1
            })
            .map(|(branch, _)| branch.as_str())
            .collect();
        broken.sort_unstable();
        broken
    }
}

/// Walk every parent chain, bounded by the record count.
///
/// Slots already known to reach a root are remembered so each chain is
/// walked once.
fn detect_cycles(records: &[VersionRecord], parent_of: &[Option<usize>]) -> Result<()> {
    let limit = records.len();
    let mut settled = vec![false; records.len()];

    for start in 0..records.len() {
        let mut path = Vec::new();
        let mut cursor = Some(start);
        while let Some(slot) = cursor {
            if settled[slot] {
                break;
            }
            if path.len() > limit {
                return Err(VcsError::InvalidGraph(format!(
                    "cycle detected through record {}",
                    records[start].id
                )));
            }
            path.push(slot);
            cursor = parent_of[slot];
        }
        for slot in path {
            settled[slot] = true;
        }
    }
    Ok(())
}
