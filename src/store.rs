//! Persistence contract for version records
//!
//! The history logic never touches storage directly; it goes through
//! [`VersionStore`]. Two implementations ship with the crate:
//! [`MemoryStore`] here and the SQLite-backed [`crate::db::Database`].

use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::{debug, info};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Result, VcsError};
use crate::record::{VersionDraft, VersionRecord};

/// Save/load contract the history layer expects from its caller
pub trait VersionStore {
    /// All records of a group, ordered by version ascending.
    ///
    /// Fails with `NotFound` when the group has no records.
    fn load_versions(&self, config_group_id: &str) -> Result<Vec<VersionRecord>>;

    /// Persist a draft, assigning id, next version, and timestamp
    fn save_version(&mut self, draft: VersionDraft) -> Result<VersionRecord>;
}

/// Check a draft against the records already stored for its group
pub fn check_draft(draft: &VersionDraft, existing: &[VersionRecord]) -> Result<()> {
    draft.validate()?;

    let parent = match &draft.parent_id {
        Some(parent_id) => match existing.iter().find(|r| &r.id == parent_id) {
            Some(parent) => Some(parent),
            None => {
                return Err(VcsError::Validation(format!(
                    "Parent {} does not exist in group {}",
                    parent_id, draft.config_group_id
                )))
            }
        },
        None => None,
    };

    // An existing branch only grows from one of its own commits
    if existing.iter().any(|r| r.branch == draft.branch) {
        let on_branch = matches!(parent, Some(p) if p.branch == draft.branch);
        if !on_branch {
            return Err(VcsError::Validation(format!(
                "Branch '{}' already exists in group {}; a new commit on it needs a parent on '{}'",
                draft.branch, draft.config_group_id, draft.branch
            )));
        }
    }

    if let Some(source) = &draft.merge_from {
        if !existing.iter().any(|r| &r.branch == source) {
            return Err(VcsError::Validation(format!(
                "Merge source branch '{}' does not exist in group {}",
                source, draft.config_group_id
            )));
        }
    }

    Ok(())
}

/// Timestamp for a new record: now, but strictly after `latest`.
///
/// Truncated to microseconds so it survives an RFC 3339 round trip intact.
pub fn next_timestamp(latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match latest {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

/// Next version number after the existing records of a group
pub fn next_version(existing: &[VersionRecord]) -> u32 {
    existing.iter().map(|r| r.version).max().unwrap_or(0) + 1
}

pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// In-process store, keyed by group
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    groups: BTreeMap<String, Vec<VersionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group ids with at least one record
    pub fn groups(&self) -> Vec<&str> {
        self.groups.keys().map(|g| g.as_str()).collect()
    }

    /// Insert already-sealed records as-is (fixtures, imports)
    pub fn insert_records(&mut self, records: Vec<VersionRecord>) {
        for record in records {
            let group = self.groups.entry(record.config_group_id.clone()).or_default();
            group.push(record);
            group.sort_by_key(|r| r.version);
        }
    }
}

impl VersionStore for MemoryStore {
    fn load_versions(&self, config_group_id: &str) -> Result<Vec<VersionRecord>> {
        self.groups
            .get(config_group_id)
            .filter(|records| !records.is_empty())
            .cloned()
            .ok_or_else(|| VcsError::NotFound(format!("config group '{}'", config_group_id)))
    }

    fn save_version(&mut self, draft: VersionDraft) -> Result<VersionRecord> {
        let existing = self
            .groups
            .get(&draft.config_group_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        check_draft(&draft, existing)?;

        let version = next_version(existing);
        let timestamp = next_timestamp(existing.iter().map(|r| r.timestamp).max());
        let record = draft.into_record(new_record_id(), version, timestamp);
        debug!("MemoryStore: saving {} v{}", record.config_group_id, record.version);

        self.groups
            .entry(record.config_group_id.clone())
            .or_default()
            .push(record.clone());
        info!(
            "Saved version {} of '{}' on branch '{}'",
            record.version, record.config_group_id, record.branch
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::record::ConfigBlob;

    fn draft(group: &str) -> VersionDraft {
        VersionDraft::new(group, "You are terse.", ConfigBlob::new("openai", "gpt-4o", 0.7))
    }

    #[test]
    fn test_load_unknown_group_not_found() {
        let store = MemoryStore::new();
        let err = store.load_versions("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_save_assigns_identity() {
        let mut store = MemoryStore::new();
        let first = store.save_version(draft("g")).unwrap();
        assert_eq!(first.version, 1);
        assert!(!first.id.is_empty());

        let second = store
            .save_version(draft("g").with_parent(Some(&first.id)).with_message("shorter"))
            .unwrap();
        assert_eq!(second.version, 2);
        assert_ne!(first.id, second.id);
        assert!(second.timestamp > first.timestamp);

        let loaded = store.load_versions("g").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].version, 1);
    }

    #[test]
    fn test_versions_are_per_group() {
        let mut store = MemoryStore::new();
        let a1 = store.save_version(draft("a")).unwrap();
        store.save_version(draft("a").with_parent(Some(&a1.id))).unwrap();
        let b = store.save_version(draft("b")).unwrap();
        assert_eq!(b.version, 1);
        assert_eq!(store.groups(), vec!["a", "b"]);
    }

    #[test]
    fn test_save_rejects_missing_fields() {
        let mut store = MemoryStore::new();
        let err = store.save_version(draft("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let mut no_prompt = draft("g");
        no_prompt.prompt_content.clear();
        assert!(store.save_version(no_prompt).is_err());
    }

    #[test]
    fn test_save_rejects_unknown_parent() {
        let mut store = MemoryStore::new();
        let err = store
            .save_version(draft("g").with_parent(Some("nope")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_save_rejects_unknown_merge_source() {
        let mut store = MemoryStore::new();
        let root = store.save_version(draft("g")).unwrap();
        let err = store
            .save_version(draft("g").with_parent(Some(&root.id)).merged_from("ghost"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_existing_branch_needs_parent_on_branch() {
        let mut store = MemoryStore::new();
        let c1 = store.save_version(draft("g")).unwrap();
        let f1 = store
            .save_version(draft("g").with_parent(Some(&c1.id)).on_branch("feature"))
            .unwrap();

        // Second feature commit hanging off main would split the branch
        let err = store
            .save_version(draft("g").with_parent(Some(&c1.id)).on_branch("feature"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("feature"));

        // A second root labelled main
        let err = store.save_version(draft("g")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        store
            .save_version(draft("g").with_parent(Some(&f1.id)).on_branch("feature"))
            .unwrap();
        let graph = crate::graph::CommitGraph::build(store.load_versions("g").unwrap()).unwrap();
        assert_eq!(graph.len(), 3);
        assert!(graph.disconnected_branches().is_empty());
    }

    #[test]
    fn test_merge_onto_target_head_accepted() {
        let mut store = MemoryStore::new();
        let c1 = store.save_version(draft("g")).unwrap();
        store
            .save_version(draft("g").with_parent(Some(&c1.id)).on_branch("feature"))
            .unwrap();
        let merged = store
            .save_version(draft("g").with_parent(Some(&c1.id)).merged_from("feature"))
            .unwrap();
        assert_eq!(merged.branch, "main");
        assert_eq!(merged.version, 3);
    }

    #[test]
    fn test_save_rejects_nan_temperature() {
        let mut store = MemoryStore::new();
        let mut d = draft("g");
        d.config.temperature = f64::NAN;
        let err = store.save_version(d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(store.groups().is_empty());
    }

    #[test]
    fn test_next_timestamp_strictly_increases() {
        let future = Utc::now() + Duration::days(1);
        let ts = next_timestamp(Some(future));
        assert!(ts > future);
        assert_eq!(ts - future, Duration::microseconds(1));

        let past = Utc::now() - Duration::days(1);
        assert!(next_timestamp(Some(past)) > past);
        assert_eq!(next_timestamp(None).timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_next_version() {
        assert_eq!(next_version(&[]), 1);
    }
}
