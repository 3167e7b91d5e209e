//! Branch merge evaluation
//!
//! A merge does not combine content. It records that `into` now carries the
//! latest state of `from`: the merge commit copies the source head's prompt
//! and config, hangs off the target head, and remembers its source in
//! `merge_from`. Eligibility is "has `from` gained commits since the last
//! merge into `into`".

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{Result, VcsError};
use crate::graph::CommitGraph;
use crate::record::{chronological, VersionDraft, VersionRecord};

/// Outcome of a merge eligibility check
#[derive(Debug, Clone)]
pub struct MergeCheck<'g> {
    pub eligible: bool,
    /// Commits on the source branch not yet merged into the target, oldest first
    pub new_commits: Vec<&'g VersionRecord>,
    /// Timestamp of the previous merge from the same source, if any
    pub cutoff: Option<DateTime<Utc>>,
}

fn require_branches(graph: &CommitGraph, from: &str, into: &str) -> Result<()> {
    for branch in [from, into] {
        if !graph.has_branch(branch) {
            return Err(VcsError::UnknownBranch(branch.to_string()));
        }
    }
    if from == into {
        return Err(VcsError::SelfMerge(from.to_string()));
    }
    Ok(())
}

/// Most recent merge commit on `into` whose source was `from`
pub fn last_merge<'g>(graph: &'g CommitGraph, from: &str, into: &str) -> Option<&'g VersionRecord> {
    graph
        .commits_on_branch(into)
        .into_iter()
        .filter(|r| r.merge_from.as_deref() == Some(from))
        .max_by(|a, b| chronological(a, b))
}

/// Decide whether `from` has anything to merge into `into`
pub fn can_merge<'g>(graph: &'g CommitGraph, from: &str, into: &str) -> Result<MergeCheck<'g>> {
    require_branches(graph, from, into)?;

    let cutoff = last_merge(graph, from, into).map(|m| m.timestamp);
    let new_commits = graph.commits_on_branch_after(from, cutoff);
    debug!(
        "Merge check {} -> {}: {} new commits (cutoff {:?})",
        from,
        into,
        new_commits.len(),
        cutoff
    );

    Ok(MergeCheck {
        eligible: !new_commits.is_empty(),
        new_commits,
        cutoff,
    })
}

/// Build the merge commit draft for `from` into `into`.
///
/// The draft's parent is the target head and its content is the source head's.
/// The store assigns id, version and timestamp when it is saved.
pub fn merge_draft(graph: &CommitGraph, from: &str, into: &str, message: &str) -> Result<VersionDraft> {
    let check = can_merge(graph, from, into)?;
    if !check.eligible {
        return Err(VcsError::NothingToMerge {
            from_branch: from.to_string(),
            into_branch: into.to_string(),
            new_commits: check.new_commits.len(),
        });
    }

    let source = graph
        .head(from)
        .ok_or_else(|| VcsError::UnknownBranch(from.to_string()))?;
    let target = graph
        .head(into)
        .ok_or_else(|| VcsError::UnknownBranch(into.to_string()))?;

    Ok(VersionDraft {
        config_group_id: target.config_group_id.clone(),
        parent_id: Some(target.id.clone()),
        branch: into.to_string(),
        merge_from: Some(from.to_string()),
        message: message.to_string(),
        prompt_content: source.prompt_content.clone(),
        config: source.config.clone(),
    })
}

/// Default message for a merge commit
pub fn default_merge_message(from: &str, into: &str) -> String {
    format!("Merge branch '{}' into {}", from, into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::graph::tests::{rec, scenario};

    fn ids(records: &[&VersionRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_scenario_feature_into_main() {
        let g = scenario();
        let check = can_merge(&g, "feature", "main").unwrap();
        assert!(check.eligible);
        assert_eq!(ids(&check.new_commits), vec!["c3"]);
        assert!(check.cutoff.is_none());

        let draft = merge_draft(&g, "feature", "main", "bring feature in").unwrap();
        assert_eq!(draft.parent_id.as_deref(), Some("c2"));
        assert_eq!(draft.branch, "main");
        assert_eq!(draft.merge_from.as_deref(), Some("feature"));
        assert_eq!(draft.prompt_content, "prompt c3");
        assert_eq!(draft.message, "bring feature in");
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_after_merge_nothing_left() {
        let g = scenario();
        let draft = merge_draft(&g, "feature", "main", "").unwrap();
        let merged = draft.into_record(
            "c4".to_string(),
            g.next_version(),
            g.latest().unwrap().timestamp + chrono::Duration::seconds(1),
        );
        assert_eq!(merged.version, 4);

        let mut records = g.records().to_vec();
        records.push(merged);
        let g2 = CommitGraph::build(records).unwrap();

        let check = can_merge(&g2, "feature", "main").unwrap();
        assert!(!check.eligible);
        assert!(check.new_commits.is_empty());
        assert_eq!(last_merge(&g2, "feature", "main").unwrap().id, "c4");

        let err = merge_draft(&g2, "feature", "main", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NothingToMerge);
        match err {
            VcsError::NothingToMerge { new_commits, .. } => assert_eq!(new_commits, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_new_source_commit_after_merge_is_eligible() {
        let mut records = scenario().records().to_vec();
        let mut m = rec("c4", 4, "main", Some("c2"), 400);
        m.merge_from = Some("feature".to_string());
        records.push(m);
        records.push(rec("c5", 5, "feature", Some("c3"), 500));
        let g = CommitGraph::build(records).unwrap();

        let check = can_merge(&g, "feature", "main").unwrap();
        assert!(check.eligible);
        assert_eq!(ids(&check.new_commits), vec!["c5"]);
        assert_eq!(check.cutoff, Some(g.get("c4").unwrap().timestamp));
    }

    #[test]
    fn test_merge_from_other_source_does_not_count() {
        let mut records = scenario().records().to_vec();
        records.push(rec("d1", 4, "docs", Some("c1"), 350));
        let mut m = rec("m", 5, "main", Some("c2"), 400);
        m.merge_from = Some("docs".to_string());
        records.push(m);
        let g = CommitGraph::build(records).unwrap();

        let check = can_merge(&g, "feature", "main").unwrap();
        assert!(check.eligible);
        assert_eq!(ids(&check.new_commits), vec!["c3"]);
    }

    #[test]
    fn test_main_into_feature() {
        let g = scenario();
        // Every main commit counts as new for a first merge
        let check = can_merge(&g, "main", "feature").unwrap();
        assert_eq!(ids(&check.new_commits), vec!["c1", "c2"]);
        let draft = merge_draft(&g, "main", "feature", "sync").unwrap();
        assert_eq!(draft.parent_id.as_deref(), Some("c3"));
        assert_eq!(draft.prompt_content, "prompt c2");
    }

    #[test]
    fn test_unknown_branch() {
        let g = scenario();
        let err = can_merge(&g, "nope", "main").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownBranch);
        let err = merge_draft(&g, "feature", "release", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownBranch);
        assert!(err.to_string().contains("release"));
    }

    #[test]
    fn test_self_merge_rejected() {
        let g = scenario();
        let err = can_merge(&g, "main", "main").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelfMerge);
    }

    #[test]
    fn test_default_message() {
        assert_eq!(
            default_merge_message("feature", "main"),
            "Merge branch 'feature' into main"
        );
    }
}
