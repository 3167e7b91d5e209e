//! Tree layout for rendering a commit history as indented rows
//!
//! Pure functions: a graph in, a flat list of rows out. The traversal is an
//! explicit worklist, so history depth never turns into call-stack depth.

use std::collections::HashSet;

use crate::graph::CommitGraph;
use crate::record::VersionRecord;

const PIPE: &str = "│  ";
const SPACE: &str = "   ";
const TEE: &str = "├─ ";
const ELBOW: &str = "└─ ";

/// One rendered line of the history tree
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow<'g> {
    pub record: &'g VersionRecord,
    pub depth: usize,
    /// Last among its siblings (by timestamp, then id)
    pub is_last_child: bool,
    /// One flag per ancestor column below the roots: true while that ancestor
    /// still has siblings further down, so a vertical connector continues
    pub line_mask: Vec<bool>,
}

impl LayoutRow<'_> {
    /// Connector prefix for this row, e.g. `│  ├─ `
    pub fn prefix(&self) -> String {
        let mut out = String::new();
        for &continues in &self.line_mask {
            out.push_str(if continues { PIPE } else { SPACE });
        }
        if self.depth > 0 {
            out.push_str(if self.is_last_child { ELBOW } else { TEE });
        }
        out
    }
}

/// Lay out every record of the graph in deterministic pre-order
pub fn layout(graph: &CommitGraph) -> Vec<LayoutRow<'_>> {
    let mut rows = Vec::with_capacity(graph.len());
    let mut visited: HashSet<&str> = HashSet::with_capacity(graph.len());
    let mut stack: Vec<LayoutRow<'_>> = Vec::new();

    push_siblings(&mut stack, &graph.roots(), 0, &[]);

    while let Some(row) = stack.pop() {
        if !visited.insert(row.record.id.as_str()) {
            continue;
        }

        // Roots are separate trees; connectors start one level below them.
        let mut child_mask = row.line_mask.clone();
        if row.depth > 0 {
            child_mask.push(!row.is_last_child);
        }
        push_siblings(
            &mut stack,
            &graph.children(&row.record.id),
            row.depth + 1,
            &child_mask,
        );

        rows.push(row);
    }

    rows
}

/// Push siblings in reverse so the oldest is popped first
fn push_siblings<'g>(
    stack: &mut Vec<LayoutRow<'g>>,
    siblings: &[&'g VersionRecord],
    depth: usize,
    line_mask: &[bool],
) {
    let last = siblings.len().saturating_sub(1);
    for (i, record) in siblings.iter().copied().enumerate().rev() {
        stack.push(LayoutRow {
            record,
            depth,
            is_last_child: i == last,
            line_mask: line_mask.to_vec(),
        });
    }
}

/// Plain-text label used by [`render_plain`]
pub fn plain_label(record: &VersionRecord) -> String {
    let branch = match &record.merge_from {
        Some(source) => format!("{} <- {}", record.branch, source),
        None => record.branch.clone(),
    };
    format!(
        "v{} {} ({}) {}",
        record.version,
        record.short_id(),
        branch,
        record.summary()
    )
}

/// Render the whole graph as uncolored text lines
pub fn render_plain(graph: &CommitGraph) -> Vec<String> {
    layout(graph)
        .iter()
        .map(|row| format!("{}{}", row.prefix(), plain_label(row.record)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{rec, scenario};

    fn shape(rows: &[LayoutRow<'_>]) -> Vec<(String, usize, bool)> {
        rows.iter()
            .map(|r| (r.record.id.clone(), r.depth, r.is_last_child))
            .collect()
    }

    #[test]
    fn test_scenario_layout() {
        let g = scenario();
        let rows = layout(&g);
        assert_eq!(
            shape(&rows),
            vec![
                ("c1".to_string(), 0, true),
                ("c2".to_string(), 1, false),
                ("c3".to_string(), 1, true),
            ]
        );
        assert!(rows.iter().all(|r| r.line_mask.is_empty()));
    }

    #[test]
    fn test_prefixes() {
        let g = CommitGraph::build(vec![
            rec("a", 1, "main", None, 0),
            rec("b", 2, "main", Some("a"), 10),
            rec("c", 3, "main", Some("b"), 20),
            rec("d", 4, "exp", Some("a"), 30),
            rec("e", 5, "exp", Some("d"), 40),
        ])
        .unwrap();
        let rows = layout(&g);
        let prefixes: Vec<String> = rows.iter().map(|r| r.prefix()).collect();
        assert_eq!(
            prefixes,
            vec![
                "".to_string(),
                "├─ ".to_string(),
                "│  └─ ".to_string(),
                "└─ ".to_string(),
                "   └─ ".to_string(),
            ]
        );
        assert_eq!(rows[2].line_mask, vec![true]);
        assert_eq!(rows[4].line_mask, vec![false]);
    }

    #[test]
    fn test_deep_mask_accumulates() {
        let g = CommitGraph::build(vec![
            rec("r", 1, "main", None, 0),
            rec("a", 2, "main", Some("r"), 1),
            rec("a1", 3, "main", Some("a"), 2),
            rec("a1x", 4, "main", Some("a1"), 3),
            rec("a2", 5, "f", Some("a"), 4),
            rec("b", 6, "g", Some("r"), 5),
        ])
        .unwrap();
        let rows = layout(&g);
        let a1x = rows.iter().find(|r| r.record.id == "a1x").unwrap();
        assert_eq!(a1x.depth, 3);
        // a still has sibling b below; a1 still has sibling a2 below
        assert_eq!(a1x.line_mask, vec![true, true]);
        assert_eq!(a1x.prefix(), "│  │  └─ ");
    }

    #[test]
    fn test_multiple_roots_are_siblings() {
        let g = CommitGraph::build(vec![
            rec("r2", 2, "other", None, 50),
            rec("r1", 1, "main", None, 10),
            rec("k", 3, "main", Some("r1"), 60),
        ])
        .unwrap();
        let rows = layout(&g);
        assert_eq!(
            shape(&rows),
            vec![
                ("r1".to_string(), 0, false),
                ("k".to_string(), 1, true),
                ("r2".to_string(), 0, true),
            ]
        );
        // No connector column for the root level
        assert_eq!(rows[1].prefix(), "└─ ");
    }

    #[test]
    fn test_layout_is_repeatable() {
        let g = scenario();
        assert_eq!(shape(&layout(&g)), shape(&layout(&g)));
    }

    #[test]
    fn test_render_plain() {
        let g = scenario();
        let lines = render_plain(&g);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "v1 c1 (main) commit c1");
        assert_eq!(lines[2], "└─ v3 c3 (feature) commit c3");
    }

    #[test]
    fn test_merge_label() {
        let mut m = rec("m", 4, "main", Some("c2"), 400);
        m.merge_from = Some("feature".to_string());
        assert_eq!(plain_label(&m), "v4 m (main <- feature) commit m");
    }

    #[test]
    fn test_empty_graph_layout() {
        let g = CommitGraph::default();
        assert!(layout(&g).is_empty());
    }
}
