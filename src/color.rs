//! Stable branch colors
//!
//! Branches are ranked by first appearance (timestamp of their earliest
//! commit, ties by name) and take `palette[rank % palette.len()]`. New
//! commits never move an existing branch's first appearance, and a new
//! branch's first commit is newer than every existing branch origin, so
//! existing ranks are never disturbed by growth.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::CommitGraph;

/// Display color for a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchColor {
    Green,
    Blue,
    Magenta,
    Yellow,
    Cyan,
    Red,
    BrightBlue,
    BrightMagenta,
}

/// Palette used when the config doesn't provide one
pub const DEFAULT_PALETTE: &[BranchColor] = &[
    BranchColor::Green,
    BranchColor::Blue,
    BranchColor::Magenta,
    BranchColor::Yellow,
    BranchColor::Cyan,
    BranchColor::Red,
    BranchColor::BrightBlue,
    BranchColor::BrightMagenta,
];

impl BranchColor {
    /// Hex value for web renderers
    pub fn hex(&self) -> &'static str {
        match self {
            BranchColor::Green => "#22C55E",
            BranchColor::Blue => "#3B82F6",
            BranchColor::Magenta => "#D946EF",
            BranchColor::Yellow => "#EAB308",
            BranchColor::Cyan => "#06B6D4",
            BranchColor::Red => "#EF4444",
            BranchColor::BrightBlue => "#60A5FA",
            BranchColor::BrightMagenta => "#F0ABFC",
        }
    }

    /// Terminal color for the CLI
    pub fn terminal(&self) -> colored::Color {
        match self {
            BranchColor::Green => colored::Color::Green,
            BranchColor::Blue => colored::Color::Blue,
            BranchColor::Magenta => colored::Color::Magenta,
            BranchColor::Yellow => colored::Color::Yellow,
            BranchColor::Cyan => colored::Color::Cyan,
            BranchColor::Red => colored::Color::Red,
            BranchColor::BrightBlue => colored::Color::BrightBlue,
            BranchColor::BrightMagenta => colored::Color::BrightMagenta,
        }
    }
}

/// Branch → color assignment for one graph snapshot
#[derive(Debug, Clone)]
pub struct BranchColors {
    order: Vec<String>,
    ranks: HashMap<String, usize>,
    palette: Vec<BranchColor>,
}

impl BranchColors {
    pub fn new(graph: &CommitGraph) -> Self {
        Self::with_palette(graph, DEFAULT_PALETTE)
    }

    /// Use a custom palette; an empty one falls back to [`DEFAULT_PALETTE`]
    pub fn with_palette(graph: &CommitGraph, palette: &[BranchColor]) -> Self {
        let mut origins: Vec<(&str, chrono::DateTime<chrono::Utc>)> = graph
            .branches()
            .into_iter()
            .filter_map(|b| graph.branch_origin(b).map(|r| (b, r.timestamp)))
            .collect();
        origins.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let order: Vec<String> = origins.into_iter().map(|(b, _)| b.to_string()).collect();
        let ranks = order
            .iter()
            .enumerate()
            .map(|(rank, b)| (b.clone(), rank))
            .collect();
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.to_vec()
        } else {
            palette.to_vec()
        };

        Self {
            order,
            ranks,
            palette,
        }
    }

    /// Branch names in rank order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn rank(&self, branch: &str) -> Option<usize> {
        self.ranks.get(branch).copied()
    }

    /// Color of a branch present in the snapshot
    pub fn color_of(&self, branch: &str) -> Option<BranchColor> {
        self.rank(branch)
            .map(|rank| self.palette[rank % self.palette.len()])
    }
}

/// One-shot lookup with the default palette
pub fn color_of(graph: &CommitGraph, branch: &str) -> Option<BranchColor> {
    BranchColors::new(graph).color_of(branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{rec, scenario};

    #[test]
    fn test_first_appearance_order() {
        let g = scenario();
        let colors = BranchColors::new(&g);
        assert_eq!(colors.order(), &["main".to_string(), "feature".to_string()]);
        assert_eq!(colors.color_of("main"), Some(BranchColor::Green));
        assert_eq!(colors.color_of("feature"), Some(BranchColor::Blue));
        assert_eq!(colors.color_of("nope"), None);
    }

    #[test]
    fn test_idempotent() {
        let g = scenario();
        assert_eq!(color_of(&g, "feature"), color_of(&g, "feature"));
    }

    #[test]
    fn test_palette_wraps() {
        let mut records = vec![rec("r", 1, "b0", None, 0)];
        for i in 1..=3 {
            records.push(rec(&format!("c{}", i), i + 1, &format!("b{}", i), Some("r"), i as i64));
        }
        let g = CommitGraph::build(records).unwrap();
        let palette = [BranchColor::Red, BranchColor::Cyan];
        let colors = BranchColors::with_palette(&g, &palette);
        assert_eq!(colors.color_of("b0"), Some(BranchColor::Red));
        assert_eq!(colors.color_of("b1"), Some(BranchColor::Cyan));
        assert_eq!(colors.color_of("b2"), Some(BranchColor::Red));
        assert_eq!(colors.color_of("b3"), Some(BranchColor::Cyan));
    }

    #[test]
    fn test_empty_palette_uses_default() {
        let g = scenario();
        let colors = BranchColors::with_palette(&g, &[]);
        assert_eq!(colors.color_of("main"), Some(DEFAULT_PALETTE[0]));
    }

    #[test]
    fn test_new_branch_keeps_existing_colors() {
        let before = scenario();
        let main_before = color_of(&before, "main");
        let feature_before = color_of(&before, "feature");

        let mut records = before.records().to_vec();
        records.push(rec("c4", 4, "main", Some("c2"), 400));
        records.push(rec("c5", 5, "hotfix", Some("c4"), 500));
        let after = CommitGraph::build(records).unwrap();

        assert_eq!(color_of(&after, "main"), main_before);
        assert_eq!(color_of(&after, "feature"), feature_before);
        assert_eq!(BranchColors::new(&after).rank("hotfix"), Some(2));
    }

    #[test]
    fn test_same_timestamp_origins_ranked_by_name() {
        let g = CommitGraph::build(vec![
            rec("r", 1, "main", None, 0),
            rec("x", 2, "zeta", Some("r"), 10),
            rec("y", 3, "alpha", Some("r"), 10),
        ])
        .unwrap();
        let colors = BranchColors::new(&g);
        assert_eq!(colors.rank("alpha"), Some(1));
        assert_eq!(colors.rank("zeta"), Some(2));
    }

    #[test]
    fn test_hex_values() {
        for color in DEFAULT_PALETTE {
            let hex = color.hex();
            assert!(hex.starts_with('#'));
            assert_eq!(hex.len(), 7);
        }
    }

    #[test]
    fn test_palette_from_toml_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            palette: Vec<BranchColor>,
        }
        let w: Wrapper = toml::from_str(r#"palette = ["bright_blue", "red"]"#).unwrap();
        assert_eq!(w.palette, vec![BranchColor::BrightBlue, BranchColor::Red]);
    }
}
