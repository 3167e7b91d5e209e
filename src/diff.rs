//! Diffs between two versions
//!
//! Two independent algorithms:
//! - [`diff_lines`]: positional, index-aligned line diff of prompt bodies,
//!   producing paired left/right rows for a side-by-side view
//! - [`diff_config`]: field-level diff of model configuration
//!
//! The line diff compares line `i` with line `i` and nothing else. An
//! insertion in the middle shifts every following pair out of alignment;
//! that is the documented behavior, not an LCS alignment.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Result, VcsError};
use crate::graph::CommitGraph;
use crate::record::{ConfigBlob, VersionRecord};

/// How a row of the side-by-side view is marked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Same,
    Added,
    Removed,
    /// Padding where this side has no line at the index
    Empty,
}

/// One row of one side of the diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub kind: LineKind,
    pub text: String,
    /// 1-based line number on this side; `None` for padding rows
    pub line_number: Option<usize>,
}

impl DiffRow {
    fn line(kind: LineKind, text: &str, index: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            line_number: Some(index + 1),
        }
    }

    fn empty() -> Self {
        Self {
            kind: LineKind::Empty,
            text: String::new(),
            line_number: None,
        }
    }
}

/// Paired rows; `left.len() == right.len()` always holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDiff {
    pub left: Vec<DiffRow>,
    pub right: Vec<DiffRow>,
}

impl LineDiff {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// True when every row is `Same`
    pub fn is_unchanged(&self) -> bool {
        self.left.iter().all(|r| r.kind == LineKind::Same)
            && self.right.iter().all(|r| r.kind == LineKind::Same)
    }

    /// Number of row pairs that aren't `Same`
    pub fn changed_rows(&self) -> usize {
        self.left
            .iter()
            .zip(&self.right)
            .filter(|(l, r)| l.kind != LineKind::Same || r.kind != LineKind::Same)
            .count()
    }

    /// Iterate left/right pairs
    pub fn rows(&self) -> impl Iterator<Item = (&DiffRow, &DiffRow)> {
        self.left.iter().zip(&self.right)
    }
}

/// Split on `\n`; an empty text is one empty line, as in an editor buffer
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Index-aligned line diff of two texts
pub fn diff_lines(before: &str, after: &str) -> LineDiff {
    let old = split_lines(before);
    let new = split_lines(after);
    let rows = old.len().max(new.len());

    let mut left = Vec::with_capacity(rows);
    let mut right = Vec::with_capacity(rows);

    for i in 0..rows {
        match (old.get(i), new.get(i)) {
            (Some(o), Some(n)) if o == n => {
                left.push(DiffRow::line(LineKind::Same, o, i));
                right.push(DiffRow::line(LineKind::Same, n, i));
            }
            (Some(o), Some(n)) => {
                left.push(DiffRow::line(LineKind::Removed, o, i));
                right.push(DiffRow::line(LineKind::Added, n, i));
            }
            (Some(o), None) => {
                left.push(DiffRow::line(LineKind::Removed, o, i));
                right.push(DiffRow::empty());
            }
            (None, Some(n)) => {
                left.push(DiffRow::empty());
                right.push(DiffRow::line(LineKind::Added, n, i));
            }
            (None, None) => unreachable!("index below max of both lengths"),
        }
    }

    LineDiff { left, right }
}

/// Configuration fields compared by [`diff_config`], in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    Provider,
    Model,
    Temperature,
    Tools,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::Provider => "provider",
            ConfigField::Model => "model",
            ConfigField::Temperature => "temperature",
            ConfigField::Tools => "tools",
        }
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed configuration field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChange {
    pub field: ConfigField,
    pub old_value: Value,
    pub new_value: Value,
}

/// Canonical form of a tool list: serde_json's default map is key-sorted
fn canonical_tools(tools: &[Value]) -> String {
    serde_json::to_string(tools).unwrap_or_default()
}

/// Field-level config diff: provider, model, temperature, then the whole tool list
pub fn diff_config(before: &ConfigBlob, after: &ConfigBlob) -> Vec<ConfigChange> {
    let mut changes = Vec::new();

    if before.provider != after.provider {
        changes.push(ConfigChange {
            field: ConfigField::Provider,
            old_value: json!(before.provider),
            new_value: json!(after.provider),
        });
    }
    if before.model != after.model {
        changes.push(ConfigChange {
            field: ConfigField::Model,
            old_value: json!(before.model),
            new_value: json!(after.model),
        });
    }
    if before.temperature != after.temperature {
        changes.push(ConfigChange {
            field: ConfigField::Temperature,
            old_value: json!(before.temperature),
            new_value: json!(after.temperature),
        });
    }
    if canonical_tools(&before.tools) != canonical_tools(&after.tools) {
        changes.push(ConfigChange {
            field: ConfigField::Tools,
            old_value: Value::Array(before.tools.clone()),
            new_value: Value::Array(after.tools.clone()),
        });
    }

    changes
}

/// Both diffs between two records
#[derive(Debug, Clone, Serialize)]
pub struct VersionDiff<'g> {
    pub from: &'g VersionRecord,
    pub to: &'g VersionRecord,
    pub prompt: LineDiff,
    pub config: Vec<ConfigChange>,
}

impl VersionDiff<'_> {
    pub fn is_identical(&self) -> bool {
        self.prompt.is_unchanged() && self.config.is_empty()
    }
}

pub fn diff_versions<'g>(from: &'g VersionRecord, to: &'g VersionRecord) -> VersionDiff<'g> {
    VersionDiff {
        from,
        to,
        prompt: diff_lines(&from.prompt_content, &to.prompt_content),
        config: diff_config(&from.config, &to.config),
    }
}

/// Diff the heads of two branches
pub fn diff_branches<'g>(graph: &'g CommitGraph, from: &str, to: &str) -> Result<VersionDiff<'g>> {
    let a = graph
        .head(from)
        .ok_or_else(|| VcsError::UnknownBranch(from.to_string()))?;
    let b = graph
        .head(to)
        .ok_or_else(|| VcsError::UnknownBranch(to.to_string()))?;
    Ok(diff_versions(a, b))
}
