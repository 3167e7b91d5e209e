//! Version records and drafts
//!
//! A [`VersionRecord`] is one saved snapshot of a prompt and its model
//! configuration. Records are immutable: the store assigns `id`, `version`
//! and `timestamp` once, from a [`VersionDraft`], and nothing rewrites them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::error::{Result, VcsError};

/// Branch used when a draft doesn't name one
pub const DEFAULT_BRANCH: &str = "main";

/// Temperature given to configs that don't specify one
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

/// Model configuration saved alongside a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBlob {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Tool definitions, kept as raw JSON (schemas vary per provider)
    #[serde(default)]
    pub tools: Vec<Value>,
    /// Provider-specific extension fields (max_tokens, top_p, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ConfigBlob {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            tools: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl ConfigBlob {
    pub fn new(provider: &str, model: &str, temperature: f64) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            temperature,
            ..Self::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }
}

/// One immutable saved snapshot of a prompt + configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub id: String,
    pub config_group_id: String,
    /// Starts at 1, unique and increasing within `config_group_id`
    pub version: u32,
    pub parent_id: Option<String>,
    pub branch: String,
    /// Source branch, set only on merge commits
    pub merge_from: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub prompt_content: String,
    #[serde(rename = "configBlob")]
    pub config: ConfigBlob,
}

impl VersionRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_merge(&self) -> bool {
        self.merge_from.is_some()
    }

    /// Short form of the id for display (first 8 chars)
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// First line of the message, or a placeholder for empty messages
    pub fn summary(&self) -> &str {
        self.message
            .lines()
            .next()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or("(no message)")
    }
}

/// Ordering used at every branching point: timestamp, then id
pub(crate) fn chronological(a: &VersionRecord, b: &VersionRecord) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.id.cmp(&b.id))
}

/// A record before the store has assigned `id`, `version` and `timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDraft {
    pub config_group_id: String,
    pub parent_id: Option<String>,
    pub branch: String,
    pub merge_from: Option<String>,
    #[serde(default)]
    pub message: String,
    pub prompt_content: String,
    #[serde(rename = "configBlob", default)]
    pub config: ConfigBlob,
}

impl VersionDraft {
    /// Start a draft on the default branch with no parent
    pub fn new(config_group_id: &str, prompt_content: &str, config: ConfigBlob) -> Self {
        Self {
            config_group_id: config_group_id.to_string(),
            parent_id: None,
            branch: DEFAULT_BRANCH.to_string(),
            merge_from: None,
            message: String::new(),
            prompt_content: prompt_content.to_string(),
            config,
        }
    }

    pub fn on_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    pub fn with_parent(mut self, parent_id: Option<&str>) -> Self {
        self.parent_id = parent_id.map(|p| p.to_string());
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    pub fn merged_from(mut self, branch: &str) -> Self {
        self.merge_from = Some(branch.to_string());
        self
    }

    /// Check required fields. Message may be empty.
    pub fn validate(&self) -> Result<()> {
        if self.config_group_id.trim().is_empty() {
            return Err(VcsError::Validation("configGroupId is required".to_string()));
        }
        if self.branch.trim().is_empty() {
            return Err(VcsError::Validation("branch name is required".to_string()));
        }
        if self.prompt_content.is_empty() {
            return Err(VcsError::Validation("prompt content is required".to_string()));
        }
        if !self.config.temperature.is_finite() {
            return Err(VcsError::Validation(format!(
                "temperature must be a finite number, got {}",
                self.config.temperature
            )));
        }
        if self.merge_from.as_deref() == Some(self.branch.as_str()) {
            return Err(VcsError::Validation(format!(
                "mergeFrom must differ from the commit's own branch '{}'",
                self.branch
            )));
        }
        Ok(())
    }

    /// Seal the draft with store-assigned identity
    pub fn into_record(self, id: String, version: u32, timestamp: DateTime<Utc>) -> VersionRecord {
        VersionRecord {
            id,
            config_group_id: self.config_group_id,
            version,
            parent_id: self.parent_id,
            branch: self.branch,
            merge_from: self.merge_from,
            message: self.message,
            timestamp,
            prompt_content: self.prompt_content,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn draft() -> VersionDraft {
        VersionDraft::new("support-bot", "You are helpful.", ConfigBlob::new("openai", "gpt-4o", 0.7))
    }

    #[test]
    fn test_draft_defaults() {
        let d = draft();
        assert_eq!(d.branch, DEFAULT_BRANCH);
        assert!(d.parent_id.is_none());
        assert!(d.merge_from.is_none());
        assert!(d.message.is_empty());
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_validate_required_fields() {
        let mut d = draft();
        d.config_group_id = "  ".to_string();
        assert!(d.validate().is_err());

        let mut d = draft();
        d.prompt_content.clear();
        assert!(d.validate().is_err());

        let d = draft().on_branch("");
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_self_merge_rejected() {
        let d = draft().on_branch("feature").merged_from("feature");
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("mergeFrom"));
    }

    #[test]
    fn test_validate_rejects_non_finite_temperature() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut d = draft();
            d.config.temperature = bad;
            let err = d.validate().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
            assert!(err.to_string().contains("temperature"));
        }

        let mut d = draft();
        d.config.temperature = 0.0;
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_into_record_keeps_content() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let rec = draft()
            .on_branch("feature")
            .with_parent(Some("p1"))
            .with_message("tweak tone")
            .into_record("r1".to_string(), 3, ts);
        assert_eq!(rec.id, "r1");
        assert_eq!(rec.version, 3);
        assert_eq!(rec.parent_id.as_deref(), Some("p1"));
        assert_eq!(rec.branch, "feature");
        assert_eq!(rec.timestamp, ts);
        assert_eq!(rec.config.model, "gpt-4o");
        assert!(!rec.is_root());
        assert!(!rec.is_merge());
    }

    #[test]
    fn test_config_blob_extension_fields_flatten() {
        let blob: ConfigBlob = serde_json::from_value(json!({
            "provider": "anthropic",
            "model": "claude-3-5-sonnet",
            "max_tokens": 1024,
            "tools": [{"name": "search"}]
        }))
        .unwrap();
        assert_eq!(blob.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(blob.tools.len(), 1);
        assert_eq!(blob.extra.get("max_tokens"), Some(&json!(1024)));

        let back = serde_json::to_value(&blob).unwrap();
        assert_eq!(back["max_tokens"], json!(1024));
        assert_eq!(back["model"], json!("claude-3-5-sonnet"));
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let rec = draft().into_record("r1".to_string(), 1, ts);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["configGroupId"], json!("support-bot"));
        assert_eq!(v["promptContent"], json!("You are helpful."));
        assert!(v["parentId"].is_null());
        assert!(v["configBlob"].is_object());
    }

    #[test]
    fn test_summary_and_short_id() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let rec = draft()
            .with_message("first line\nsecond line")
            .into_record("0123456789abcdef".to_string(), 1, ts);
        assert_eq!(rec.summary(), "first line");
        assert_eq!(rec.short_id(), "01234567");

        let empty = draft().into_record("ab".to_string(), 1, ts);
        assert_eq!(empty.summary(), "(no message)");
        assert_eq!(empty.short_id(), "ab");
    }

    #[test]
    fn test_chronological_breaks_ties_by_id() {
        let ts = Utc.timestamp_opt(10, 0).unwrap();
        let a = draft().into_record("a".to_string(), 1, ts);
        let b = draft().into_record("b".to_string(), 2, ts);
        assert_eq!(chronological(&a, &b), Ordering::Less);
        assert_eq!(chronological(&b, &a), Ordering::Greater);
    }
}
