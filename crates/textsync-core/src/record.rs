//! Shared record types for the localization workflow.
//!
//! One [`TextRecord`] per key per project. `value` holds the
//! source-language content the reconciler compares on re-import;
//! `translation` is translator-supplied and never touched by import.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Review status of one text record.
///
/// `draft` and `in_review` are still being worked on — the source document
/// overwrites them silently. `approved` is frozen against silent overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStatus {
    Draft,
    InReview,
    /// Eligible for export. Also parses from the legacy spelling `done`;
    /// the canonical serialized form is always `approved`.
    #[serde(alias = "done")]
    Approved,
}

impl TextStatus {
    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            TextStatus::Draft => "draft",
            TextStatus::InReview => "in_review",
            TextStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for TextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that is neither canonical nor the legacy `done` alias.
#[derive(Debug, Error)]
#[error("unknown text status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TextStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TextStatus::Draft),
            "in_review" => Ok(TextStatus::InReview),
            "approved" | "done" => Ok(TextStatus::Approved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Provenance of a text record: where in which document it was seen.
///
/// Best-effort metadata, appended on import, never authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    /// Origin document id, when the extraction layer knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Node references within the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
}

impl Sources {
    pub fn is_empty(&self) -> bool {
        self.file_id.is_none() && self.nodes.is_empty()
    }
}

/// The persisted unit: one translatable string, unique per key per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub key: String,
    pub project_id: String,
    /// Source-language content; what the reconciler compares.
    pub value: String,
    /// Translator-supplied target-language content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    pub status: TextStatus,
    pub category: String,
    #[serde(default)]
    pub sources: Sources,
    /// RFC 3339, set by the persistence layer.
    pub created_at: String,
    /// RFC 3339, set by the persistence layer.
    pub updated_at: String,
}

/// A transient batch tuple carried from extraction to reconciliation.
///
/// Constructed per batch, consumed once, discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportItem {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Sources>,
}

/// One incoming payload row in any of the layouts observed on the wire.
///
/// Every layout converts through [`IncomingText::into_item`] into the one
/// canonical [`ImportItem`] shape before reconciliation runs, keeping the
/// state machine single-shaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncomingText {
    /// One row per language: `{ key, lang, value }`.
    PerLanguage {
        key: String,
        lang: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sources: Option<Sources>,
    },
    /// Dual-language row: `{ key, value_en, value_ru }`.
    Dual {
        key: String,
        value_en: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_ru: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sources: Option<Sources>,
    },
    /// Single-language row: `{ key, value }`.
    Single {
        key: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sources: Option<Sources>,
    },
}

impl IncomingText {
    /// Convert to the canonical import shape.
    ///
    /// `source_lang` selects the dual-layout column (`en` → `value_en`,
    /// anything else → `value_ru`, falling back to `value_en` when the
    /// target column is absent). A per-language row for a non-source
    /// language still converts; callers import source-language batches.
    pub fn into_item(self, source_lang: &str) -> ImportItem {
        match self {
            IncomingText::Single {
                key,
                value,
                category,
                sources,
            }
            | IncomingText::PerLanguage {
                key,
                value,
                category,
                sources,
                ..
            } => ImportItem {
                key,
                value,
                category,
                sources,
            },
            IncomingText::Dual {
                key,
                value_en,
                value_ru,
                category,
                sources,
            } => {
                let value = if source_lang == "en" {
                    value_en
                } else {
                    value_ru.unwrap_or(value_en)
                };
                ImportItem {
                    key,
                    value,
                    category,
                    sources,
                }
            }
        }
    }

    pub fn key(&self) -> &str {
        match self {
            IncomingText::PerLanguage { key, .. }
            | IncomingText::Dual { key, .. }
            | IncomingText::Single { key, .. } => key,
        }
    }
}

/// Where approved locale files land: one repository path per project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Parent path plus file name, e.g. `locales/text.json`; language
    /// subdirectories are inserted between the two on export.
    pub path: String,
    pub token: String,
}

impl GitHubTarget {
    /// True when the target is filled in enough to push to.
    pub fn is_configured(&self) -> bool {
        !self.owner.is_empty() && !self.repo.is_empty() && !self.token.is_empty()
    }
}

/// One owning scope for text records; keys are unique within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub github: GitHubTarget,
    /// Language the design document is written in.
    pub source_lang: String,
    /// Language translators fill in.
    pub target_lang: String,
    pub is_active: bool,
}
