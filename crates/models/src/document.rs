use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document as the portal backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub original_filename: String,
    pub status: DocumentStatus,
    pub dept_id: i64,
    pub project_id: i64,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Server-side processing state of a document.
///
/// `Parsing` and `Embedding` are the in-flight stages; `Parsed` and
/// `Completed` both mean the pipeline finished successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Uploaded,
    Parsing,
    Embedding,
    Parsed,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// Still being worked on by the backend pipeline.
    pub fn is_processing(self) -> bool {
        matches!(self, Self::Parsing | Self::Embedding)
    }

    /// Finished successfully.
    pub fn is_parsed(self) -> bool {
        matches!(self, Self::Parsed | Self::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    Contract,
    Official,
    Regulation,
    Report,
    Manual,
    Proposal,
    General,
}

impl DocumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contract => "CONTRACT",
            Self::Official => "OFFICIAL",
            Self::Regulation => "REGULATION",
            Self::Report => "REPORT",
            Self::Manual => "MANUAL",
            Self::Proposal => "PROPOSAL",
            Self::General => "GENERAL",
        }
    }
}
