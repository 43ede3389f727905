use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A detected section of a document version. `start..end` is the byte range
/// of the section body (the header line itself is excluded, so enhancement
/// splices leave headings untouched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// A snapshot of the working resume. Rows are append-only: edits produce a
/// new version, never mutate in place. `version` is strictly increasing per
/// session and `(session_id, version)` is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentVersionRow {
    pub session_id: Uuid,
    pub version: i32,
    pub content: String,
    pub sections: Json<Vec<SectionSpan>>,
    pub version_name: String,
    pub parent_version: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl DocumentVersionRow {
    /// The canonical section labels of this version, in document order.
    pub fn canonical_labels(&self) -> Vec<String> {
        self.sections.0.iter().map(|s| s.label.clone()).collect()
    }

    /// Finds the span for a canonical label (case-insensitive).
    pub fn section_span(&self, label: &str) -> Option<&SectionSpan> {
        self.sections
            .0
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
    }
}

/// Version listing entry without the full content payload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VersionSummary {
    pub session_id: Uuid,
    pub version: i32,
    pub version_name: String,
    pub parent_version: Option<i32>,
    pub created_at: DateTime<Utc>,
}
