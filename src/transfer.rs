//! JSON backup format: an array of notes with ISO-8601 timestamps, the same
//! shape the HTTP API returns.

use std::path::Path;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::domain::note::{NewNote, Note};
use crate::domain::tags::normalize_tags;
use crate::service::ServiceError;
use crate::timestamp::{parse_iso8601, to_utc};

/// One entry of an import file. Only `title` is required; `id` is accepted
/// and ignored because storage assigns fresh ids.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ImportedNote {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ImportedNote {
    pub(crate) fn into_new_note(self, now: OffsetDateTime) -> Result<NewNote, ServiceError> {
        let created_at = parse_optional(self.created_at.as_deref(), "created_at")?;
        let updated_at = parse_optional(self.updated_at.as_deref(), "updated_at")?;
        let created_at = created_at.or(updated_at).unwrap_or(now);
        let updated_at = updated_at.unwrap_or(created_at);
        Ok(NewNote {
            title: self.title,
            content: self.content,
            tags: normalize_tags(self.tags),
            pinned: self.pinned,
            archived: self.archived,
            created_at,
            updated_at,
        })
    }
}

fn parse_optional(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<OffsetDateTime>, ServiceError> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => {
            let parsed = parse_iso8601(value).ok_or_else(|| {
                ServiceError::InvalidArgument(format!(
                    "{field} '{value}' is not an ISO-8601 timestamp"
                ))
            })?;
            to_utc(parsed).map(Some).ok_or_else(|| {
                ServiceError::InvalidArgument(format!(
                    "{field} '{value}' is outside the supported date range"
                ))
            })
        }
    }
}

pub fn write_export(path: &Path, notes: &[Note]) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let payload = serde_json::to_string_pretty(notes)?;
    std::fs::write(path, payload)?;
    Ok(())
}

pub fn read_import(path: &Path) -> Result<Vec<ImportedNote>, ServiceError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
