use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::tags::normalize_tag;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSort {
    /// Most recently updated first.
    #[default]
    Updated,
    /// Most recently created first.
    Created,
    /// Alphabetical by title.
    Title,
}

impl NoteSort {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteSort::Updated => "updated",
            NoteSort::Created => "created",
            NoteSort::Title => "title",
        }
    }
}

impl fmt::Display for NoteSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNoteSortError(pub String);

impl fmt::Display for ParseNoteSortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported sort '{}'; use updated|created|title",
            self.0
        )
    }
}

impl std::error::Error for ParseNoteSortError {}

impl FromStr for NoteSort {
    type Err = ParseNoteSortError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "updated" => Ok(NoteSort::Updated),
            "created" => Ok(NoteSort::Created),
            "title" => Ok(NoteSort::Title),
            _ => Err(ParseNoteSortError(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListFilter {
    pub tag: Option<String>,
    pub search: Option<String>,
    pub include_archived: bool,
    pub sort: NoteSort,
}

impl NoteListFilter {
    /// The tag filter as matched against stored tags, or `None` when blank.
    pub fn normalized_tag(&self) -> Option<String> {
        self.tag.as_deref().and_then(normalize_tag)
    }

    /// The search text, or `None` when empty.
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref().filter(|text| !text.is_empty())
    }

    pub fn summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.include_archived {
            parts.push("archived=true".to_string());
        }
        if let Some(tag) = self.normalized_tag() {
            parts.push(format!("tag={tag}"));
        }
        if let Some(search) = self.search_text() {
            parts.push(format!("search={search}"));
        }
        if self.sort != NoteSort::default() {
            parts.push(format!("sort={}", self.sort));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}
