use std::fmt;

/// How a user-supplied note reference is resolved.
///
/// Purely numeric input always means an id, even when a note carries that
/// number as its title. Anything else is an exact title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteRef {
    Id(i64),
    /// Numeric but outside the id range; resolves to nothing.
    OutOfRangeId(String),
    Title(String),
}

impl NoteRef {
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return match raw.parse::<i64>() {
                Ok(id) => NoteRef::Id(id),
                Err(_) => NoteRef::OutOfRangeId(raw.to_string()),
            };
        }
        NoteRef::Title(raw.to_string())
    }
}

impl From<i64> for NoteRef {
    fn from(value: i64) -> Self {
        NoteRef::Id(value)
    }
}

impl From<&str> for NoteRef {
    fn from(value: &str) -> Self {
        NoteRef::parse(value)
    }
}

impl From<&String> for NoteRef {
    fn from(value: &String) -> Self {
        NoteRef::parse(value)
    }
}

impl fmt::Display for NoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteRef::Id(id) => write!(f, "#{id}"),
            NoteRef::OutOfRangeId(raw) => write!(f, "#{raw}"),
            NoteRef::Title(title) => write!(f, "'{title}'"),
        }
    }
}
