use std::error::Error;
use std::fmt;
use std::path::Path;

use rusqlite::{Connection, ErrorCode};

use crate::db::{self, Store};
use crate::domain::identifier::NoteRef;
use crate::domain::note::{NewNote, Note, NotePatch};
use crate::domain::tags::normalize_tags;
use crate::links::link_marker;
use crate::listing::NoteListFilter;
use crate::timestamp;
use crate::transfer::ImportedNote;

/// The note operations shared by the CLI and the HTTP API.
///
/// Every call runs in its own transaction on the owned [`Store`]; a failed
/// call leaves the database untouched.
pub struct NoteService {
    store: Store,
}

impl NoteService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn open(db_path: &Path) -> Result<Self, ServiceError> {
        ensure_parent_dir(db_path)?;
        Ok(Self::new(Store::open(db_path)?))
    }

    #[allow(dead_code)]
    pub fn in_memory() -> Result<Self, ServiceError> {
        Ok(Self::new(Store::open_in_memory()?))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Swaps the backing store, handing back the previous one.
    #[allow(dead_code)]
    pub fn replace_store(&mut self, store: Store) -> Store {
        std::mem::replace(&mut self.store, store)
    }

    pub fn create_note<I, S>(
        &self,
        title: &str,
        content: &str,
        tags: I,
    ) -> Result<Note, ServiceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = timestamp::now_utc();
        let row = NewNote {
            title: title.to_string(),
            content: content.to_string(),
            tags: normalize_tags(tags),
            pinned: false,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        let note = self.in_transaction(|conn| {
            let id = db::insert_note(conn, &row)?;
            db::get_note(conn, id)?.ok_or_else(|| ServiceError::NotFound(format!("note #{id}")))
        })?;
        log::debug!("created note #{}", note.id);
        Ok(note)
    }

    pub fn list_notes(&self, filter: &NoteListFilter) -> Result<Vec<Note>, ServiceError> {
        self.in_transaction(|conn| Ok(db::query_notes(conn, filter)?))
    }

    /// Resolves an id or exact title. Numeric input is only ever an id.
    pub fn get_note(&self, identifier: impl Into<NoteRef>) -> Result<Option<Note>, ServiceError> {
        let note_ref = identifier.into();
        self.in_transaction(|conn| resolve(conn, &note_ref))
    }

    /// Exact title lookup, for titles that look like numbers.
    pub fn get_note_by_title(&self, title: &str) -> Result<Option<Note>, ServiceError> {
        self.in_transaction(|conn| Ok(db::find_note_by_title(conn, title)?))
    }

    /// Applies the fields present in `patch` and always bumps `updated_at`.
    pub fn edit_note(
        &self,
        identifier: impl Into<NoteRef>,
        mut patch: NotePatch,
    ) -> Result<Note, ServiceError> {
        patch.tags = patch.tags.map(normalize_tags);
        let note_ref = identifier.into();
        let note = self.in_transaction(|conn| {
            let mut note = require(conn, &note_ref)?;
            patch.apply(&mut note);
            touch(&mut note);
            db::update_note(conn, &note)?;
            reload(conn, note.id)
        })?;
        log::debug!("edited note #{}", note.id);
        Ok(note)
    }

    /// Archives (soft) or removes (hard) a note. A missing note is not an
    /// error.
    pub fn delete_note(
        &self,
        identifier: impl Into<NoteRef>,
        hard: bool,
    ) -> Result<(), ServiceError> {
        let note_ref = identifier.into();
        self.in_transaction(|conn| {
            let Some(mut note) = resolve(conn, &note_ref)? else {
                log::debug!("delete of {note_ref} skipped: no such note");
                return Ok(());
            };
            if hard {
                db::delete_note(conn, note.id)?;
                log::debug!("purged note #{}", note.id);
            } else {
                note.archived = true;
                touch(&mut note);
                db::update_note(conn, &note)?;
                log::debug!("archived note #{}", note.id);
            }
            Ok(())
        })
    }

    pub fn pin_note(
        &self,
        identifier: impl Into<NoteRef>,
        value: bool,
    ) -> Result<Note, ServiceError> {
        self.edit_note(identifier, NotePatch::pinned(value))
    }

    pub fn archive_note(
        &self,
        identifier: impl Into<NoteRef>,
        value: bool,
    ) -> Result<Note, ServiceError> {
        self.edit_note(identifier, NotePatch::archived(value))
    }

    pub fn restore_note(&self, identifier: impl Into<NoteRef>) -> Result<Note, ServiceError> {
        self.archive_note(identifier, false)
    }

    pub fn purge_note(&self, identifier: impl Into<NoteRef>) -> Result<(), ServiceError> {
        self.delete_note(identifier, true)
    }

    /// Notes whose content contains `[[<target title>]]` verbatim. Rescans
    /// every row on each call. Unknown targets yield an empty list.
    pub fn backlinks_for(
        &self,
        identifier: impl Into<NoteRef>,
        include_archived: bool,
    ) -> Result<Vec<Note>, ServiceError> {
        let note_ref = identifier.into();
        self.in_transaction(|conn| match resolve(conn, &note_ref)? {
            Some(target) => Ok(db::notes_containing(
                conn,
                &link_marker(&target.title),
                include_archived,
            )?),
            None => Ok(Vec::new()),
        })
    }

    /// Every note, archived included, in id order.
    pub fn export_all(&self) -> Result<Vec<Note>, ServiceError> {
        self.in_transaction(|conn| Ok(db::list_all_notes(conn)?))
    }

    /// Inserts `records` as new notes. Either all land or none do.
    pub fn import_notes(&self, records: Vec<ImportedNote>) -> Result<Vec<Note>, ServiceError> {
        let now = timestamp::now_utc();
        let imported = self.in_transaction(|conn| {
            let mut imported = Vec::with_capacity(records.len());
            for record in records {
                let id = db::insert_note(conn, &record.into_new_note(now)?)?;
                imported.push(reload(conn, id)?);
            }
            Ok(imported)
        })?;
        log::debug!("imported {} note(s)", imported.len());
        Ok(imported)
    }

    fn in_transaction<T>(
        &self,
        work: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let tx = self.store.conn().unchecked_transaction()?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn resolve(conn: &Connection, note_ref: &NoteRef) -> Result<Option<Note>, ServiceError> {
    let note = match note_ref {
        NoteRef::Id(id) => db::get_note(conn, *id)?,
        NoteRef::OutOfRangeId(_) => None,
        NoteRef::Title(title) => db::find_note_by_title(conn, title)?,
    };
    Ok(note)
}

fn require(conn: &Connection, note_ref: &NoteRef) -> Result<Note, ServiceError> {
    resolve(conn, note_ref)?.ok_or_else(|| ServiceError::NotFound(format!("note {note_ref}")))
}

fn reload(conn: &Connection, id: i64) -> Result<Note, ServiceError> {
    db::get_note(conn, id)?.ok_or_else(|| ServiceError::NotFound(format!("note #{id}")))
}

/// Bumps `updated_at` to now without ever moving it backwards.
fn touch(note: &mut Note) {
    note.updated_at = timestamp::now_utc().max(note.updated_at);
}

/// Front-end check for new notes. The service itself stores any title.
pub fn validate_title(title: &str) -> Result<(), ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation(
            "title must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[derive(Debug)]
pub enum ServiceError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    Validation(String),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Io(err) => write!(f, "I/O error: {}", err),
            ServiceError::Db(err) => write!(f, "database error: {}", err),
            ServiceError::Json(err) => write!(f, "JSON error: {}", err),
            ServiceError::Validation(message) => write!(f, "validation failed: {}", message),
            ServiceError::InvalidArgument(message) => write!(f, "{}", message),
            ServiceError::NotFound(what) => write!(f, "{} not found", what),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServiceError::Io(err) => Some(err),
            ServiceError::Db(err) => Some(err),
            ServiceError::Json(err) => Some(err),
            ServiceError::Validation(_) => None,
            ServiceError::InvalidArgument(_) => None,
            ServiceError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        ServiceError::Io(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            ServiceError::Validation(value.to_string())
        } else {
            ServiceError::Db(value)
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        ServiceError::Json(value)
    }
}
