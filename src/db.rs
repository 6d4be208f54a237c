use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};

use crate::domain::note::{NewNote, Note};
use crate::domain::tags;
use crate::listing::{NoteListFilter, NoteSort};
use crate::timestamp;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "note_table_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    tags_csv TEXT NOT NULL DEFAULT '',
    pinned INTEGER NOT NULL DEFAULT 0 CHECK (pinned IN (0, 1)),
    archived INTEGER NOT NULL DEFAULT 0 CHECK (archived IN (0, 1)),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (updated_at >= created_at)
);

CREATE INDEX IF NOT EXISTS idx_note_tags_csv ON note(tags_csv);
CREATE INDEX IF NOT EXISTS idx_note_pinned ON note(pinned);
CREATE INDEX IF NOT EXISTS idx_note_archived ON note(archived);
CREATE INDEX IF NOT EXISTS idx_note_updated_at ON note(updated_at);
CREATE INDEX IF NOT EXISTS idx_note_created_at ON note(created_at);
CREATE INDEX IF NOT EXISTS idx_note_title ON note(title);
"#,
}];

const NOTE_COLUMNS: &str =
    "id, title, content, tags_csv, pinned, archived, created_at, updated_at";

/// Owned handle to the notes database.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Opens (creating if needed) the database file at `path`. The parent
    /// directory must exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_connection(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    /// Points this handle at another database file, closing the current one.
    #[allow(dead_code)]
    pub fn reopen(&mut self, path: &Path) -> Result<()> {
        *self = Store::open(path)?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

pub fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                stored_time(timestamp::now_utc())?
            ],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

fn note_from_row(row: &Row<'_>) -> Result<Note> {
    let tags_csv: String = row.get(3)?;
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        tags: tags::from_storage(&tags_csv),
        pinned: row.get(4)?,
        archived: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
    })
}

fn stored_time(value: time::OffsetDateTime) -> Result<String> {
    timestamp::to_storage(value)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn timestamp_column(row: &Row<'_>, index: usize) -> Result<time::OffsetDateTime> {
    let raw: String = row.get(index)?;
    timestamp::from_storage(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

pub fn insert_note(conn: &Connection, note: &NewNote) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO note (title, content, tags_csv, pinned, archived, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#,
        params![
            note.title,
            note.content,
            tags::to_storage(&note.tags),
            note.pinned,
            note.archived,
            stored_time(note.created_at)?,
            stored_time(note.updated_at)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_note(conn: &Connection, id: i64) -> Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM note WHERE id = ?1"),
        params![id],
        note_from_row,
    )
    .optional()
}

/// Exact, case-sensitive title match. The oldest note wins when titles repeat.
pub fn find_note_by_title(conn: &Connection, title: &str) -> Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM note WHERE title = ?1 ORDER BY id ASC LIMIT 1"),
        params![title],
        note_from_row,
    )
    .optional()
}

pub fn query_notes(conn: &Connection, filter: &NoteListFilter) -> Result<Vec<Note>> {
    let mut sql = format!("SELECT {NOTE_COLUMNS} FROM note WHERE 1 = 1");
    let mut args: Vec<String> = Vec::new();

    if !filter.include_archived {
        sql.push_str(" AND archived = 0");
    }
    if let Some(tag) = filter.normalized_tag() {
        args.push(tag);
        sql.push_str(&format!(" AND instr(tags_csv, ?{}) > 0", args.len()));
    }
    if let Some(search) = filter.search_text() {
        args.push(format!("%{}%", escape_like(search)));
        let n = args.len();
        sql.push_str(&format!(
            " AND (title LIKE ?{n} ESCAPE '\\' OR content LIKE ?{n} ESCAPE '\\')"
        ));
    }
    sql.push_str(match filter.sort {
        NoteSort::Updated => " ORDER BY updated_at DESC, id DESC",
        NoteSort::Created => " ORDER BY created_at DESC, id DESC",
        NoteSort::Title => " ORDER BY title ASC, id ASC",
    });

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), note_from_row)?;
    rows.collect()
}

/// Notes whose content contains `marker` verbatim (case-sensitive).
pub fn notes_containing(
    conn: &Connection,
    marker: &str,
    include_archived: bool,
) -> Result<Vec<Note>> {
    let archived_clause = if include_archived {
        ""
    } else {
        " AND archived = 0"
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTE_COLUMNS} FROM note WHERE instr(content, ?1) > 0{archived_clause} \
         ORDER BY updated_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![marker], note_from_row)?;
    rows.collect()
}

pub fn list_all_notes(conn: &Connection) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM note ORDER BY id ASC"))?;
    let rows = stmt.query_map([], note_from_row)?;
    rows.collect()
}

/// Writes every mutable column of `note`. `created_at` is never rewritten.
pub fn update_note(conn: &Connection, note: &Note) -> Result<usize> {
    conn.execute(
        r#"
UPDATE note
SET title = ?2,
    content = ?3,
    tags_csv = ?4,
    pinned = ?5,
    archived = ?6,
    updated_at = ?7
WHERE id = ?1
"#,
        params![
            note.id,
            note.title,
            note.content,
            tags::to_storage(&note.tags),
            note.pinned,
            note.archived,
            stored_time(note.updated_at)?,
        ],
    )
}

pub fn delete_note(conn: &Connection, id: i64) -> Result<usize> {
    conn.execute("DELETE FROM note WHERE id = ?1", params![id])
}

pub fn count_notes(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM note", [], |row| row.get(0))
}

#[allow(dead_code)]
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
