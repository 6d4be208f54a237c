use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::domain::identifier::NoteRef;
use crate::domain::note::{Note, NotePatch};
use crate::links::extract_links;
use crate::listing::{NoteListFilter, NoteSort};
use crate::service::{validate_title, ServiceError};

type ApiResult<T> = Result<T, ApiError>;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    tag: Option<String>,
    search: Option<String>,
    #[serde(default)]
    archived: bool,
    sort: Option<String>,
}

impl ListParams {
    fn into_filter(self) -> Result<NoteListFilter, ServiceError> {
        let sort = match self.sort.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw
                .parse::<NoteSort>()
                .map_err(|err| ServiceError::InvalidArgument(err.to_string()))?,
            _ => NoteSort::default(),
        };
        Ok(NoteListFilter {
            tag: self.tag,
            search: self.search,
            include_archived: self.archived,
            sort,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EditNoteBody {
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    pinned: Option<bool>,
    archived: Option<bool>,
}

impl From<EditNoteBody> for NotePatch {
    fn from(body: EditNoteBody) -> Self {
        NotePatch {
            title: body.title,
            content: body.content,
            tags: body.tags,
            pinned: body.pinned,
            archived: body.archived,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    hard: bool,
}

/// `?value=` for pin and archive; absent means `true`.
#[derive(Debug, Default, Deserialize)]
pub struct FlagParams {
    value: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BacklinkParams {
    #[serde(default)]
    archived: bool,
}

fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

fn not_found(identifier: &str) -> ApiError {
    ApiError::from(ServiceError::NotFound(format!(
        "note {}",
        NoteRef::parse(identifier)
    )))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<Value> {
    ok()
}

// GET /api/notes
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Note>>> {
    let filter = params.into_filter()?;
    let service = state.service.lock().await;
    Ok(Json(service.list_notes(&filter)?))
}

// POST /api/notes
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateNoteBody>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    validate_title(&body.title)?;
    let service = state.service.lock().await;
    let note = service.create_note(&body.title, &body.content, &body.tags)?;
    Ok((StatusCode::CREATED, Json(note)))
}

// GET /api/notes/:identifier
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Note>> {
    let service = state.service.lock().await;
    match service.get_note(&identifier)? {
        Some(note) => Ok(Json(note)),
        None => Err(not_found(&identifier)),
    }
}

// PATCH /api/notes/:identifier
pub async fn edit_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Json(body): Json<EditNoteBody>,
) -> ApiResult<Json<Note>> {
    let service = state.service.lock().await;
    Ok(Json(service.edit_note(&identifier, body.into())?))
}

// DELETE /api/notes/:identifier?hard=
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<Value>> {
    let service = state.service.lock().await;
    service.delete_note(&identifier, params.hard)?;
    Ok(ok())
}

// POST /api/notes/:identifier/pin?value=
pub async fn pin_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Query(params): Query<FlagParams>,
) -> ApiResult<Json<Note>> {
    let service = state.service.lock().await;
    Ok(Json(service.pin_note(&identifier, params.value.unwrap_or(true))?))
}

// POST /api/notes/:identifier/archive?value=
pub async fn archive_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Query(params): Query<FlagParams>,
) -> ApiResult<Json<Note>> {
    let service = state.service.lock().await;
    Ok(Json(
        service.archive_note(&identifier, params.value.unwrap_or(true))?,
    ))
}

pub async fn restore_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Note>> {
    let service = state.service.lock().await;
    Ok(Json(service.restore_note(&identifier)?))
}

pub async fn purge_note(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Value>> {
    let service = state.service.lock().await;
    service.purge_note(&identifier)?;
    Ok(ok())
}

// GET /api/notes/:identifier/links
pub async fn links(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let service = state.service.lock().await;
    match service.get_note(&identifier)? {
        Some(note) => Ok(Json(extract_links(&note.content))),
        None => Err(not_found(&identifier)),
    }
}

// GET /api/notes/:identifier/backlinks?archived=
pub async fn backlinks(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Query(params): Query<BacklinkParams>,
) -> ApiResult<Json<Vec<Note>>> {
    let service = state.service.lock().await;
    Ok(Json(service.backlinks_for(&identifier, params.archived)?))
}
