//! HTTP API exposing namespace operations.

mod error;

pub use error::{status_for, ApiError, ErrorBody};

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::sse::{self, Sse},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{Stream, StreamExt};
use ledgerfs_core::{
    DirEntry, EntryType, EventBus, Meta, Namespace, NamespaceError, Object, ObjectId, Record, Root,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;

/// Caller identity taken from the `X-User-Id` header.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| Self {
                user_id: s.to_string(),
            })
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Shared application state. Mutations take the write guard so each
/// transaction runs alone.
#[derive(Clone)]
pub struct AppState {
    pub namespace: Arc<RwLock<Namespace>>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(namespace: Namespace) -> Self {
        let events = namespace.ledger().events().clone();
        Self {
            namespace: Arc::new(RwLock::new(namespace)),
            events,
        }
    }
}

#[derive(Deserialize)]
struct RootRequest {
    name: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct RootResponse {
    pub id: ObjectId,
    pub name: String,
    pub folder_id: ObjectId,
}

impl From<&Root> for RootResponse {
    fn from(root: &Root) -> Self {
        Self {
            id: root.id(),
            name: root.name().to_string(),
            folder_id: root.folder_id(),
        }
    }
}

#[derive(Deserialize)]
struct FileRequest {
    name: String,
    /// Base64 encoded.
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct FolderRequest {
    name: String,
}

#[derive(Deserialize)]
struct LinkRequest {
    name: String,
    target_id: ObjectId,
}

#[derive(Deserialize)]
struct DeleteParams {
    kind: EntryType,
    object_id: ObjectId,
}

#[derive(Deserialize)]
struct RenameRequest {
    new_name: String,
}

#[derive(Deserialize)]
struct ResolveParams {
    path: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct EntryResponse {
    pub name: String,
    pub entry_type: EntryType,
    pub object_id: ObjectId,
}

impl EntryResponse {
    fn new(name: impl Into<String>, entry: DirEntry) -> Self {
        Self {
            name: name.into(),
            entry_type: entry.entry_type(),
            object_id: entry.object_id(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct CreatedResponse {
    pub id: ObjectId,
    pub folder_id: ObjectId,
    pub name: String,
    pub entry_type: EntryType,
}

/// A ledger record as served over HTTP. File content is base64 encoded.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ObjectResponse {
    pub id: ObjectId,
    pub owner: String,
    pub version: u64,
    pub object: ObjectBody,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "kind")]
pub enum ObjectBody {
    File {
        meta: Meta,
        content: String,
    },
    Folder {
        meta: Meta,
        entries: Vec<EntryResponse>,
    },
    Link {
        meta: Meta,
        target_id: ObjectId,
    },
    Root {
        name: String,
        folder_id: ObjectId,
    },
}

impl From<&Record> for ObjectResponse {
    fn from(record: &Record) -> Self {
        let object = match &record.object {
            Object::File(file) => ObjectBody::File {
                meta: *file.meta(),
                content: STANDARD.encode(file.content()),
            },
            Object::Folder(folder) => {
                let mut entries: Vec<EntryResponse> = folder
                    .entries()
                    .iter()
                    .map(|(name, entry)| EntryResponse::new(name, entry))
                    .collect();
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                ObjectBody::Folder {
                    meta: *folder.meta(),
                    entries,
                }
            }
            Object::Link(link) => ObjectBody::Link {
                meta: *link.meta(),
                target_id: link.target_id(),
            },
            Object::Root(root) => ObjectBody::Root {
                name: root.name().to_string(),
                folder_id: root.folder_id(),
            },
        };
        Self {
            id: record.id,
            owner: record.owner.clone(),
            version: record.version,
            object,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/roots", get(list_roots).post(create_root))
        .route("/folders/{id}", get(list_folder))
        .route("/folders/{id}/files", post(create_file))
        .route("/folders/{id}/folders", post(create_folder))
        .route("/folders/{id}/links", post(create_link))
        .route(
            "/folders/{id}/entries/{name}",
            put(rename_entry).delete(delete_entry),
        )
        .route("/folders/{id}/resolve", get(resolve_path))
        .route("/objects/{id}", get(get_object))
        .route("/events", get(event_stream))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_root(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<RootRequest>,
) -> Result<(StatusCode, Json<RootResponse>), ApiError> {
    let mut ns = state.namespace.write().await;
    let root = ns.create_root(&auth.user_id, &req.name)?;
    Ok((StatusCode::CREATED, Json(RootResponse::from(&root))))
}

async fn list_roots(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Json<Vec<RootResponse>> {
    let ns = state.namespace.read().await;
    let roots = ns
        .ledger()
        .roots_of(&auth.user_id)
        .into_iter()
        .map(RootResponse::from)
        .collect();
    Json(roots)
}

/// Entries sorted by name so responses are stable.
async fn list_folder(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<ObjectId>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let ns = state.namespace.read().await;
    let mut entries: Vec<EntryResponse> = ns
        .list(id)?
        .into_iter()
        .map(|(name, entry)| EntryResponse::new(name, entry))
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(entries))
}

async fn create_file(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ObjectId>,
    Json(req): Json<FileRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let content = STANDARD
        .decode(req.content.as_bytes())
        .map_err(|e| ApiError::bad_request("invalid_content", e.to_string()))?;
    let mut ns = state.namespace.write().await;
    let file = ns.create_file(&auth.user_id, id, &req.name, content)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: file.id(),
            folder_id: id,
            name: req.name,
            entry_type: EntryType::File,
        }),
    ))
}

async fn create_folder(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ObjectId>,
    Json(req): Json<FolderRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let mut ns = state.namespace.write().await;
    let folder = ns.create_folder(&auth.user_id, id, &req.name)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: folder.id(),
            folder_id: id,
            name: req.name,
            entry_type: EntryType::Folder,
        }),
    ))
}

async fn create_link(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ObjectId>,
    Json(req): Json<LinkRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let mut ns = state.namespace.write().await;
    let link = ns.create_link(&auth.user_id, id, &req.name, req.target_id)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: link.id(),
            folder_id: id,
            name: req.name,
            entry_type: EntryType::Link,
        }),
    ))
}

async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, name)): Path<(ObjectId, String)>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let mut ns = state.namespace.write().await;
    match params.kind {
        EntryType::File => ns.delete_file(&auth.user_id, id, &name, params.object_id)?,
        EntryType::Folder => ns.delete_folder(&auth.user_id, id, &name, params.object_id)?,
        EntryType::Link => ns.delete_link(&auth.user_id, id, &name, params.object_id)?,
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn rename_entry(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, name)): Path<(ObjectId, String)>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let mut ns = state.namespace.write().await;
    let entry = ns.rename_entry(&auth.user_id, id, &name, &req.new_name)?;
    Ok(Json(EntryResponse::new(req.new_name, entry)))
}

async fn resolve_path(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<ObjectId>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<EntryResponse>, ApiError> {
    let ns = state.namespace.read().await;
    let entry = ns.resolve_path(id, &params.path)?;
    Ok(Json(EntryResponse::new(params.path, entry)))
}

async fn get_object(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<ObjectId>,
) -> Result<Json<ObjectResponse>, ApiError> {
    let ns = state.namespace.read().await;
    let record = ns
        .ledger()
        .get(id)
        .ok_or(NamespaceError::ObjectNotFound(id))?;
    Ok(Json(ObjectResponse::from(record)))
}

/// Committed events as server-sent events, one JSON object per message.
async fn event_stream(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|res| async move {
        match res {
            Ok(evt) => {
                let data = serde_json::to_string(&evt).ok()?;
                Some(Ok(sse::Event::default().data(data)))
            }
            Err(err) => {
                tracing::warn!("event subscriber lagged: {}", err);
                None
            }
        }
    });
    Sse::new(stream)
}
