//! Request/response types and handlers for the ten non-streaming RPC
//! procedures (`thread.stream` is served over WebSocket, see
//! [`super::ws`]). One struct pair per procedure, `camelCase` on the wire.

use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    memory::{Model, SortBy, WhereClause, model::{Message, Thread, Visibility}},
    sandbox::{FsEntry, LocalSandbox, SandboxAdapter},
};

use super::{error::ApiError, state::GatewayState};

/// Requests carry identity via `X-User-Id`; the teacher's daemon auth is a
/// single local bearer token with no user registry, so a host embedding this
/// runtime supplies its own user id on top of that token. Falls back to
/// `"local"` for single-user deployments.
pub(super) fn user_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("local")
        .to_string()
}

// ─── thread.list ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListRequest {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListResponse {
    pub threads: Vec<Thread>,
    pub page_info: PageInfo,
}

pub async fn thread_list(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<ThreadListRequest>,
) -> Result<Json<ThreadListResponse>, ApiError> {
    let page = req.page.unwrap_or(1).max(1);
    let page_size = req.page_size.unwrap_or(20).clamp(1, 200);
    let uid = user_id(&headers);
    let where_ = [WhereClause::eq("userId", json!(uid))];

    let total = state.memory.count(Model::Thread, &where_).await?;
    let rows = state
        .memory
        .find_many(
            Model::Thread,
            &where_,
            Some(SortBy { field: "updatedAt".to_string(), descending: true }),
            Some(page_size),
            Some((page - 1) * page_size),
        )
        .await?;

    let threads = rows
        .into_iter()
        .filter_map(|v| serde_json::from_value::<Thread>(v).ok())
        .collect::<Vec<_>>();

    Ok(Json(ThreadListResponse {
        threads,
        page_info: PageInfo { page, page_size, total, has_more: page * page_size < total },
    }))
}

// ─── thread.create ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCreateRequest {
    pub title: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCreateResponse {
    pub thread_id: String,
    pub thread: Thread,
}

pub async fn thread_create(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<ThreadCreateRequest>,
) -> Result<Json<ThreadCreateResponse>, ApiError> {
    let mut thread = Thread::new(crate::memory::generate_id(), user_id(&headers));
    if let Some(title) = req.title {
        thread.title = title;
    }
    if let Some(visibility) = req.visibility {
        thread.visibility = visibility;
    }

    let created = state.memory.create(Model::Thread, serde_json::to_value(&thread)?).await?;
    let thread: Thread = serde_json::from_value(created)?;

    Ok(Json(ThreadCreateResponse { thread_id: thread.id.clone(), thread }))
}

// ─── thread.get ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadGetRequest {
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadGetResponse {
    pub thread: Thread,
}

pub async fn thread_get(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<ThreadGetRequest>,
) -> Result<Json<ThreadGetResponse>, ApiError> {
    let thread = load_thread(&state, &req.thread_id).await?;
    authorize(&thread, &user_id(&headers))?;
    Ok(Json(ThreadGetResponse { thread }))
}

// ─── thread.update ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadUpdateData {
    pub title: Option<String>,
    pub visibility: Option<Visibility>,
    pub last_context: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadUpdateRequest {
    pub thread_id: String,
    pub data: ThreadUpdateData,
}

#[derive(Debug, Serialize)]
pub struct ThreadUpdateResponse {
    pub thread: Thread,
}

pub async fn thread_update(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<ThreadUpdateRequest>,
) -> Result<Json<ThreadUpdateResponse>, ApiError> {
    let mut thread = load_thread(&state, &req.thread_id).await?;
    authorize(&thread, &user_id(&headers))?;

    if let Some(title) = req.data.title {
        thread.title = title;
    }
    if let Some(visibility) = req.data.visibility {
        thread.visibility = visibility;
    }
    if let Some(last_context) = req.data.last_context {
        thread.last_context = Some(last_context);
    }
    thread.updated_at = chrono::Utc::now();

    let updated = state
        .memory
        .update(
            Model::Thread,
            &[WhereClause::eq("id", json!(thread.id))],
            serde_json::to_value(&thread)?,
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ThreadUpdateResponse { thread: serde_json::from_value(updated)? }))
}

// ─── thread.delete ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDeleteRequest {
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadDeleteResponse {
    pub success: bool,
}

/// Deletes the thread and cascades to its messages and todo list.
pub async fn thread_delete(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<ThreadDeleteRequest>,
) -> Result<Json<ThreadDeleteResponse>, ApiError> {
    let thread = load_thread(&state, &req.thread_id).await?;
    authorize(&thread, &user_id(&headers))?;

    state
        .memory
        .delete_many(Model::Message, &[WhereClause::eq("threadId", json!(thread.id))])
        .await?;
    state
        .memory
        .delete_many(Model::Todo, &[WhereClause::eq("threadId", json!(thread.id))])
        .await?;
    state
        .memory
        .delete(Model::Thread, &[WhereClause::eq("id", json!(thread.id))])
        .await?;

    Ok(Json(ThreadDeleteResponse { success: true }))
}

// ─── thread.loadMessages / message.get ───────────────────────────────────────
//
// Identical contract (`{threadId} -> UIMessage[]`); the spec lists them as
// two procedure names for the same read, so both handlers share one body.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMessagesRequest {
    pub thread_id: String,
}

pub async fn thread_load_messages(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<LoadMessagesRequest>,
) -> Result<Json<Vec<Message>>, ApiError> {
    message_get(State(state), headers, Json(req)).await
}

pub async fn message_get(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<LoadMessagesRequest>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let thread = load_thread(&state, &req.thread_id).await?;
    authorize(&thread, &user_id(&headers))?;

    let rows = state
        .memory
        .find_many(
            Model::Message,
            &[WhereClause::eq("threadId", json!(thread.id))],
            Some(SortBy { field: "createdAt".to_string(), descending: false }),
            None,
            None,
        )
        .await?;

    let messages = rows
        .into_iter()
        .filter_map(|v| serde_json::from_value::<Message>(v).ok())
        .collect();

    Ok(Json(messages))
}

// ─── blob.upload ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobFileInput {
    pub name: String,
    /// Base64-encoded file content.
    pub data: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobUploadRequest {
    pub files: Vec<BlobFileInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub url: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobUploadResponse {
    pub success: bool,
    pub files: Vec<UploadedFile>,
}

pub async fn blob_upload(
    State(state): State<GatewayState>,
    Json(req): Json<BlobUploadRequest>,
) -> Result<Json<BlobUploadResponse>, ApiError> {
    use base64::Engine;

    let blob = &state.config.runtime.blob;
    if req.files.len() > blob.max_files as usize {
        return Err(ApiError::Internal(format!(
            "too many files: {} exceeds max_files={}",
            req.files.len(),
            blob.max_files
        )));
    }

    let mut files = Vec::with_capacity(req.files.len());
    for f in req.files {
        if !blob.allowed_mime_types.is_empty() && !blob.allowed_mime_types.iter().any(|m| m == &f.mime_type) {
            return Err(ApiError::Internal(format!("mime type not allowed: {}", f.mime_type)));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&f.data)
            .map_err(|e| ApiError::Internal(format!("invalid base64 for {}: {e}", f.name)))?;
        if bytes.len() as u64 > blob.max_file_size {
            return Err(ApiError::Internal(format!(
                "{} exceeds max_file_size={} bytes",
                f.name, blob.max_file_size
            )));
        }
        files.push(UploadedFile { name: f.name, url: String::new(), size: bytes.len() });
    }

    Ok(Json(BlobUploadResponse { success: true, files }))
}

// ─── config.get ───────────────────────────────────────────────────────────────

pub async fn config_get(State(state): State<GatewayState>) -> Json<crate::config::AppConfig> {
    Json((*state.config).clone())
}

// ─── sandbox.list ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxListRequest {
    /// Not in the spec's literal `{path?, recursive?, ignore?}` input, but
    /// a sandbox file tree is always scoped to the thread that owns the
    /// lease; see DESIGN.md for this Open Question's resolution.
    pub thread_id: String,
    pub path: Option<String>,
    pub recursive: Option<bool>,
    pub ignore: Option<Vec<String>>,
}

pub async fn sandbox_list(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<SandboxListRequest>,
) -> Result<Json<Vec<FsEntry>>, ApiError> {
    let thread = load_thread(&state, &req.thread_id).await?;
    authorize(&thread, &user_id(&headers))?;

    let Some(sandbox_id) = thread.sandbox_id else {
        return Ok(Json(Vec::new()));
    };

    let sandbox = LocalSandbox::new(state.workspace_root.join(&sandbox_id));
    let entries = sandbox
        .readdir(
            req.path.as_deref().unwrap_or("."),
            req.recursive.unwrap_or(false),
            &req.ignore.unwrap_or_default(),
        )
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(entries))
}

// ─── shared helpers ───────────────────────────────────────────────────────────

async fn load_thread(state: &GatewayState, thread_id: &str) -> Result<Thread, ApiError> {
    let row = state
        .memory
        .find_one(Model::Thread, &[WhereClause::eq("id", json!(thread_id))])
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(serde_json::from_value(row)?)
}

fn authorize(thread: &Thread, uid: &str) -> Result<(), ApiError> {
    if thread.visibility == Visibility::Private && thread.user_id != uid {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
