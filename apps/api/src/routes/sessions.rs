use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::docio;
use crate::errors::AppError;
use crate::models::document::{DocumentVersionRow, VersionSummary};
use crate::models::session::MessageRow;
use crate::orchestrator::{RoutingSummary, TurnOutcome};
use crate::sessions::{self, versioning};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionStartResponse {
    pub session_id: Uuid,
    pub file_name: String,
    pub word_count: usize,
    pub sections: Vec<String>,
    pub version: i32,
}

/// POST /api/v1/sessions
/// Multipart upload of a resume file; creates the session and version 1.
pub async fn handle_create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SessionStartResponse>, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("resume.txt").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            file = Some((name, data));
        }
    }

    let (name, data) = file
        .ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;

    // PDF extraction is CPU-bound; keep it off the async workers.
    let parsed = tokio::task::spawn_blocking(move || docio::parse_upload(&name, &data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Upload parsing task failed: {e}")))??;

    let sections = parsed.sections.iter().map(|s| s.label.clone()).collect();
    let started = state.orchestrator.start_session(parsed).await?;

    Ok(Json(SessionStartResponse {
        session_id: started.session_id,
        file_name: started.file_name,
        word_count: started.word_count,
        sections,
        version: started.version.version,
    }))
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub reply: String,
    pub resume_updated: bool,
    pub version: Option<i32>,
    pub version_name: Option<String>,
    pub routing: RoutingSummary,
}

impl From<TurnOutcome> for QueryResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            reply: outcome.reply,
            resume_updated: outcome.new_version.is_some(),
            version: outcome.new_version.as_ref().map(|v| v.version),
            version_name: outcome.new_version.map(|v| v.version_name),
            routing: outcome.routing,
        }
    }
}

/// POST /api/v1/sessions/:id/query
/// Runs one turn of the optimization pipeline. Turns within a session are
/// serialized; different sessions proceed concurrently.
pub async fn handle_query(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::Validation("Query must not be empty".to_string()));
    }

    let lock = state.session_locks.for_session(session_id);
    let _turn = lock.lock().await;

    let outcome = state.orchestrator.handle_query(session_id, &query).await?;
    Ok(Json(QueryResponse::from(outcome)))
}

/// GET /api/v1/sessions/:id/history
pub async fn handle_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<MessageRow>>, AppError> {
    require_session(&state, session_id).await?;
    let history = sessions::conversation_history(&state.db, session_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(history))
}

/// GET /api/v1/sessions/:id/versions
pub async fn handle_list_versions(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<VersionSummary>>, AppError> {
    require_session(&state, session_id).await?;
    Ok(Json(versioning::list_versions(&state.db, session_id).await?))
}

/// GET /api/v1/sessions/:id/versions/:v
pub async fn handle_get_version(
    State(state): State<AppState>,
    Path((session_id, version)): Path<(Uuid, i32)>,
) -> Result<Json<DocumentVersionRow>, AppError> {
    versioning::get_version(&state.db, session_id, version)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Version {version} not found")))
}

#[derive(Deserialize)]
pub struct RevertRequest {
    pub version: i32,
}

#[derive(Serialize)]
pub struct RevertResponse {
    pub version: i32,
    pub version_name: String,
}

/// POST /api/v1/sessions/:id/revert
/// Commits a new version copying the target's content; never rewrites lineage.
pub async fn handle_revert(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RevertRequest>,
) -> Result<Json<RevertResponse>, AppError> {
    let lock = state.session_locks.for_session(session_id);
    let _turn = lock.lock().await;

    let (new_version, _delta) = state
        .orchestrator
        .revert_to_version(session_id, request.version)
        .await?;

    Ok(Json(RevertResponse {
        version: new_version.version,
        version_name: new_version.version_name,
    }))
}

/// GET /api/v1/sessions/:id/download
/// The current version as a downloadable markdown attachment.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let current = versioning::get_current_version(&state.db, session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No resume uploaded for this session yet".to_string())
        })?;

    let disposition = format!(
        "attachment; filename=\"resume_v{}.md\"",
        current.version
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        current.content,
    )
        .into_response())
}

async fn require_session(state: &AppState, session_id: Uuid) -> Result<(), AppError> {
    sessions::get_session(&state.db, session_id)
        .await
        .map_err(AppError::Internal)?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}
