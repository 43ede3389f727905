//! Document version lineage.
//!
//! CRITICAL: versions are append-only. A committed row is never updated or
//! deleted; every edit produces `current + 1`. The `sessions.current_version`
//! pointer moves in the same transaction as the insert, so exactly one
//! version is current at any instant and no partial version is ever visible.

use aws_sdk_s3::primitives::ByteStream;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{DocumentVersionRow, SectionSpan, VersionSummary};

/// Payload for committing a new document version.
pub struct NewVersion<'a> {
    pub content: &'a str,
    pub sections: &'a [SectionSpan],
    pub version_name: &'a str,
}

/// Commits a new version for the session and advances the current pointer.
///
/// The row insert and the pointer update share one transaction; the commit
/// is the turn's point of no return. The S3 snapshot upload afterwards is
/// best-effort: the database row is authoritative and a failed upload only
/// loses the downloadable artifact copy.
pub async fn append_version(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    session_id: Uuid,
    new: NewVersion<'_>,
) -> Result<DocumentVersionRow, AppError> {
    let mut tx = pool.begin().await?;

    let current: i32 =
        sqlx::query_scalar("SELECT current_version FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    let next = current + 1;
    let parent = (current > 0).then_some(current);
    let sections_json = sqlx::types::Json(new.sections.to_vec());

    let row: DocumentVersionRow = sqlx::query_as(
        r#"
        INSERT INTO resume_versions
            (session_id, version, content, sections, version_name, parent_version)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(next)
    .bind(new.content)
    .bind(sections_json)
    .bind(new.version_name)
    .bind(parent)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE sessions SET current_version = $1 WHERE id = $2")
        .bind(next)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        "Committed version {next} ({}) for session {session_id}",
        new.version_name
    );

    upload_snapshot(s3, s3_bucket, session_id, next, new.content).await;

    Ok(row)
}

/// Uploads a markdown snapshot of the version to S3. Best-effort.
async fn upload_snapshot(
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    session_id: Uuid,
    version: i32,
    content: &str,
) {
    let s3_key = format!("resumes/{session_id}/v{version}.md");
    let result = s3
        .put_object()
        .bucket(s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(content.as_bytes().to_vec()))
        .content_type("text/markdown")
        .send()
        .await;

    match result {
        Ok(_) => info!("Uploaded version snapshot to s3://{s3_bucket}/{s3_key}"),
        Err(e) => warn!("Snapshot upload failed for {s3_key}: {e}"),
    }
}

/// Returns the session's current version, or None before first upload.
pub async fn get_current_version(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Option<DocumentVersionRow>, AppError> {
    Ok(sqlx::query_as(
        r#"
        SELECT rv.*
        FROM resume_versions rv
        JOIN sessions s ON s.id = rv.session_id AND s.current_version = rv.version
        WHERE rv.session_id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?)
}

/// Returns a specific version of the session's document.
pub async fn get_version(
    pool: &PgPool,
    session_id: Uuid,
    version: i32,
) -> Result<Option<DocumentVersionRow>, AppError> {
    Ok(
        sqlx::query_as("SELECT * FROM resume_versions WHERE session_id = $1 AND version = $2")
            .bind(session_id)
            .bind(version)
            .fetch_optional(pool)
            .await?,
    )
}

/// Lists all versions for a session, oldest first, without content payloads.
pub async fn list_versions(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Vec<VersionSummary>, AppError> {
    Ok(sqlx::query_as(
        r#"
        SELECT session_id, version, version_name, parent_version, created_at
        FROM resume_versions
        WHERE session_id = $1
        ORDER BY version ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?)
}
