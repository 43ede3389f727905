//! Session and conversation persistence.
//!
//! Sessions are created on first upload and never deleted in-process.
//! Messages are append-only; insertion order (the serial id) is the sole
//! ordering signal.

pub mod versioning;

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::{MessageRow, SessionRow};

/// Creates a new session with no committed document version yet.
pub async fn create_session(pool: &PgPool) -> Result<SessionRow> {
    let id = Uuid::new_v4();
    let session: SessionRow = sqlx::query_as(
        r#"
        INSERT INTO sessions (id, current_version)
        VALUES ($1, 0)
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(session)
}

pub async fn get_session(pool: &PgPool, session_id: Uuid) -> Result<Option<SessionRow>> {
    Ok(
        sqlx::query_as("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Appends one message to a session's history.
pub async fn add_message(pool: &PgPool, session_id: Uuid, role: &str, content: &str) -> Result<()> {
    sqlx::query("INSERT INTO messages (session_id, role, content) VALUES ($1, $2, $3)")
        .bind(session_id)
        .bind(role)
        .bind(content)
        .execute(pool)
        .await?;

    Ok(())
}

/// Full conversation history in chronological order.
pub async fn conversation_history(pool: &PgPool, session_id: Uuid) -> Result<Vec<MessageRow>> {
    Ok(sqlx::query_as(
        "SELECT * FROM messages WHERE session_id = $1 ORDER BY id ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?)
}

/// The last `limit` messages in chronological order. This is the bounded
/// window the router consults; older history is never loaded.
pub async fn recent_messages(
    pool: &PgPool,
    session_id: Uuid,
    limit: usize,
) -> Result<Vec<MessageRow>> {
    let mut messages: Vec<MessageRow> = sqlx::query_as(
        "SELECT * FROM messages WHERE session_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(session_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    messages.reverse();
    Ok(messages)
}
