use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use mindcare_db::models::{ReplyRow, ThreadRow};
use mindcare_types::api::{ReplyRecord, ThreadDetailResponse, ThreadSummary};

use crate::auth::AppState;
use crate::{parse_created_at, parse_row_uuid};

/// GET /api/threads: every thread, newest first, with derived reply counts.
/// No pagination, matching the client's single-list forum view.
pub async fn list_threads(
    State(state): State<AppState>,
) -> Result<Json<Vec<ThreadSummary>>, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_threads())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Thread list failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(rows.into_iter().map(thread_summary).collect()))
}

/// GET /api/thread/{id}: one thread plus its replies, oldest reply first.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let thread_id = id.clone();

    let (thread, replies) = tokio::task::spawn_blocking(move || {
        let Some(thread) = db.get_thread(&thread_id)? else {
            return Ok(None);
        };
        let replies = db.list_replies(&thread_id)?;
        Ok::<_, anyhow::Error>(Some((thread, replies)))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Thread fetch failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ThreadDetailResponse {
        thread: thread_summary(thread),
        replies: replies.into_iter().map(reply_record).collect(),
    }))
}

fn thread_summary(row: ThreadRow) -> ThreadSummary {
    ThreadSummary {
        id: parse_row_uuid(&row.id, "thread"),
        title: row.title,
        category: row.category,
        author_name: row.author_name,
        body: row.body,
        created_at: parse_created_at(&row.created_at, "thread"),
        reply_count: row.reply_count,
    }
}

fn reply_record(row: ReplyRow) -> ReplyRecord {
    ReplyRecord {
        id: parse_row_uuid(&row.id, "reply"),
        thread_id: parse_row_uuid(&row.thread_id, "reply"),
        author_name: row.author_name,
        body: row.body,
        created_at: parse_created_at(&row.created_at, "reply"),
    }
}
