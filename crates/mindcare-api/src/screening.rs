use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;
use uuid::Uuid;

use mindcare_types::api::{ScreeningRecord, ScreeningRequest, ScreeningResponse, StudentSummary};
use mindcare_types::models::SessionUser;

use crate::auth::AppState;
use crate::{parse_created_at, parse_row_uuid};

/// POST /api/screening: append one self-report score for the session user.
/// Results are append-only; there is no edit or delete.
pub async fn save_screening(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Json(req): Json<ScreeningRequest>,
) -> Result<(StatusCode, Json<ScreeningResponse>), StatusCode> {
    let db = state.db.clone();
    let screening_id = Uuid::new_v4();
    let user_id = user.id.to_string();

    tokio::task::spawn_blocking(move || {
        db.insert_screening(&screening_id.to_string(), &user_id, &req.test_type, req.score)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Screening insert failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((StatusCode::CREATED, Json(ScreeningResponse { success: true })))
}

/// GET /api/students: roster of every user with at least one screening
/// record. Any logged-in user can read it; there is no counselor role.
pub async fn list_students(
    State(state): State<AppState>,
    Extension(_user): Extension<SessionUser>,
) -> Result<Json<Vec<StudentSummary>>, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.students_with_screenings())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Student roster failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let students = rows
        .into_iter()
        .map(|(id, name)| StudentSummary {
            id: parse_row_uuid(&id, "student"),
            name,
        })
        .collect();

    Ok(Json(students))
}

/// GET /api/student-analytics/{user_id}: one user's screening history,
/// oldest first. 404 for an id no user owns.
pub async fn student_analytics(
    State(state): State<AppState>,
    Extension(_user): Extension<SessionUser>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ScreeningRecord>>, StatusCode> {
    let db = state.db.clone();
    let lookup_id = user_id.clone();

    let rows = tokio::task::spawn_blocking(move || {
        if db.get_user_by_id(&lookup_id)?.is_none() {
            return Ok(None);
        }
        db.screenings_for_user(&lookup_id).map(Some)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Screening history failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .ok_or(StatusCode::NOT_FOUND)?;

    let records = rows
        .into_iter()
        .map(|row| ScreeningRecord {
            test_type: row.test_type,
            score: row.score,
            created_at: parse_created_at(&row.created_at, "screening"),
        })
        .collect();

    Ok(Json(records))
}
