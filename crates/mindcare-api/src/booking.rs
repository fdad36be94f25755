use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;
use uuid::Uuid;

use mindcare_types::api::{BookingRecord, BookingRequest, BookingResponse};
use mindcare_types::models::SessionUser;

use crate::auth::AppState;
use crate::{parse_created_at, parse_row_uuid};

/// POST /api/book: validate, persist, then best-effort email. The slot is
/// never checked against existing bookings; availability is advisory only,
/// so two students can book the same counselor/date/time.
pub async fn book(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), StatusCode> {
    let Some(counselor) = state.counselors.get(req.counselor_id) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(BookingResponse {
                success: false,
                message: "Unknown counsellor.".into(),
            }),
        ));
    };

    if req.date.trim().is_empty() || req.time.trim().is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(BookingResponse {
                success: false,
                message: "Date and time are required.".into(),
            }),
        ));
    }

    let booking_id = Uuid::new_v4();
    let db = state.db.clone();
    let insert = {
        let (bid, date, time, name, email) = (
            booking_id.to_string(),
            req.date.clone(),
            req.time.clone(),
            user.name.clone(),
            user.email.clone(),
        );
        tokio::task::spawn_blocking(move || {
            db.insert_booking(&bid, req.counselor_id, &date, &time, &name, &email)
        })
        .await
    };

    match insert {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Booking insert failed: {}", e);
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BookingResponse {
                    success: false,
                    message: "Could not save your booking.".into(),
                }),
            ));
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    // The booking is already saved: mail failure only gets logged and the
    // response below is unaffected.
    state
        .mailer
        .send_booking_confirmation(&user.name, &user.email, &counselor.name, &req.date, &req.time)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            message: "Booking confirmed!".into(),
        }),
    ))
}

/// GET /api/availability/{counselor_id}/{date}: already-booked time strings,
/// sorted, duplicates preserved. Computing free slots is the client's job.
pub async fn availability(
    State(state): State<AppState>,
    Path((counselor_id, date)): Path<(i64, String)>,
) -> Result<Json<Vec<String>>, StatusCode> {
    let db = state.db.clone();
    let times = tokio::task::spawn_blocking(move || db.booked_times(counselor_id, &date))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Availability query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(times))
}

/// GET /api/bookings: all bookings by date then time, with counselor ids
/// resolved to display names through the fixed directory.
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(_user): Extension<SessionUser>,
) -> Result<Json<Vec<BookingRecord>>, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_bookings())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Booking list failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let records = rows
        .into_iter()
        .map(|row| {
            let counselor_name = state
                .counselors
                .name(row.counselor_id)
                .unwrap_or("Unknown")
                .to_string();

            BookingRecord {
                id: parse_row_uuid(&row.id, "booking"),
                counselor_id: row.counselor_id,
                counselor_name,
                date: row.date,
                time: row.time,
                requester_name: row.requester_name,
                requester_email: row.requester_email,
                created_at: parse_created_at(&row.created_at, "booking"),
            }
        })
        .collect();

    Ok(Json(records))
}
