use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::auth::AppState;

pub const SESSION_COOKIE: &str = "mindcare_session";

/// Resolve the session cookie and inject the logged-in user as a request
/// extension. Unauthenticated calls to protected endpoints get 401.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id: Uuid = jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user = state
        .sessions
        .get(session_id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
