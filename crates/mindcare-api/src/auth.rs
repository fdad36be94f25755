use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
    reqwest::async_http_client,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use mindcare_db::Database;
use mindcare_types::api::{MeResponse, SessionProfile};
use mindcare_types::models::SessionUser;

use crate::assistant::Assistant;
use crate::counselors::CounselorDirectory;
use crate::mailer::Mailer;
use crate::middleware::SESSION_COOKIE;
use crate::sessions::SessionStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: SessionStore,
    pub assistant: Option<Assistant>,
    pub mailer: Mailer,
    pub oauth: Option<Oauth>,
    pub counselors: CounselorDirectory,
}

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google OAuth client. Identity is delegated entirely to the provider; the
/// local users table only mirrors the verified profile.
pub struct Oauth {
    client: BasicClient,
    http: reqwest::Client,
}

impl Oauth {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> anyhow::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())?,
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_url)?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
        })
    }
}

/// Profile fields returned by the provider's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// GET /login: redirect to the identity provider.
pub async fn login(State(state): State<AppState>) -> Result<Redirect, StatusCode> {
    let Some(oauth) = &state.oauth else {
        error!("Login requested but OAuth credentials are not configured");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_token) = oauth
        .client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("https://www.googleapis.com/auth/userinfo.email".to_string()))
        .add_scope(Scope::new("https://www.googleapis.com/auth/userinfo.profile".to_string()))
        .set_pkce_challenge(pkce_challenge)
        .url();

    state
        .sessions
        .begin_login(csrf_token.secret().clone(), pkce_verifier.secret().clone())
        .await;

    Ok(Redirect::to(auth_url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /google/callback: finish the provider roundtrip. Verifies the CSRF
/// state, exchanges the code, fetches the profile, upserts the local user
/// row, opens a session and bounces back to the landing page.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), StatusCode> {
    let Some(oauth) = &state.oauth else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let (Some(code), Some(csrf_state)) = (query.code, query.state) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    // Unknown or replayed state: reject before touching the provider
    let Some(pkce_verifier) = state.sessions.take_login(&csrf_state).await else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let token = oauth
        .client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(async_http_client)
        .await
        .map_err(|e| {
            error!("OAuth code exchange failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let profile: GoogleUserInfo = oauth
        .http
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(token.access_token().secret())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            error!("Userinfo fetch failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .json()
        .await
        .map_err(|e| {
            error!("Userinfo decode failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    // First callback for this sub inserts the row; later callbacks reuse it
    let candidate_id = Uuid::new_v4();
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.upsert_user_by_sub(
            &candidate_id.to_string(),
            &profile.id,
            profile.name.as_deref().unwrap_or_default(),
            &profile.email,
            profile.picture.as_deref(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("User upsert failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let user = SessionUser {
        id: crate::parse_row_uuid(&row.id, "user"),
        name: row.name,
        email: row.email,
        avatar_url: row.avatar_url,
    };
    info!("{} logged in", user.email);

    let session_id = state.sessions.create(user).await;

    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to("/")))
}

/// GET /logout: destroy the session and clear the cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(session_id) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<Uuid>().ok())
    {
        state.sessions.destroy(session_id).await;
    }

    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");

    (jar.remove(removal), Redirect::to("/"))
}

/// GET /api/me: who is logged in, if anyone. Never fails.
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Json<MeResponse> {
    let user = match jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<Uuid>().ok())
    {
        Some(session_id) => state.sessions.get(session_id).await,
        None => None,
    };

    Json(MeResponse {
        is_logged_in: user.is_some(),
        user: user.map(|u| SessionProfile {
            id: u.id,
            name: u.name,
            email: u.email,
            avatar_url: u.avatar_url,
        }),
    })
}
