use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use mindcare_api::assistant::Assistant;
use mindcare_api::auth::{self, AppState, AppStateInner, Oauth};
use mindcare_api::booking;
use mindcare_api::chat;
use mindcare_api::counselors::CounselorDirectory;
use mindcare_api::forum;
use mindcare_api::mailer::Mailer;
use mindcare_api::middleware::{SESSION_COOKIE, require_session};
use mindcare_api::screening;
use mindcare_api::sessions::SessionStore;
use mindcare_gateway::connection;
use mindcare_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct ServerState {
    app: AppState,
    dispatcher: Dispatcher,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mindcare=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("MINDCARE_DB_PATH").unwrap_or_else(|_| "mindcare.db".into());
    let host = std::env::var("MINDCARE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MINDCARE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(mindcare_db::Database::open(&PathBuf::from(&db_path))?);

    // Chat is disabled outright without the generation API key
    let assistant = match std::env::var("GOOGLE_API_KEY") {
        Ok(key) if !key.is_empty() => Some(Assistant::new(key)),
        _ => {
            warn!("GOOGLE_API_KEY not set; chat endpoint disabled");
            None
        }
    };

    // Login is disabled without provider credentials
    let oauth = match (
        std::env::var("GOOGLE_CLIENT_ID"),
        std::env::var("GOOGLE_CLIENT_SECRET"),
    ) {
        (Ok(client_id), Ok(client_secret)) => {
            let redirect_url = std::env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/google/callback", port));
            Some(Oauth::new(client_id, client_secret, redirect_url)?)
        }
        _ => {
            warn!("Google OAuth credentials not set; login disabled");
            None
        }
    };

    // Mail degrades silently: bookings still succeed without it
    let mailer = Mailer::new(
        std::env::var("MAIL_USERNAME").ok(),
        std::env::var("MAIL_PASSWORD").ok(),
    );

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        sessions: SessionStore::new(),
        assistant,
        mailer,
        oauth,
        counselors: CounselorDirectory::bundled(),
    });

    let state = ServerState {
        app: app_state.clone(),
        dispatcher: dispatcher.clone(),
    };

    // Routes
    let public_routes = Router::new()
        .route("/", get(index))
        .route("/login", get(auth::login))
        .route("/google/callback", get(auth::google_callback))
        .route("/api/me", get(auth::me))
        .route("/chat", post(chat::chat))
        .route("/api/threads", get(forum::list_threads))
        .route("/api/thread/{id}", get(forum::get_thread))
        .route(
            "/api/availability/{counselor_id}/{date}",
            get(booking::availability),
        )
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/logout", get(auth::logout))
        .route("/api/screening", post(screening::save_screening))
        .route("/api/students", get(screening::list_students))
        .route(
            "/api/student-analytics/{user_id}",
            get(screening::student_analytics),
        )
        .route("/api/book", post(booking::book))
        .route("/api/bookings", get(booking::list_bookings))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ))
        .with_state(app_state);

    let ws_route = Router::new().route("/ws", get(ws_upgrade)).with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("MindCare server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Resolve the session before the upgrade so thread/reply commands know
    // their author; anonymous sockets can still join rooms and listen.
    let session = match jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<Uuid>().ok())
    {
        Some(session_id) => state.app.sessions.get(session_id).await,
        None => None,
    };

    let db = state.app.db.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, state.dispatcher, db, session))
}

/// Minimal landing page; the real client is served separately.
async fn index() -> Html<&'static str> {
    Html(
        "<!doctype html>\
         <html><head><title>MindCare</title></head>\
         <body><h1>MindCare</h1>\
         <p>Student mental-wellness API. See <code>/api/threads</code>, \
         <code>/api/me</code>, or connect to <code>/ws</code>.</p>\
         </body></html>",
    )
}
