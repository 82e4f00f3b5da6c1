//! The binary entry point for the social login service.

use std::sync::Arc;
use std::time::Duration;

use app_core::config::Config;
use app_core::middleware::request_response_logger;
use app_core::oauth::{HttpOAuthClient, OAuthClient, ProviderRegistry};
use auth::{SessionMemory, SessionRedis, SessionStore};
use axum::http::StatusCode;
use axum::{Json, Router, middleware};
use base64::Engine as _;
use base64::engine::general_purpose;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use tokio::signal;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_cookies::{CookieManagerLayer, Key};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_OAUTH_HTTP_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(fmt::format::FmtSpan::CLOSE),
        )
        .init();

    if let Err(err) = run().await {
        panic!("❌ Application failed to start: {err}");
    }
}

/// Initializes all dependencies and starts the web server.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::builder("config/config.yaml").build()?);

    // Missing provider credentials are fatal.
    let registry = Arc::new(ProviderRegistry::from_config(&config)?);

    let http_timeout = config.get_or("oauth.http_timeout_secs", DEFAULT_OAUTH_HTTP_TIMEOUT_SECS)?;
    let oauth: Arc<dyn OAuthClient> = Arc::new(HttpOAuthClient::new(Duration::from_secs(http_timeout))?);

    let session = build_session_store(&config).await?;
    let cookie_key = build_cookie_key(&config)?;

    // Initialize auth module
    let auth_state = auth::new(auth::Dependency { config: config.clone(), registry, oauth, session, cookie_key });

    // Create the Router and Middlewares
    let timeout_secs = Duration::from_secs(config.get::<u64>("server.timeout_secs")?);
    let app = Router::new()
        .merge(auth::create_router(auth_state))
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"message": "Endpoint not found"})),
            )
        })
        .method_not_allowed_fallback(|| async {
            (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(serde_json::json!({"message": "Method not allowed"})),
            )
        })
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_response_logger))
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
                .layer(TimeoutLayer::new(timeout_secs)),
        );

    let server_address = config.get::<String>("server.address")?;
    let listener = tokio::net::TcpListener::bind(&server_address).await?;

    tracing::info!("🚀 listening on {}", listener.local_addr()?);

    // Create a broadcast channel to signal shutdown to all application components.
    // Spawn a task to listen for shutdown signals (Ctrl+C and SIGTERM).
    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_shutdown_listener(shutdown_tx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_tx.subscribe().recv().await.ok();
            tracing::info!("🛑 Server is shutting down gracefully...");
        })
        .await?;

    Ok(())
}

/// Picks the session backend from `session.store`: `memory` (default) or
/// `redis`.
async fn build_session_store(config: &Config) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    let ttl = Duration::from_secs(config.get_or("session.ttl_secs", DEFAULT_SESSION_TTL_SECS)?);
    let store = config.get_or("session.store", "memory".to_string())?;

    match store.as_str() {
        "memory" => Ok(Arc::new(SessionMemory::new(ttl))),
        "redis" => {
            let rds_manager = RedisConnectionManager::new(config.get::<String>("redis.url")?)?;
            let rds_pool = Pool::builder()
                .max_size(config.get_or::<u32>("redis.max_connections", 10)?)
                .build(rds_manager)
                .await?;

            Ok(Arc::new(SessionRedis::new(rds_pool, ttl)))
        },
        other => Err(format!("unsupported session store: {other}").into()),
    }
}

/// Decodes the cookie encryption key from `session.secret` (base64, at least
/// 64 bytes). Without a secret a random key is used, so sessions do not
/// survive a restart.
fn build_cookie_key(config: &Config) -> Result<Key, Box<dyn std::error::Error>> {
    let Some(secret) = config.get_non_empty("session.secret") else {
        tracing::warn!("session.secret is not set, using a random cookie key");
        return Ok(Key::generate());
    };

    let bytes = general_purpose::STANDARD.decode(secret)?;

    Ok(Key::try_from(bytes.as_slice())?)
}

/// Spawns a background task to listen for system shutdown signals.
fn spawn_shutdown_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("🔻 Received SIGINT (Ctrl+C)")},
            _ = terminate => { tracing::info!("🔻 Received SIGTERM")},
        }

        if shutdown_tx.send(()).is_err() {
            tracing::error!("Failed to send shutdown signal");
        }
    });
}
