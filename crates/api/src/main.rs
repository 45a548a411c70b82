use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keyturn_api::auth::hasher::CredentialHasher;
use keyturn_api::auth::jwt::Signer;
use keyturn_api::auth::service::TokenService;
use keyturn_api::config::{ServerConfig, StoreKind};
use keyturn_api::router::build_app_router;
use keyturn_api::state::AppState;
use keyturn_db::{MemorySessionStore, PgSessionStore, SessionBackend};
use keyturn_events::{AlertDispatcher, EmailDelivery, LogNotifier, Notifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keyturn_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Session store ---
    let store = match &config.store {
        StoreKind::Postgres { database_url } => {
            let pool = keyturn_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            keyturn_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            keyturn_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            SessionBackend::Postgres(PgSessionStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory session store, sessions will not survive a restart");
            SessionBackend::Memory(MemorySessionStore::new())
        }
    };

    // --- Signer ---
    let signer = Signer::new(config.jwt.access_ttl, &config.jwt.secret)
        .expect("Invalid access token signing configuration");
    tracing::info!(ttl_secs = signer.ttl().as_secs(), "Access token signer ready");

    // --- Alerts ---
    let notifier: Arc<dyn Notifier> = match config.email.clone() {
        Some(email) => Arc::new(EmailDelivery::new(email).expect("Invalid SMTP configuration")),
        None => {
            tracing::info!("SMTP not configured, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let (alerts, alerts_handle) = AlertDispatcher::spawn(notifier);

    // --- App state ---
    let tokens = TokenService::new(
        Arc::new(signer),
        CredentialHasher::default(),
        store,
        alerts,
        config.alert_destination.clone(),
    );
    let state = AppState {
        tokens: Arc::new(tokens),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    // The router (and with it the last dispatcher clone) is gone once serve
    // returns, so the delivery task exits after draining the queue.
    tracing::info!("Server stopped accepting connections, draining alert queue");
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, alerts_handle).await.is_err() {
        tracing::warn!("Alert queue did not drain before the shutdown timeout");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
