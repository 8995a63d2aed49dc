use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use schoolhub_api::config::ServerConfig;
use schoolhub_api::notifications::AttendanceNotificationRouter;
use schoolhub_api::router::build_app_router;
use schoolhub_api::state::AppState;
use schoolhub_core::crypto::EncodingCipher;
use schoolhub_events::{EmailConfig, EmailDelivery, EventBus};
use schoolhub_facematch::FaceMatchClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schoolhub_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        face_service = %config.face_service.base_url,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = schoolhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    schoolhub_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    schoolhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Face service and encoding cipher ---
    let face_client = FaceMatchClient::new(config.face_service.clone())
        .expect("Failed to build face service client");
    if !face_client.health().await {
        tracing::warn!(url = %face_client.base_url(), "Face service is not reachable at startup");
    }
    let cipher = EncodingCipher::from_secret(&config.face_encoding_key)
        .expect("Failed to derive face encoding key");

    tokio::fs::create_dir_all(config.temp_upload_dir())
        .await
        .expect("Failed to create temporary upload directory");
    tokio::fs::create_dir_all(config.reference_photo_dir())
        .await
        .expect("Failed to create reference photo directory");

    // --- Event bus and notification router ---
    let event_bus = Arc::new(EventBus::default());

    let email = EmailConfig::from_env().map(|c| Arc::new(EmailDelivery::new(c)));
    if email.is_none() {
        tracing::info!("SMTP_HOST not set, parent emails disabled");
    }
    let notification_router = AttendanceNotificationRouter::new(pool.clone(), email);
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        face_client: Arc::new(face_client),
        cipher: Arc::new(cipher),
        event_bus: Arc::clone(&event_bus),
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped accepting connections, cleaning up");

    // The router stops once the last sender is gone. The app state holding
    // the other clone was dropped with the server.
    drop(event_bus);
    if tokio::time::timeout(Duration::from_secs(5), router_handle)
        .await
        .is_err()
    {
        tracing::warn!("Notification router did not stop within 5s");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
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
