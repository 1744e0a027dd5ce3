//! Biblioteca Server
//!
//! Library management backend with a real-time support ticket channel.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblioteca_server::{
    api,
    config::AppConfig,
    realtime::{self, RealtimeGateway},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("biblioteca_server={},tower_http=debug", config.logging.level).into()
    });

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Biblioteca Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository, realtime gateway and services
    let repository = Repository::new(pool);
    let gateway = RealtimeGateway::new();
    let services = Services::new(repository, gateway.clone(), config.auth.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        realtime: gateway,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Support tickets
        .route("/support/tickets", post(api::tickets::create_ticket))
        .route("/support/tickets/my", get(api::tickets::my_tickets))
        .route("/support/tickets", get(api::tickets::all_tickets))
        .route("/support/tickets/:id/messages", get(api::tickets::ticket_messages))
        .route("/support/tickets/:id/close", put(api::tickets::close_ticket))
        .route("/support/tickets/:id/status", put(api::tickets::update_ticket_status))
        .route("/support/tickets/:id/assign", put(api::tickets::assign_ticket))
        // Support agents
        .route("/support/agents", get(api::agents::list_agents))
        .route("/support/agents", post(api::agents::create_agent))
        .route("/support/agents/:user_id", delete(api::agents::delete_agent))
        .route("/support/agents/:user_id/status", put(api::agents::update_agent_status))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/:id/read", put(api::notifications::mark_notification_read))
        .route("/notifications/read-all", put(api::notifications::mark_all_notifications_read))
        .with_state(state.clone());

    // WebSocket endpoint
    let ws = Router::new()
        .route("/ws", get(realtime::handler::ws_handler))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(ws)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
