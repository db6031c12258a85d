mod clients;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod ws;

use axum::http::HeaderValue;
use axum::Router;
use config::Config;
use docs::ApiDoc;
use routes::{create_api_routes, create_ws_routes};
use services::llm_service::LlmService;
use std::panic;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use ws::hub::RealtimeHub;

/// Shared state handed to handlers and the realtime layer
pub struct AppState {
    pub hub: Arc<RealtimeHub>,
    pub llm: LlmService,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "curricula_api=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let app_config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::init_config(app_config.clone());

    // Initialize database connection if URL is provided
    if let Some(db_url) = &app_config.db_url {
        match db::dbcurricula::init_db(db_url).await {
            Ok(_) => info!("Database initialized successfully"),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Curriculum persistence will not be available");
            }
        }
    } else {
        warn!("No database URL configured - curriculum persistence will not be available");
    }

    if app_config.supabase_jwt_secret.is_none() {
        warn!("No JWT secret configured - authenticated requests will be rejected");
    }
    if app_config.anthropic_api_key.is_none() {
        warn!("No LLM provider API key configured - AI endpoints will fail");
    }

    // Assemble shared state: one hub and one provider client per process
    let provider = clients::anthropic::AnthropicClient::from_config(&app_config);
    let state = Arc::new(AppState {
        hub: Arc::new(RealtimeHub::new()),
        llm: LlmService::new(Arc::new(provider)),
    });

    // CORS: explicit origin list when configured, permissive in development
    let cors = match &app_config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Mount the realtime endpoint
        .merge(create_ws_routes(state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start the HTTP server
    let listener = tokio::net::TcpListener::bind(app_config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", app_config.server_address()));

    info!("Server running on http://{}", app_config.server_address());
    info!(
        "Realtime endpoint available at ws://{}/ws",
        app_config.server_address()
    );
    info!(
        "Swagger UI available at http://{}/swagger",
        app_config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
