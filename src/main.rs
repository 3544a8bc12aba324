use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

mod auth;
mod config;
mod middleware;
mod observability;
mod routes;
mod sparka;

/// Shared application state available to all route handlers.
///
/// Cloning is cheap; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<config::BridgeConfig>,

    /// Sparka session validation client.
    pub sparka: Arc<sparka::SparkaClient>,

    /// Bridge session store.
    pub sessions: auth::SharedSessionStore,

    /// Credential sign-in backend used by the SSO completion endpoint.
    pub signin: Arc<dyn auth::CredentialSignIn>,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: config::BridgeConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = config
            .server
            .http_client
            .build_client()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        let sparka = Arc::new(sparka::SparkaClient::new(
            http_client,
            config.sparka.clone(),
        ));

        let sessions: auth::SharedSessionStore = Arc::new(auth::MemorySessionStore::new());

        let signin: Arc<dyn auth::CredentialSignIn> = Arc::new(auth::SparkaSignIn::new(
            sparka.clone(),
            sessions.clone(),
            config.auth.session.duration_secs,
        ));

        Ok(Self {
            config: Arc::new(config),
            sparka,
            sessions,
            signin,
        })
    }
}

/// Build the application router with all routes and middleware.
pub fn build_app(config: &config::BridgeConfig, state: AppState) -> Router {
    let mut app = Router::new()
        // Health endpoints
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        // Sparka SSO flow
        .route(
            "/api/auth/sparka/callback",
            get(routes::auth::sparka_callback),
        )
        .route("/auth/sso/sparka", get(routes::auth::sso_complete))
        // Bridge session introspection and teardown
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/logout", post(routes::auth::logout));

    app = app
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(tower_cookies::CookieManagerLayer::new());

    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .with_state(state)
}

#[derive(Parser, Debug)]
#[command(version, about = "Sparka SSO bridge", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

/// Config file consulted when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "sparka-bridge.toml";

fn load_config(explicit_path: Option<&str>) -> Result<config::BridgeConfig, config::ConfigError> {
    if let Some(path) = explicit_path {
        return config::BridgeConfig::from_file(path);
    }
    if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
        return config::BridgeConfig::from_file(DEFAULT_CONFIG_PATH);
    }
    config::BridgeConfig::from_env()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    run_server(args.config.as_deref()).await;
}

async fn run_server(explicit_config_path: Option<&str>) {
    let config = match load_config(explicit_config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    observability::init_tracing(&config.observability);

    tracing::info!(
        webapp_url = %config.sparka.webapp_url,
        login_url = %config.sparka.login_url,
        "Starting Sparka SSO bridge"
    );

    // Emit startup warnings for configurations that will surprise in production
    if !config.sparka.enabled {
        tracing::warn!(
            "Sparka SSO is disabled. The callback and completion endpoints will return 404 \
             until sparka.enabled = true (or SPARKA_SSO_ENABLED=true) is set."
        );
    }
    if !config.auth.session.secure {
        tracing::warn!(
            "Session cookies are configured with secure = false and will be sent over plain \
             HTTP. Only use this for local development."
        );
    }

    let state = AppState::new(config.clone()).expect("Failed to initialize application state");

    // Sweep expired bridge sessions in the background
    {
        let sessions = state.sessions.clone();
        let interval = config.auth.session.sweep_interval();
        tokio::spawn(async move {
            auth::start_session_sweeper(sessions, interval).await;
        });
    }

    let app = build_app(&config, state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
