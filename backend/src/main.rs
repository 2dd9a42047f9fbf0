use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guildhall_backend::{
    config::Config, db::connection::create_pool, handlers, middleware as auth_middleware,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guildhall_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        gate_api_key = %mask_secret(&config.gate_api_key),
        time_zone = %config.time_zone,
        port = config.port,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState::new(pool, config);

    // Public routes: health probe and the badge-reader gate (the gate
    // authenticates with a device key, not a user token)
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/access/toggle", post(handlers::access::toggle_access));

    // Authenticated member routes
    let user_routes = Router::new()
        .route("/api/facilities", get(handlers::facilities::get_facilities))
        .route(
            "/api/facilities/{id}",
            get(handlers::facilities::get_facility),
        )
        .route(
            "/api/facilities/{id}/sessions",
            post(handlers::sessions::start_session),
        )
        .route(
            "/api/facilities/{id}/sessions/active",
            get(handlers::sessions::get_active_sessions),
        )
        .route(
            "/api/sessions/{id}/end",
            put(handlers::sessions::end_session),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth,
        ));

    // Staff routes: facility administration, history, audit log
    let staff_routes = Router::new()
        .route(
            "/api/admin/facilities",
            post(handlers::facilities::create_facility),
        )
        .route(
            "/api/admin/facilities/{id}",
            put(handlers::facilities::update_facility),
        )
        .route(
            "/api/admin/facilities/{id}/history",
            get(handlers::sessions::get_usage_history),
        )
        .route(
            "/api/admin/facilities/{id}/access-log",
            get(handlers::facilities::get_access_log),
        )
        .route(
            "/api/admin/users/{id}/credential",
            put(handlers::users::attach_credential),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth_staff,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(staff_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state.clone());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
