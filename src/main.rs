use axum::http::HeaderValue;
use chat_relay_service::{
    config::Config,
    db, error, logging, routes,
    services::{chat_store::ChatStore, pg_store::PgChatStore},
    state::AppState,
    websocket::RelayRegistry,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Embedded migrations, idempotent; schema drift is fatal
    db::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::new(pool));
    let registry = RelayRegistry::new();

    let state = AppState {
        store,
        registry,
        config: cfg.clone(),
    };

    let cors = match cfg.cors_allowed_origin.as_deref() {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .map_err(|_| error::AppError::Config("CORS_ALLOWED_ORIGIN invalid".into()))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = routes::router(state).layer(cors);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-relay-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
