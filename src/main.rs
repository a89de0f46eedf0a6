use chat_service::{
    config::Config,
    db, error, logging, migrations, routes,
    state::AppState,
    store::{ConversationStore, MemoryStore, PgStore},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let store: Arc<dyn ConversationStore> = match cfg.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url)
                .await
                .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
            migrations::run_all(&pool)
                .await
                .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (messages will not survive a restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, cfg.clone());
    let app = routes::router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(format!("bind {bind_addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(format!("serve: {e}")))?;

    Ok(())
}
