use chat_delivery_service::{
    config, engine::DeliveryEngine, error, logging, presence::PresenceTable, routes,
    state::AppState, store,
};
use std::sync::Arc;
use store::MessageStore;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let message_store: Arc<dyn MessageStore> = match cfg.database_url.as_deref() {
        Some(url) => {
            tracing::info!("using postgres message store");
            Arc::new(store::PgMessageStore::connect(url).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory message store");
            Arc::new(store::InMemoryMessageStore::new())
        }
    };

    let engine = DeliveryEngine::new(message_store, PresenceTable::new());
    let state = AppState {
        engine,
        config: cfg.clone(),
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-delivery-service");

    let app = routes::build_router().with_state(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
