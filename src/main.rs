mod config;
mod db;
mod diagram;
mod error;
mod flowchart;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::persistence::{self, KvStore, MemoryKvStore, PgKvStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let store: Arc<dyn KvStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgKvStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; diagram will not survive a restart");
            Arc::new(MemoryKvStore::new())
        }
    };
    let diagram = persistence::load_diagram(store.as_ref()).await;

    // Initialize LLM client (non-fatal: flowchart generation disabled if config missing).
    let llm: Option<Arc<dyn llm::LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; flowchart generation disabled");
            None
        }
    };

    let (save_tx, _save_worker) = persistence::spawn_save_worker(store, config.save_queue_capacity);
    let state = state::AppState::new(diagram, llm, config.layout)
        .with_save_tx(save_tx)
        .with_max_tokens(config.flowchart_max_tokens);

    let app = routes::app(state, &config.static_dir);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "flowsketch listening");
    axum::serve(listener, app).await.expect("server failed");
}
