//! Persistence service: load the saved diagram and write it back in the
//! background.
//!
//! DESIGN
//! ======
//! The diagram is stored as two JSON blobs, one under `"nodes"` and one
//! under `"edges"`, behind the [`KvStore`] seam (Postgres or memory).
//! Handlers never wait on storage: after each mutation they push a snapshot
//! onto a bounded queue with `try_send` while still holding the diagram
//! lock, so snapshots arrive in mutation order. A single worker drains the
//! queue, keeps only the newest snapshot, and writes it.
//!
//! ERROR HANDLING
//! ==============
//! Missing or unreadable blobs load as empty collections. Failed writes are
//! retried briefly and then logged; the in-memory diagram stays
//! authoritative and the next mutation saves again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::diagram::{Diagram, Edge, Node};
use crate::state::AppState;

pub const NODES_KEY: &str = "nodes";
pub const EDGES_KEY: &str = "edges";

const SAVE_RETRIES: usize = 3;
const SAVE_RETRY_BASE_MS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl crate::error::ErrorCode for PersistenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::Serialize(_) => "E_SERIALIZE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

// =============================================================================
// KV STORE
// =============================================================================

/// String key-value storage for the diagram blobs.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// `diagram_store` table, one row per key.
pub struct PgKvStore {
    pool: PgPool,
}

impl PgKvStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KvStore for PgKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM diagram_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            r"INSERT INTO diagram_store (key, value, updated_at) VALUES ($1, $2, now())
               ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// =============================================================================
// LOAD / SAVE
// =============================================================================

/// Load the saved diagram. Never fails: anything unreadable becomes empty,
/// and edges whose endpoints didn't survive are dropped.
pub async fn load_diagram(store: &dyn KvStore) -> Diagram {
    let nodes: Vec<Node> = load_blob(store, NODES_KEY).await;
    let edges: Vec<Edge> = load_blob(store, EDGES_KEY).await;

    let names: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let before = edges.len();
    let edges: Vec<Edge> = edges
        .into_iter()
        .filter(|e| names.contains(e.source.as_str()) && names.contains(e.target.as_str()))
        .collect();
    if edges.len() != before {
        warn!(dropped = before - edges.len(), "dropped saved edges with missing endpoints");
    }

    info!(nodes = nodes.len(), edges = edges.len(), "diagram loaded");
    Diagram::new(nodes, edges)
}

async fn load_blob<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Vec<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, key, "diagram blob read failed; starting empty");
            return Vec::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, key, "diagram blob unreadable; starting empty");
        Vec::new()
    })
}

/// Write both blobs.
///
/// # Errors
///
/// Returns the first serialization or storage failure.
pub async fn save_diagram(store: &dyn KvStore, diagram: &Diagram) -> Result<(), PersistenceError> {
    let nodes = serde_json::to_string(&diagram.nodes)?;
    let edges = serde_json::to_string(&diagram.edges)?;
    store.put(NODES_KEY, &nodes).await?;
    store.put(EDGES_KEY, &edges).await?;
    Ok(())
}

// =============================================================================
// SAVE WORKER
// =============================================================================

/// Spawn the single writer. Returns the queue sender and the worker handle;
/// the worker exits after every sender is dropped and the queue is drained.
#[must_use]
pub fn spawn_save_worker(store: Arc<dyn KvStore>, capacity: usize) -> (mpsc::Sender<Diagram>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Diagram>(capacity.max(1));
    info!(queue_capacity = capacity, "diagram save worker configured");

    let handle = tokio::spawn(async move {
        while let Some(mut latest) = rx.recv().await {
            // Only the newest snapshot matters.
            let mut skipped = 0usize;
            while let Ok(next) = rx.try_recv() {
                latest = next;
                skipped += 1;
            }
            save_with_retry(store.as_ref(), &latest, skipped).await;
        }
    });

    (tx, handle)
}

async fn save_with_retry(store: &dyn KvStore, diagram: &Diagram, skipped: usize) {
    for attempt in 1..=SAVE_RETRIES {
        match save_diagram(store, diagram).await {
            Ok(()) => {
                tracing::debug!(nodes = diagram.nodes.len(), edges = diagram.edges.len(), skipped, "diagram saved");
                return;
            }
            Err(e) if attempt < SAVE_RETRIES => {
                warn!(error = %e, attempt, total = SAVE_RETRIES, "diagram save failed; retrying");
                tokio::time::sleep(Duration::from_millis(attempt as u64 * SAVE_RETRY_BASE_MS)).await;
            }
            Err(e) => {
                error!(error = %e, "diagram save failed after retries");
            }
        }
    }
}

/// Best-effort, non-blocking enqueue of a diagram snapshot.
///
/// Call while still holding the diagram lock so snapshots queue in mutation
/// order.
pub fn enqueue_save(state: &AppState, diagram: &Diagram) {
    let Some(tx) = &state.save_tx else {
        return;
    };

    match tx.try_send(diagram.clone()) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(nodes = diagram.nodes.len(), edges = diagram.edges.len(), "save queue full; dropping snapshot");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            warn!("save queue closed; dropping snapshot");
        }
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
