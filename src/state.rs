//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the single live diagram, the optional LLM client, layout
//! settings, and the sender half of the save queue. Every field is `Arc`
//! wrapped or `Copy`, so cloning per request is cheap.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};

use crate::config::DEFAULT_FLOWCHART_MAX_TOKENS;
use crate::diagram::Diagram;
use crate::flowchart::LayoutConfig;
use crate::llm::LlmChat;

#[derive(Clone)]
pub struct AppState {
    pub diagram: Arc<RwLock<Diagram>>,
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    pub layout: LayoutConfig,
    pub flowchart_max_tokens: u32,
    /// Held for the whole of a flowchart submission.
    pub submit_lock: Arc<Mutex<()>>,
    /// Save queue. `None` disables persistence (tests).
    pub save_tx: Option<mpsc::Sender<Diagram>>,
}

impl AppState {
    #[must_use]
    pub fn new(diagram: Diagram, llm: Option<Arc<dyn LlmChat>>, layout: LayoutConfig) -> Self {
        Self {
            diagram: Arc::new(RwLock::new(diagram)),
            llm,
            layout,
            flowchart_max_tokens: DEFAULT_FLOWCHART_MAX_TOKENS,
            submit_lock: Arc::new(Mutex::new(())),
            save_tx: None,
        }
    }

    #[must_use]
    pub fn with_save_tx(mut self, tx: mpsc::Sender<Diagram>) -> Self {
        self.save_tx = Some(tx);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.flowchart_max_tokens = max_tokens;
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
