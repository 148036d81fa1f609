use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::store::Repository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production, in-memory in tests.
    pub repo: Arc<dyn Repository>,
    pub llm: LlmClient,
    pub config: Config,
}
