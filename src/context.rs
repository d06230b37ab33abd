//! Shared application state handed to every router.

use std::sync::Arc;

use crate::assistant::Orchestrator;
use crate::auth::JwtManager;
use crate::store::Database;

/// Built once in `main` and cloned into each request.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn Database>,
    pub jwt: Arc<JwtManager>,
    pub assistant: Arc<Orchestrator>,
}

impl AppContext {
    pub fn new(store: Arc<dyn Database>, jwt: JwtManager, assistant: Orchestrator) -> Self {
        Self {
            store,
            jwt: Arc::new(jwt),
            assistant: Arc::new(assistant),
        }
    }
}
