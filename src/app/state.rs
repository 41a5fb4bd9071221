//! Application state shared across routes

use std::sync::Arc;

use crate::arena::MatchRegistry;
use crate::config::Config;
use crate::session::SessionService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize match registry
        let registry = Arc::new(MatchRegistry::new());

        // Initialize session service (Arc for sharing across cloned AppState)
        let sessions = Arc::new(SessionService::new(registry.clone(), config.rules.clone()));

        Self {
            config,
            sessions,
            registry,
        }
    }
}
