//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::session::{ConnectionController, SessionRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub controller: Arc<ConnectionController>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // One registry for the whole process, handed to the connection layer
        let registry = Arc::new(SessionRegistry::new());
        let controller = Arc::new(ConnectionController::new(registry.clone()));

        Self {
            config,
            registry,
            controller,
        }
    }
}
