use crate::config::Config;
use spectra_llm::StreamingClient;
use std::sync::Arc;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<dyn StreamingClient>,
}

impl AppState {
    pub fn new(config: Config, client: Arc<dyn StreamingClient>) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }
}
