use std::sync::Arc;

use paperentry_core::{Capability, Config};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: Config,
    pub capability: Arc<dyn Capability>,
}
