use std::sync::Arc;

use crate::clock::Clock;
use crate::gateway::SharedGateway;
use crate::store::SharedStore;

/// Handles shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub gateway: SharedGateway,
    pub clock: Arc<dyn Clock>,
}
