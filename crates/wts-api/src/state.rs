//! Shared application state for the HTTP API.

use std::sync::Arc;

use wts_core::{BreakingNewsLog, ControlActionExecutor, TurnClock, TurnStore};

/// Everything a handler needs, shared behind an `Arc`.
///
/// All three services point at the same [`TurnStore`]; the store is the
/// only synchronization point between requests.
#[derive(Clone)]
pub struct AppState {
    /// Read access to the current turn.
    pub store: Arc<dyn TurnStore>,
    /// Guarded control actions.
    pub executor: ControlActionExecutor,
    /// The news log.
    pub news: BreakingNewsLog,
}

impl AppState {
    /// Wire the services over `store`, driving transitions with `clock`.
    pub fn new(store: Arc<dyn TurnStore>, clock: TurnClock) -> Self {
        Self {
            executor: ControlActionExecutor::new(Arc::clone(&store), clock),
            news: BreakingNewsLog::new(Arc::clone(&store)),
            store,
        }
    }
}
