//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::MemoryIdentityProvider;
use crate::config::Config;
use callmyshot_core::handlers::ShotInteractions;
use callmyshot_core::memory::MemoryShotStore;
use callmyshot_core::ports::{IdentityProvider, ShotStore};
use chrono::Duration;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub shots: ShotInteractions,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ShotStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            shots: ShotInteractions::with_feed_limit(store, config.feed_limit),
            identity,
            config,
        }
    }

    /// State backed entirely by process memory. Nothing survives a restart.
    pub fn in_memory(config: Arc<Config>) -> Self {
        let identity = Arc::new(MemoryIdentityProvider::new(Duration::days(
            config.session_ttl_days,
        )));
        Self::new(Arc::new(MemoryShotStore::new()), identity, config)
    }
}
