//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::{broadcast::Broadcaster, jobs::JobRegistry};
use std::sync::Arc;
use studio_core::ports::{ContentGenerationService, ProjectStore};

/// The shared application state, created once at startup and passed to all handlers.
///
/// Everything behind the ports is injected here; there is no global store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProjectStore>,
    pub llm: Arc<dyn ContentGenerationService>,
    pub config: Arc<Config>,
    pub broadcaster: Broadcaster,
    pub jobs: Arc<JobRegistry>,
}
