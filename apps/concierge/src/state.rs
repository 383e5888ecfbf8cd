use std::sync::Arc;

use crate::config::Config;
use crate::conversation::session::{Engine, SessionStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    /// Performs upstream and geolocation effects for every session.
    pub engine: Engine,
    pub config: Config,
}
