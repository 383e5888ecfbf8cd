//! Session store and the async driver that performs state-machine effects.
//!
//! Each session's machine sits behind its own mutex. The lock is held only to
//! run a transition or apply an outcome, never across an upstream or
//! geolocation call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversation::machine::{ConversationMachine, Effect, FetchRequest};
use crate::llm_client::Upstream;
use crate::location::LocationResolver;
use crate::recommendations::prompt_builder::build_prompt;

/// Upper bound between two idle sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub type SessionHandle = Arc<Mutex<ConversationMachine>>;

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// In-memory sessions. Nothing here outlives the process; sessions idle for
/// longer than the configured TTL are evicted by the sweeper.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, machine: ConversationMachine) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(machine));
        let entry = SessionEntry {
            handle: handle.clone(),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        info!("Session {id} created");
        (id, handle)
    }

    /// Looks the session up and marks it as seen.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.handle.clone())
    }

    /// Removes the session. In-flight calls finish against the detached
    /// machine and are dropped with it.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Session {id} closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session not seen for `ttl`. Returns how many were evicted.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.duration_since(entry.last_seen) < ttl;
            if !keep {
                info!("Session {id} expired after {}s idle", ttl.as_secs());
            }
            keep
        });
        before - sessions.len()
    }

    /// Runs `evict_idle` periodically for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>, ttl: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ttl.min(SWEEP_INTERVAL));
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(ttl).await;
                if evicted > 0 {
                    debug!("Idle sweep evicted {evicted} session(s)");
                }
            }
        })
    }
}

/// Performs effects on behalf of a session.
#[derive(Clone)]
pub struct Engine {
    upstream: Arc<dyn Upstream>,
    resolver: Arc<dyn LocationResolver>,
}

impl Engine {
    pub fn new(upstream: Arc<dyn Upstream>, resolver: Arc<dyn LocationResolver>) -> Self {
        Self { upstream, resolver }
    }

    /// Fire-and-forget: runs the effects on a background task.
    pub fn spawn(&self, session: SessionHandle, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_effects(session, effects).await;
        });
    }

    /// Runs effects in order. A location lookup finishes before a fetch that
    /// follows it is built, so the prompt sees the resolved place. A landed
    /// lookup also releases any fetch that was waiting on it.
    pub async fn run_effects(&self, session: SessionHandle, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ResolveLocation { generation, coords } => {
                    let context = match self.resolver.resolve(coords).await {
                        Ok(context) => Some(context),
                        Err(e) => {
                            warn!("Location lookup failed: {e}");
                            None
                        }
                    };
                    let released = {
                        let mut machine = session.lock().await;
                        if machine.location_resolved(generation, context) {
                            machine.release_deferred()
                        } else {
                            None
                        }
                    };
                    if let Some(Effect::Fetch(fetch)) = released {
                        self.fetch(&session, fetch).await;
                    }
                }
                Effect::Fetch(fetch) => self.fetch(&session, fetch).await,
            }
        }
    }

    async fn fetch(&self, session: &SessionHandle, fetch: FetchRequest) {
        let request = {
            let machine = session.lock().await;
            if !machine.is_current(fetch.seq) {
                debug!("Skipping superseded fetch (seq={})", fetch.seq);
                return;
            }
            machine.prompt_request(&fetch)
        };

        let prompt = build_prompt(&request);
        debug!(
            "Sending prompt (seq={}, load_more={}, {} chars)",
            fetch.seq,
            request.is_load_more,
            prompt.len()
        );

        let response = self.upstream.generate(&prompt).await;
        session.lock().await.complete(fetch.seq, response);
    }
}
