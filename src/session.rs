//! Per-session context engine registry.
//!
//! Each logical conversation owns its own [`ContextEngine`] — query history
//! is never shared across sessions. The registry maps session ids to
//! independently locked engines so concurrent requests for *different*
//! sessions never contend, while requests for the *same* session serialize
//! their `add_query` / `context_vector` pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::config::ContextConfig;
use crate::context::ContextEngine;

pub struct SessionRegistry {
    context_config: ContextConfig,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ContextEngine>>>>,
}

impl SessionRegistry {
    pub fn new(context_config: ContextConfig) -> Self {
        Self {
            context_config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session with a fresh, empty context engine.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let engine = ContextEngine::from_config(&self.context_config);
        self.sessions
            .write()
            .expect("session registry lock poisoned")
            .insert(id, Arc::new(Mutex::new(engine)));
        id
    }

    /// Look up a session's engine. Returns `None` for unknown ids.
    pub fn get(&self, id: Uuid) -> Option<Arc<Mutex<ContextEngine>>> {
        self.sessions
            .read()
            .expect("session registry lock poisoned")
            .get(&id)
            .cloned()
    }

    /// End a session, discarding its history. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions
            .write()
            .expect("session registry lock poisoned")
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .expect("session registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
