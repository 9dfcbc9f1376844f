use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Session, SessionError};
use crate::config::RagSettings;

pub type SharedSession = Arc<Mutex<Session>>;

/// Live sessions keyed by id. Each session is locked on its own so
/// requests against different sessions never wait on each other.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, settings: RagSettings) -> (Uuid, SharedSession) {
        let session = Session::new(settings);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().insert(id, shared.clone());
        (id, shared)
    }

    pub fn get(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub fn remove(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        self.sessions
            .write()
            .remove(&id)
            .ok_or(SessionError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
