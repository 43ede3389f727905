use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sqlx::PgPool;
use uuid::Uuid;

use crate::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub orchestrator: Arc<Orchestrator>,
    pub session_locks: SessionLocks,
}

/// One async mutex per session. Conversation semantics require strict turn
/// ordering, so a session's turns run to completion one at a time; turns
/// for different sessions never contend.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn for_session(&self, session_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut registry = self.inner.lock().expect("session lock registry poisoned");
        registry.entry(session_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_session_shares_one_lock() {
        let locks = SessionLocks::default();
        let id = Uuid::new_v4();
        assert!(Arc::ptr_eq(&locks.for_session(id), &locks.for_session(id)));
    }

    #[test]
    fn test_different_sessions_get_independent_locks() {
        let locks = SessionLocks::default();
        assert!(!Arc::ptr_eq(
            &locks.for_session(Uuid::new_v4()),
            &locks.for_session(Uuid::new_v4())
        ));
    }
}
