//! Session persistence layer
//!
//! One session per user id, holding the conversation state.
//! In-memory only; sessions last for the process lifetime.

use crate::conversation::flow::SessionState;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A user's unfinished flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_id: Uuid,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(state: SessionState) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            state,
            started_at: now,
            updated_at: now,
        }
    }

    /// Move to `state`, keeping the session id and start time.
    pub fn update(&mut self, state: SessionState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Session>>;
    async fn put(&self, user_id: &str, session: Session) -> Result<()>;
    async fn delete(&self, user_id: &str) -> Result<()>;
    async fn count(&self) -> Result<usize>;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(user_id.to_string(), session);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(user_id);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::flow::{CapacityStep, InstallmentStep};

    #[test]
    fn test_put_get_delete() {
        tokio_test::block_on(async {
            let store = InMemorySessionStore::new();
            let session = Session::new(SessionState::Capacity(CapacityStep::Income));

            store.put("5215550001", session.clone()).await.unwrap();
            assert_eq!(store.get("5215550001").await.unwrap(), Some(session));
            assert_eq!(store.count().await.unwrap(), 1);

            store.delete("5215550001").await.unwrap();
            assert_eq!(store.get("5215550001").await.unwrap(), None);
            assert_eq!(store.count().await.unwrap(), 0);
        });
    }

    #[test]
    fn test_one_session_per_user() {
        tokio_test::block_on(async {
            let store = InMemorySessionStore::default();

            store
                .put("a", Session::new(SessionState::Capacity(CapacityStep::Income)))
                .await
                .unwrap();
            store
                .put("a", Session::new(SessionState::Installment(InstallmentStep::CashPrice)))
                .await
                .unwrap();
            store.put("b", Session::new(SessionState::CreditReportOffer)).await.unwrap();

            assert_eq!(store.count().await.unwrap(), 2);
            let a = store.get("a").await.unwrap().unwrap();
            assert_eq!(a.state, SessionState::Installment(InstallmentStep::CashPrice));
        });
    }

    #[test]
    fn test_delete_missing_is_ok() {
        tokio_test::block_on(async {
            let store = InMemorySessionStore::new();
            assert!(store.delete("nobody").await.is_ok());
        });
    }

    #[test]
    fn test_update_keeps_identity() {
        let mut session = Session::new(SessionState::Capacity(CapacityStep::Income));
        let id = session.session_id;
        let started = session.started_at;

        session.update(SessionState::CreditReportOffer);

        assert_eq!(session.session_id, id);
        assert_eq!(session.started_at, started);
        assert!(session.updated_at >= started);
        assert_eq!(session.state, SessionState::CreditReportOffer);
    }
}
