//! Conversation handling
//!
//! `ConversationEngine` ties the pure state machine in [`flow`] to a
//! [`SessionStore`]. Each message for a user is handled to completion while
//! holding that user's lock; different users never wait on each other.

pub mod flow;
pub mod keywords;
pub mod replies;

use crate::state::{Session, SessionStore};
use crate::Result;
use flow::FlowEvent;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct ConversationEngine {
    store: Arc<dyn SessionStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationEngine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Answer one inbound message. Always returns a non-empty reply.
    pub async fn handle_message(&self, user_id: &str, raw: &str) -> String {
        let tag = user_tag(user_id);
        let user_lock = self.acquire(user_id).await;

        let reply = {
            let _guard = user_lock.lock().await;
            match self.process(user_id, raw, &tag).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(user = %tag, error = %e, "Failed to handle message");
                    replies::INTERNAL_ERROR.to_string()
                }
            }
        };

        drop(user_lock);
        self.release(user_id).await;
        reply
    }

    /// Number of users with an unfinished flow.
    pub async fn active_sessions(&self) -> Result<usize> {
        self.store.count().await
    }

    async fn process(&self, user_id: &str, raw: &str, tag: &str) -> Result<String> {
        let session = self.store.get(user_id).await?;
        let current = session.as_ref().map(|s| s.state).unwrap_or_default();

        let transition = flow::advance(&current, raw);

        info!(
            user = %tag,
            from = current.label(),
            to = transition.next.label(),
            event = ?transition.event,
            "Message handled"
        );

        if transition.next.is_idle() {
            if session.is_some() {
                self.store.delete(user_id).await?;
            }
        } else {
            let session = match session {
                Some(mut existing) if transition.event != FlowEvent::FlowStarted => {
                    existing.update(transition.next);
                    existing
                }
                _ => Session::new(transition.next),
            };
            self.store.put(user_id, session).await?;
        }

        Ok(transition.reply)
    }

    async fn acquire(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the user's lock entry once no request holds it.
    async fn release(&self, user_id: &str) {
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(user_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(user_id);
            }
        }
    }
}

/// Short digest of a user id for logs. Phone numbers are never logged raw.
pub fn user_tag(user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    hex::encode(&digest[..6])
}
