//! Read-side access to a user's conversation.
//!
//! Every lookup here is soft: storage errors are logged and become
//! `None`/empty so the orchestrator can treat them as "nothing to analyze".

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{LastPair, Message, Role};
use crate::repository::{IdentityResolver, MessageStore};

/// Resolves identities and fetches message windows
#[derive(Clone)]
pub struct MessageAccessor {
    identities: Arc<dyn IdentityResolver>,
    messages: Arc<dyn MessageStore>,
}

impl MessageAccessor {
    /// Create an accessor over the given stores
    pub fn new(identities: Arc<dyn IdentityResolver>, messages: Arc<dyn MessageStore>) -> Self {
        Self { identities, messages }
    }

    /// Internal user id for `identity`, `None` if unknown or on lookup failure
    pub async fn resolve_user(&self, identity: &str) -> Option<i64> {
        match self.identities.resolve(identity).await {
            Ok(Some(user_id)) => Some(user_id),
            Ok(None) => {
                debug!(identity, "Identity not registered");
                None
            }
            Err(e) => {
                warn!(identity, error = %e, "Identity lookup failed");
                None
            }
        }
    }

    /// The newest user and assistant messages among the two most recent turns.
    ///
    /// When both of those turns share a role, the other slot is `None`.
    pub async fn get_last_pair(&self, identity: &str) -> LastPair {
        let Some(user_id) = self.resolve_user(identity).await else {
            return LastPair::default();
        };

        let recent = self.fetch(user_id, 2).await;
        let mut pair = LastPair {
            user_id: Some(user_id),
            ..LastPair::default()
        };

        // Newest first, so the first hit per role is the latest one
        for message in recent {
            match message.role {
                Role::User if pair.user_message.is_none() => pair.user_message = Some(message),
                Role::Assistant if pair.assistant_message.is_none() => pair.assistant_message = Some(message),
                _ => {}
            }
        }

        pair
    }

    /// Up to `limit` most recent messages, newest first; empty on any failure
    pub async fn get_recent_window(&self, identity: &str, limit: usize) -> Vec<Message> {
        match self.resolve_user(identity).await {
            Some(user_id) => self.fetch(user_id, limit).await,
            None => Vec::new(),
        }
    }

    async fn fetch(&self, user_id: i64, limit: usize) -> Vec<Message> {
        match self.messages.recent_messages(user_id, limit).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(user_id, error = %e, "Message lookup failed");
                Vec::new()
            }
        }
    }
}
