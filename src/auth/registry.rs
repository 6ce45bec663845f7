use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct AdminEntry {
    session_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<Uuid, DateTime<Utc>>,
    // keyed by fingerprint of the admin token's jti
    admin_tokens: HashMap<String, AdminEntry>,
}

impl Registry {
    fn prune(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, exp| *exp > now);
        let sessions = &self.sessions;
        self.admin_tokens
            .retain(|_, entry| entry.expires_at > now && sessions.contains_key(&entry.session_id));
    }
}

/// Liveness of base sessions and the admin tokens issued under them.
///
/// A token's own signature and expiry are checked elsewhere; this registry
/// answers whether it was ended early (logout, de-escalation).
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<Registry>>,
}

fn fingerprint(jti: Uuid) -> String {
    let digest = Sha256::digest(jti.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or extend a base session
    pub async fn open_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.prune(Utc::now());
        inner.sessions.insert(session_id, expires_at);
    }

    /// A session is live until `expires_at` passes or it is ended. Callers
    /// register the last instant the session may still be continued, so the
    /// token's own expiry stays the gate for ordinary requests.
    pub async fn is_session_live(&self, session_id: Uuid) -> bool {
        let inner = self.inner.read().await;
        inner.sessions.get(&session_id).is_some_and(|exp| *exp > Utc::now())
    }

    /// End a session and every admin token issued under it
    pub async fn end_session(&self, session_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let existed = inner.sessions.remove(&session_id).is_some();
        inner.admin_tokens.retain(|_, e| e.session_id != session_id);
        debug!(%session_id, existed, "session ended");
        existed
    }

    pub async fn register_admin_token(&self, jti: Uuid, session_id: Uuid, expires_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.prune(Utc::now());
        inner
            .admin_tokens
            .insert(fingerprint(jti), AdminEntry { session_id, expires_at });
    }

    /// Live only while unexpired, unrevoked, and its base session is live
    pub async fn is_admin_token_live(&self, jti: Uuid) -> bool {
        let now = Utc::now();
        let inner = self.inner.read().await;
        match inner.admin_tokens.get(&fingerprint(jti)) {
            Some(entry) => {
                entry.expires_at > now
                    && inner
                        .sessions
                        .get(&entry.session_id)
                        .is_some_and(|exp| *exp > now)
            }
            None => false,
        }
    }

    /// Revoke every admin token of a session; returns how many were registered
    pub async fn revoke_admin_tokens(&self, session_id: Uuid) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.admin_tokens.len();
        inner.admin_tokens.retain(|_, e| e.session_id != session_id);
        before - inner.admin_tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn admin_token_dies_with_its_session() {
        let registry = SessionRegistry::new();
        let sid = Uuid::new_v4();
        let jti = Uuid::new_v4();
        registry.open_session(sid, Utc::now() + Duration::hours(1)).await;
        registry
            .register_admin_token(jti, sid, Utc::now() + Duration::minutes(15))
            .await;
        assert!(registry.is_admin_token_live(jti).await);

        assert!(registry.end_session(sid).await);
        assert!(!registry.is_session_live(sid).await);
        assert!(!registry.is_admin_token_live(jti).await);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let registry = SessionRegistry::new();
        let sid = Uuid::new_v4();
        let jti = Uuid::new_v4();
        registry.open_session(sid, Utc::now() + Duration::hours(1)).await;
        registry
            .register_admin_token(jti, sid, Utc::now() + Duration::minutes(15))
            .await;

        assert_eq!(registry.revoke_admin_tokens(sid).await, 1);
        assert_eq!(registry.revoke_admin_tokens(sid).await, 0);
        assert!(!registry.is_admin_token_live(jti).await);
        assert!(registry.is_session_live(sid).await);
    }

    #[tokio::test]
    async fn expired_session_is_not_live() {
        let registry = SessionRegistry::new();
        let sid = Uuid::new_v4();
        registry.open_session(sid, Utc::now() - Duration::seconds(1)).await;
        assert!(!registry.is_session_live(sid).await);
    }
}
