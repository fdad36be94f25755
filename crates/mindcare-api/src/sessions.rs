use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use mindcare_types::models::SessionUser;

/// Process-side session storage. Sessions (and in-flight OAuth logins) live
/// only in this process and are lost on restart; clients just log in again.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    /// session id -> authenticated user
    sessions: RwLock<HashMap<Uuid, SessionUser>>,

    /// OAuth logins awaiting their callback: CSRF state -> PKCE verifier secret
    pending_logins: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                pending_logins: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub async fn create(&self, user: SessionUser) -> Uuid {
        let session_id = Uuid::new_v4();
        self.inner.sessions.write().await.insert(session_id, user);
        session_id
    }

    pub async fn get(&self, session_id: Uuid) -> Option<SessionUser> {
        self.inner.sessions.read().await.get(&session_id).cloned()
    }

    pub async fn destroy(&self, session_id: Uuid) {
        self.inner.sessions.write().await.remove(&session_id);
    }

    /// Record an outbound login redirect so the callback can be verified
    /// against its CSRF state and finish the PKCE exchange.
    pub async fn begin_login(&self, csrf_state: String, pkce_verifier: String) {
        self.inner
            .pending_logins
            .write()
            .await
            .insert(csrf_state, pkce_verifier);
    }

    /// Consume a pending login. Returns the PKCE verifier secret, or `None`
    /// for an unknown or already-used state.
    pub async fn take_login(&self, csrf_state: &str) -> Option<String> {
        self.inner.pending_logins.write().await.remove(csrf_state)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn session_roundtrip() {
        let store = SessionStore::new();
        let sid = store.create(user()).await;

        let found = store.get(sid).await.unwrap();
        assert_eq!(found.name, "Asha");

        store.destroy(sid).await;
        assert!(store.get(sid).await.is_none());
    }

    #[tokio::test]
    async fn unknown_session_is_none() {
        let store = SessionStore::new();
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn pending_login_is_single_use() {
        let store = SessionStore::new();
        store.begin_login("state-1".into(), "verifier-1".into()).await;

        assert_eq!(store.take_login("state-1").await.as_deref(), Some("verifier-1"));
        assert!(store.take_login("state-1").await.is_none());
        assert!(store.take_login("state-2").await.is_none());
    }
}
