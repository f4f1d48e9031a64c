use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowcall_core::session::{ContextPatch, Session, SessionKey, SessionPatch, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A stored session. Every key a session is indexed under points at the same `Arc`.
pub type SharedSession = Arc<RwLock<Session>>;

/// In-memory session store for single-instance deployments and tests.
///
/// Sessions live in one map keyed by [`SessionKey`], so the session id entry
/// and the call alias entry of a session are the same allocation and can
/// never drift apart. Lock order is always map first, then session.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, SharedSession>>,
}

impl InMemorySessionStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves `id_or_alias` to the stored session itself.
    ///
    /// # Returns
    ///
    /// `Some(session)` sharing the allocation every other key resolves to,
    /// `None` if neither the session id nor the call alias is known.
    pub async fn resolve(&self, id_or_alias: &str) -> Option<SharedSession> {
        let sessions = self.sessions.read().await;
        SessionKey::candidates(id_or_alias)
            .iter()
            .find_map(|key| sessions.get(key).cloned())
    }

    /// Number of logical sessions, not counting alias entries.
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.keys().filter(|key| key.is_session()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evicts every session whose `last_updated` is before `cutoff`.
    ///
    /// Both index entries of an evicted session disappear under one write
    /// lock, so no reader ever sees a half-evicted session.
    pub async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;

        let mut expired: Vec<SharedSession> = Vec::new();
        for (key, shared) in sessions.iter() {
            if key.is_session() && shared.read().await.last_updated < cutoff {
                expired.push(Arc::clone(shared));
            }
        }
        if expired.is_empty() {
            return 0;
        }

        sessions.retain(|_, shared| !expired.iter().any(|e| Arc::ptr_eq(e, shared)));
        tracing::debug!(
            evicted = expired.len(),
            remaining = sessions.len(),
            "Swept idle sessions"
        );
        expired.len()
    }

    fn index(
        sessions: &mut HashMap<SessionKey, SharedSession>,
        shared: &SharedSession,
        session: &Session,
    ) {
        sessions.insert(SessionKey::session(&session.session_id), Arc::clone(shared));
        if let Some(call_id) = &session.call_id {
            if let Some(previous) = sessions.insert(SessionKey::call(call_id), Arc::clone(shared)) {
                if !Arc::ptr_eq(&previous, shared) {
                    tracing::warn!(call_id = %call_id, "Call alias moved to a new session");
                }
            }
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: &str, call_id: Option<&str>) -> Session {
        let session = Session::new(user_id, call_id.map(str::to_string));
        let shared = Arc::new(RwLock::new(session.clone()));

        let mut sessions = self.sessions.write().await;
        Self::index(&mut sessions, &shared, &session);
        tracing::info!(
            session_id = %session.session_id,
            call_id = ?session.call_id,
            "Session created"
        );
        session
    }

    async fn get(&self, id_or_alias: &str) -> Option<Session> {
        let shared = self.resolve(id_or_alias).await?;
        let session = shared.read().await;
        Some(session.clone())
    }

    async fn get_or_create(&self, caller_key: &str, user_id: &str) -> (Session, bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(shared) = SessionKey::candidates(caller_key)
            .iter()
            .find_map(|key| sessions.get(key).cloned())
        {
            let session = shared.read().await.clone();
            return (session, false);
        }

        let call_id = SessionKey::strip_alias(caller_key).to_string();
        let session = Session::new(user_id, Some(call_id));
        let shared = Arc::new(RwLock::new(session.clone()));
        Self::index(&mut sessions, &shared, &session);
        tracing::info!(
            session_id = %session.session_id,
            caller_key,
            "Session created for caller"
        );
        (session, true)
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> bool {
        let Some(shared) = self.resolve(id).await else {
            tracing::warn!(id, "Update for unknown session ignored");
            return false;
        };

        let reindex = patch.call_id.is_some();
        let (previous_call, snapshot) = {
            let mut session = shared.write().await;
            let previous_call = session.call_id.clone();
            session.apply(patch);
            (previous_call, session.clone())
        };

        if reindex && previous_call != snapshot.call_id {
            let mut sessions = self.sessions.write().await;
            if let Some(old) = previous_call {
                let old_key = SessionKey::call(old);
                if sessions.get(&old_key).is_some_and(|s| Arc::ptr_eq(s, &shared)) {
                    sessions.remove(&old_key);
                }
            }
            Self::index(&mut sessions, &shared, &snapshot);
        }
        true
    }

    async fn update_context(&self, id: &str, patch: ContextPatch) -> bool {
        let Some(shared) = self.resolve(id).await else {
            tracing::warn!(id, "Context update for unknown session ignored");
            return false;
        };

        let mut session = shared.write().await;
        session.conversation_context.merge(patch);
        session.touch();
        true
    }

    async fn delete(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(target) = SessionKey::candidates(id)
            .iter()
            .find_map(|key| sessions.get(key).cloned())
        else {
            return false;
        };

        sessions.retain(|_, shared| !Arc::ptr_eq(shared, &target));
        tracing::info!(id, "Session deleted");
        true
    }

    async fn sweep(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        match Utc::now().checked_sub_signed(max_idle) {
            Some(cutoff) => self.sweep_older_than(cutoff).await,
            None => 0,
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut owned = Vec::new();
        for (key, shared) in sessions.iter() {
            if !key.is_session() {
                continue;
            }
            let session = shared.read().await;
            if session.is_owned_by(user_id) {
                owned.push(session.clone());
            }
        }
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        owned
    }
}
