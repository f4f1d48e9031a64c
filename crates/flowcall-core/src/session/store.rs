//! Session store trait.
//!
//! Defines the interface for keyed session storage and identity resolution.

use super::context::ContextPatch;
use super::key::SessionKey;
use super::model::{Session, SessionPatch};
use async_trait::async_trait;
use std::time::Duration;

/// An abstract store for construction sessions.
///
/// A session is reachable by its session id and, when it has one, by the
/// alias derived from its call id. Lookups never fail: "not found" is
/// `None`/`false`, never an error, and no lookup creates a session.
///
/// # Implementation Notes
///
/// The in-memory implementation lives in `flowcall-application`. A shared
/// key-value store with TTL support can implement the same contract for
/// multi-instance deployments.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates and indexes a fresh `collecting` session.
    async fn create(&self, user_id: &str, call_id: Option<&str>) -> Session;

    /// Resolves a session id first, then the call alias of `id_or_alias`.
    async fn get(&self, id_or_alias: &str) -> Option<Session>;

    /// Resolves `caller_key` or creates a session aliased under it.
    ///
    /// Returns the session and whether it was created by this call.
    /// Implementations should make the check and the insert atomic.
    async fn get_or_create(&self, caller_key: &str, user_id: &str) -> (Session, bool) {
        match self.get(caller_key).await {
            Some(session) => (session, false),
            None => {
                let call_id = SessionKey::strip_alias(caller_key);
                (self.create(user_id, Some(call_id)).await, true)
            }
        }
    }

    /// Shallow-merges `patch` into the session.
    ///
    /// Returns `false` (and logs a warning) when the session does not exist.
    async fn update(&self, id: &str, patch: SessionPatch) -> bool;

    /// Merges `patch` into the conversation context only.
    ///
    /// Returns `false` (and logs a warning) when the session does not exist.
    async fn update_context(&self, id: &str, patch: ContextPatch) -> bool;

    /// Removes the session under both of its keys. Returns whether it existed.
    async fn delete(&self, id: &str) -> bool;

    /// Evicts every session idle for longer than `max_idle`.
    async fn sweep(&self, max_idle: Duration) -> usize;

    /// Sessions owned by `user_id`, each listed once.
    async fn list_by_user(&self, user_id: &str) -> Vec<Session>;
}
