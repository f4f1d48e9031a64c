//! Session identity keys.

use std::fmt;

const CALL_PREFIX: &str = "call:";

/// A key a session can be reached by.
///
/// Session ids and call ids live in separate namespaces, so a raw call id can
/// never collide with a raw session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKey {
    Session(String),
    Call(String),
}

impl SessionKey {
    pub fn session(id: impl Into<String>) -> Self {
        Self::Session(id.into())
    }

    pub fn call(call_id: impl Into<String>) -> Self {
        Self::Call(call_id.into())
    }

    /// Keys to try, in order, for an identifier of unknown kind.
    ///
    /// A `call:`-prefixed identifier is taken as an explicit alias.
    pub fn candidates(id_or_alias: &str) -> [SessionKey; 2] {
        [
            Self::session(id_or_alias),
            Self::call(Self::strip_alias(id_or_alias)),
        ]
    }

    /// The raw call id inside `id_or_alias`, without any `call:` prefix.
    pub fn strip_alias(id_or_alias: &str) -> &str {
        id_or_alias
            .strip_prefix(CALL_PREFIX)
            .unwrap_or(id_or_alias)
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Session(id) => write!(f, "{}", id),
            SessionKey::Call(call_id) => write!(f, "{}{}", CALL_PREFIX, call_id),
        }
    }
}

/// The string form of the alias derived from `call_id`.
pub fn call_alias(call_id: &str) -> String {
    SessionKey::call(call_id).to_string()
}
