//! Session domain module.
//!
//! This module contains all session-related domain models and the store
//! interface.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionPatch`)
//! - `context`: Accumulated intent (`ConversationContext`, `ContextPatch`)
//! - `status`: Construction state machine (`SessionStatus`)
//! - `key`: Two-namespace identity (`SessionKey`)
//! - `specialist`: Routing personas (`Specialist`)
//! - `store`: Store trait for session persistence (`SessionStore`)

mod context;
mod key;
mod model;
mod specialist;
mod status;
mod store;

// Re-export public API
pub use context::{ContextPatch, ConversationContext};
pub use key::{SessionKey, call_alias};
pub use model::{Session, SessionPatch};
pub use specialist::Specialist;
pub use status::SessionStatus;
pub use store::SessionStore;
