//! Session services.
//!
//! - `memory_store`: single-process `SessionStore` implementation
//! - `lock`: per-session mutual exclusion for mutating handlers
//! - `sweeper`: fixed-interval idle eviction

mod lock;
mod memory_store;
mod sweeper;

pub use lock::SessionLocks;
pub use memory_store::{InMemorySessionStore, SharedSession};
pub use sweeper::{SessionSweeper, SweeperHandle};
