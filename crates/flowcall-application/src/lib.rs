//! Application layer for flowcall.
//!
//! This crate wires the domain types from `flowcall-core` into running
//! services: the in-memory session store and its background sweeper, the
//! function dispatcher that drives the construction state machine, and the
//! router that turns inbound voice-platform envelopes into function calls.

pub mod callback_router;
pub mod function_dispatcher;
pub mod session;

pub use callback_router::{CallbackRouter, InboundEnvelope, RouteOutcome};
pub use function_dispatcher::FunctionDispatcher;
pub use session::{InMemorySessionStore, SessionLocks, SessionSweeper, SweeperHandle};
