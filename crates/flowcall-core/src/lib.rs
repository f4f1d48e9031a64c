//! Domain layer for flowcall.
//!
//! Holds the session model and store contract, the workflow graph and its
//! linter, the function-call vocabulary, and the traits for the external
//! collaborators. Nothing in this crate performs network I/O.

pub mod collaborator;
pub mod config;
pub mod error;
pub mod function;
pub mod session;
pub mod workflow;

pub use error::{FlowcallError, Result};
