//! Client for one Livy interactive session.
//!
//! Provides:
//! - `LivyClient` - Create a session, run statements through it, remove it
//! - `delete_session` - Remove a session by id

pub mod client;

pub use client::{LivyClient, delete_session};
pub use livy_session_core::{LivyError, SessionConfig};
