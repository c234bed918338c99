//! Core abstractions for Livy interactive sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `SessionConfig` - Endpoint, session kind, proxy user, Spark conf and jars
//! - Wire protocol types and the remote session/statement states
//! - `Transport` and `Sleeper` traits
//! - The polling state machine shared by session startup and statement output

pub mod config;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod poll;
pub mod protocol;
pub mod traits;

pub use config::SessionConfig;
pub use error::LivyError;
pub use poll::PollOutcome;
pub use protocol::{SessionState, StatementState};
pub use traits::{HttpRequest, HttpResponse, Sleeper, TokioSleeper, Transport, TransportError};
