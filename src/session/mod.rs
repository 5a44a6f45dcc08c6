//! Feed connection lifecycle
//!
//! [`FeedSession`] owns one connection from connect to close and reports
//! everything as a typed [`FeedEvent`] stream. [`ReconnectSupervisor`] keeps
//! sessions coming until told to stop.

mod backoff;
mod feed_session;
pub mod protocol;
mod state;
mod supervisor;
mod types;

pub use backoff::ReconnectPolicy;
pub use feed_session::FeedSession;
pub use state::SessionState;
pub use supervisor::ReconnectSupervisor;
pub use types::{CloseReason, FeedEvent, SessionConfig, SessionOutcome};
