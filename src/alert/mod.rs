//! Alert delivery
//!
//! Rendering, near-duplicate suppression and the non-blocking hand-off to an
//! external [`Notifier`].

mod dedup;
mod dispatcher;
mod format;
mod notifier;
mod similarity;

pub use dedup::{DuplicateFilter, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_WINDOW_CAPACITY};
pub use dispatcher::{AlertDispatcher, DispatchError, DispatchStats, DispatcherConfig};
pub use format::AlertFormatter;
pub use notifier::{LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use similarity::similarity_ratio;
