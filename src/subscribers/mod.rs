//! # Event subscribers.
//!
//! - [`Subscribe`]: extension point for custom event handlers
//! - [`SubscriberSet`]: per-subscriber bounded queues and workers
//! - `LogWriter` (feature `logging`): stdout printer used by the launcher

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
