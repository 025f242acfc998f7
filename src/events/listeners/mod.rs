//! Bundled [`Listener`](crate::events::Listener) implementations.

mod logging;

pub use logging::LoggingListener;
