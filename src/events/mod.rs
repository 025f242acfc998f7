//! Process-wide auth event fan-out.
//!
//! Listeners are registered once at startup with
//! [`register_event_listeners`]; the registry and gateway dispatch an
//! [`AuthEvent`] at each lifecycle transition. With no listeners
//! registered, dispatch is a no-op.

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::AuthEvent;
pub use listener::Listener;
pub use registry::{dispatch, register_event_listeners, EventRegistry};
