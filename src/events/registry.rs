use std::sync::OnceLock;

use crate::events::{AuthEvent, Listener};

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

/// Holds the registered listeners. Built once via
/// [`register_event_listeners`] and immutable afterwards.
#[derive(Default)]
pub struct EventRegistry {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventRegistry {
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Installs the process-wide listener set.
///
/// Call once during startup, before any registry activity. A second call
/// is ignored with a warning so late initialization cannot silently swap
/// the listener set.
///
/// ```
/// use latchkey::events::listeners::LoggingListener;
/// use latchkey::register_event_listeners;
///
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::new(log::Level::Info));
/// });
/// ```
pub fn register_event_listeners<F>(configure: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::default();
    configure(&mut registry);
    if REGISTRY.set(registry).is_err() {
        log::warn!(target: "latchkey", "msg=\"event listeners already registered, ignoring\"");
    }
}

/// Delivers `event` to every registered listener, in registration order.
pub async fn dispatch(event: AuthEvent) {
    let Some(registry) = REGISTRY.get() else {
        return;
    };
    for listener in &registry.listeners {
        listener.handle(&event).await;
    }
}
