//! Terminal event subscription and dispatch.

use std::collections::HashMap;
use std::fmt;

use termkit_core::{Error, Result, Size};

/// Events a terminal sends out to its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalEvent {
    /// The terminal has been resized.
    ///
    /// Payload: [`EventPayload::Resize`] with the new size.
    Resize,
}

/// Data handed to listeners alongside an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    /// New terminal size, origin-adjusted
    Resize(Size),
}

impl EventPayload {
    /// The event this payload belongs to.
    pub fn event(&self) -> TerminalEvent {
        match self {
            EventPayload::Resize(_) => TerminalEvent::Resize,
        }
    }
}

/// Callback invoked when an event fires.
pub type Listener = Box<dyn FnMut(&EventPayload) -> anyhow::Result<()> + Send>;

/// Ordered listener lists, keyed by event.
#[derive(Default)]
pub struct Listeners {
    by_event: HashMap<TerminalEvent, Vec<Listener>>,
}

impl Listeners {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` to the list for `event`.
    pub fn subscribe(&mut self, event: TerminalEvent, listener: Listener) {
        self.by_event.entry(event).or_default().push(listener);
    }

    /// Number of listeners subscribed to `event`.
    pub fn listener_count(&self, event: TerminalEvent) -> usize {
        self.by_event.get(&event).map_or(0, Vec::len)
    }

    /// Call every listener of the payload's event, in subscription order.
    ///
    /// The first failing listener stops dispatch and its error is returned.
    pub fn dispatch(&mut self, payload: &EventPayload) -> Result<()> {
        if let Some(listeners) = self.by_event.get_mut(&payload.event()) {
            for listener in listeners.iter_mut() {
                listener(payload).map_err(Error::Listener)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, listeners) in &self.by_event {
            map.entry(event, &listeners.len());
        }
        map.finish()
    }
}
