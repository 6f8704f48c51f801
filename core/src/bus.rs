//! Synchronous publish/subscribe dispatcher keyed by [`EventKind`].

use std::{
    any::Any,
    cell::{BorrowError, BorrowMutError, Cell, RefCell},
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use thiserror::Error;

use crate::{EventKind, GameEvent};

/// Callback invoked for every event of the tag it was registered under.
///
/// Identity is the `Rc` allocation: clone the same `Listener` to register or
/// unregister it, a fresh closure with identical code is a different listener.
pub type Listener = Rc<dyn Fn(&GameEvent) -> Result<(), ListenerError>>;

/// Wraps a closure into a [`Listener`].
pub fn listener<F>(callback: F) -> Listener
where
    F: Fn(&GameEvent) -> Result<(), ListenerError> + 'static,
{
    Rc::new(callback)
}

/// Failure reported by a listener. The bus logs it and keeps dispatching.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener could not act on the event.
    #[error("listener rejected {kind:?}: {reason}")]
    Rejected {
        /// Tag of the rejected event.
        kind: EventKind,
        /// Human readable explanation.
        reason: String,
    },
    /// Shared state the listener mutates was already mutably borrowed.
    #[error("listener state is busy: {0}")]
    Busy(#[from] BorrowMutError),
    /// Shared state the listener reads was mutably borrowed elsewhere.
    #[error("listener state is locked: {0}")]
    Locked(#[from] BorrowError),
}

/// Per-tag listener registry with synchronous, fault-isolated dispatch.
///
/// All operations take `&self`, so the bus can be shared through an `Rc` and
/// listeners may emit nested events or change subscriptions while a dispatch
/// is running. A dispatch always delivers to the listeners that were
/// registered when it started.
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<EventKind, Vec<Listener>>>,
    faults: Cell<u64>,
}

impl EventBus {
    /// Creates a bus without any listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events tagged `kind`.
    ///
    /// Registering the same listener twice under one tag keeps a single entry.
    pub fn on(&self, kind: EventKind, listener: &Listener) {
        let mut listeners = self.listeners.borrow_mut();
        let registered = listeners.entry(kind).or_default();
        if registered
            .iter()
            .any(|existing| same_listener(existing, listener))
        {
            return;
        }
        registered.push(Rc::clone(listener));
    }

    /// Unregisters `listener` from `kind`. Unknown listeners are ignored.
    pub fn off(&self, kind: EventKind, listener: &Listener) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(registered) = listeners.get_mut(&kind) {
            registered.retain(|existing| !same_listener(existing, listener));
            if registered.is_empty() {
                let _ = listeners.remove(&kind);
            }
        }
    }

    /// Delivers `event` to every listener registered for its tag.
    ///
    /// Errors and panics raised by a listener are logged and counted; the
    /// remaining listeners still run and nothing reaches the caller.
    pub fn emit(&self, event: GameEvent) {
        let kind = event.kind();
        let Some(snapshot) = self.listeners.borrow().get(&kind).cloned() else {
            return;
        };

        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    self.record_fault();
                    log::error!("{kind:?} listener failed: {error}");
                }
                Err(payload) => {
                    self.record_fault();
                    log::error!("{kind:?} listener panicked: {}", panic_message(&*payload));
                }
            }
        }
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Drops every registration for `kind`.
    pub fn clear_kind(&self, kind: EventKind) {
        let _ = self.listeners.borrow_mut().remove(&kind);
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Number of listener failures caught since the bus was created.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.faults.get()
    }

    fn record_fault(&self) {
        self.faults.set(self.faults.get().saturating_add(1));
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(EventKind, usize)> = match self.listeners.try_borrow() {
            Ok(listeners) => {
                let mut counts: Vec<_> = listeners
                    .iter()
                    .map(|(kind, registered)| (*kind, registered.len()))
                    .collect();
                counts.sort();
                counts
            }
            Err(_) => Vec::new(),
        };
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("faults", &self.faults.get())
            .finish()
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
