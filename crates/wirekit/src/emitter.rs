#![forbid(unsafe_code)]

//! Synchronous, single-threaded event emitter.
//!
//! [`EventSource`] is the contract the engine needs from an event-binding
//! target: subscribe and unsubscribe a handler for a named event with a
//! callback scope. [`EventEmitter`] is the stock implementation.
//!
//! # Architecture
//!
//! Listeners live in a `RefCell<Vec<..>>` in registration order. The scope
//! of each listener is held as a `Weak`, so a target never keeps its
//! dependents alive. Listeners whose scope has been dropped are pruned
//! lazily during emission.
//!
//! # Invariants
//!
//! 1. Listeners for an event run in registration order.
//! 2. `emit` dispatches to a snapshot taken before the first handler runs:
//!    handlers may subscribe or unsubscribe during emission, and the change
//!    applies from the next `emit`.
//! 3. `unsubscribe` removes at most one listener, matched by event name,
//!    handler identity and scope identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::object::{ObjectRef, Wireable};

/// An event handler, called with the callback scope and the event payload.
pub type Handler = Rc<dyn Fn(&dyn Wireable, &dyn Any)>;

/// Wrap a closure as a [`Handler`].
pub fn handler_fn(f: impl Fn(&dyn Wireable, &dyn Any) + 'static) -> Handler {
    Rc::new(f)
}

/// Wrap a closure that expects its scope to be a `T`.
///
/// When invoked with a scope of another type the closure is skipped and a
/// warning is logged.
pub fn handler<T: Wireable>(f: impl Fn(&T, &dyn Any) + 'static) -> Handler {
    Rc::new(move |scope: &dyn Wireable, payload: &dyn Any| {
        match scope.as_any().downcast_ref::<T>() {
            Some(scope) => f(scope, payload),
            None => tracing::warn!(
                expected = std::any::type_name::<T>(),
                "event handler invoked with a scope of another type"
            ),
        }
    })
}

/// Whether two handlers are the same handler value.
#[must_use]
pub fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Something that can deliver named events to subscribed handlers.
pub trait EventSource {
    /// Subscribe `handler` to `event`, to be called with `scope`.
    fn subscribe(&self, event: &str, handler: Handler, scope: &ObjectRef);

    /// Remove one subscription of `handler` to `event` with `scope`.
    ///
    /// Returns whether a subscription was removed.
    fn unsubscribe(&self, event: &str, handler: &Handler, scope: &ObjectRef) -> bool;
}

struct Listener {
    event: String,
    handler: Handler,
    scope: Weak<dyn Wireable>,
}

impl Listener {
    fn matches(&self, event: &str, handler: &Handler, scope: &ObjectRef) -> bool {
        self.event == event
            && same_handler(&self.handler, handler)
            && std::ptr::addr_eq(self.scope.as_ptr(), Rc::as_ptr(scope))
    }
}

/// The stock [`EventSource`].
#[derive(Default)]
pub struct EventEmitter {
    listeners: RefCell<Vec<Listener>>,
}

impl EventEmitter {
    /// Create an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` with `payload` to every live listener.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &str, payload: &dyn Any) -> usize {
        let snapshot: Vec<(Handler, Weak<dyn Wireable>)> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|listener| listener.scope.strong_count() > 0);
            listeners
                .iter()
                .filter(|listener| listener.event == event)
                .map(|listener| (Rc::clone(&listener.handler), Weak::clone(&listener.scope)))
                .collect()
        };

        let mut invoked = 0;
        for (handler, scope) in snapshot {
            if let Some(scope) = scope.upgrade() {
                handler(&*scope, payload);
                invoked += 1;
            }
        }
        invoked
    }

    /// Number of live listeners for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|listener| listener.event == event && listener.scope.strong_count() > 0)
            .count()
    }

    /// Number of live listeners across all events.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|listener| listener.scope.strong_count() > 0)
            .count()
    }

    /// Whether `handler` is subscribed to `event` with `scope`.
    #[must_use]
    pub fn is_subscribed(&self, event: &str, handler: &Handler, scope: &ObjectRef) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|listener| listener.matches(event, handler, scope))
    }

    /// Drop every listener.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(dropped);
    }
}

impl EventSource for EventEmitter {
    fn subscribe(&self, event: &str, handler: Handler, scope: &ObjectRef) {
        self.listeners.borrow_mut().push(Listener {
            event: event.to_owned(),
            handler,
            scope: Rc::downgrade(scope),
        });
    }

    fn unsubscribe(&self, event: &str, handler: &Handler, scope: &ObjectRef) -> bool {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|listener| listener.matches(event, handler, scope))
                .map(|index| listeners.remove(index))
        };
        removed.is_some()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
