#![forbid(unsafe_code)]

//! A ready-made participant: wiring slot, event emitter, method table and
//! settable lifecycle hooks.
//!
//! Useful for objects that only need to be connected and to emit events, and
//! for tests. Types with their own state implement [`Wireable`] directly.
//!
//! ```
//! use std::rc::Rc;
//! use wirekit::{Component, Container, DependencyMap};
//!
//! let db = Rc::new(Component::new());
//! let view = Rc::new(Component::new());
//!
//! let mut container = Container::default();
//! container.add("db", db.clone()).unwrap();
//! container.add_with("view", view.clone(), &DependencyMap::new().wire("db")).unwrap();
//! container.wire_all().unwrap();
//!
//! assert!(view.slot_ref().has_dependency("db"));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::emitter::{EventEmitter, EventSource};
use crate::object::{MethodTable, WireLifecycle, WireSlot, Wireable};

type Hook = Rc<dyn Fn()>;
type LateHook = Rc<dyn Fn(&str)>;

/// Lifecycle closures, each optional and replaceable at any time.
#[derive(Default)]
pub struct LifecycleHooks {
    on_wire: RefCell<Option<Hook>>,
    on_unwire: RefCell<Option<Hook>>,
    on_wire_late: RefCell<Option<LateHook>>,
}

impl WireLifecycle for LifecycleHooks {
    fn on_wire(&self) {
        let hook = self.on_wire.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn on_unwire(&self) {
        let hook = self.on_unwire.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn on_wire_late(&self, target: &str) {
        let hook = self.on_wire_late.borrow().clone();
        if let Some(hook) = hook {
            hook(target);
        }
    }
}

/// General-purpose [`Wireable`] object.
#[derive(Default)]
pub struct Component {
    slot: WireSlot,
    emitter: EventEmitter,
    methods: MethodTable,
    hooks: LifecycleHooks,
}

impl Component {
    /// Create a component with no methods and no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a component exposing `methods` for method handlers.
    #[must_use]
    pub fn with_methods(methods: MethodTable) -> Self {
        Self {
            methods,
            ..Self::default()
        }
    }

    /// The wiring slot.
    #[must_use]
    pub fn slot_ref(&self) -> &WireSlot {
        &self.slot
    }

    /// The event emitter.
    #[must_use]
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Emit `event` to every subscribed handler. Returns the number invoked.
    pub fn emit(&self, event: &str, payload: &dyn Any) -> usize {
        self.emitter.emit(event, payload)
    }

    /// Set (or clear, with `None`) the post-wire hook.
    pub fn set_on_wire(&self, hook: Option<impl Fn() + 'static>) {
        *self.hooks.on_wire.borrow_mut() = hook.map(|f| Rc::new(f) as Hook);
    }

    /// Set (or clear, with `None`) the unwire hook.
    pub fn set_on_unwire(&self, hook: Option<impl Fn() + 'static>) {
        *self.hooks.on_unwire.borrow_mut() = hook.map(|f| Rc::new(f) as Hook);
    }

    /// Set (or clear, with `None`) the late-wire hook.
    pub fn set_on_wire_late(&self, hook: Option<impl Fn(&str) + 'static>) {
        *self.hooks.on_wire_late.borrow_mut() = hook.map(|f| Rc::new(f) as LateHook);
    }
}

impl Wireable for Component {
    fn slot(&self) -> &WireSlot {
        &self.slot
    }

    fn events(&self) -> Option<&dyn EventSource> {
        Some(&self.emitter)
    }

    fn methods(&self) -> Option<&MethodTable> {
        Some(&self.methods)
    }

    fn lifecycle(&self) -> Option<&dyn WireLifecycle> {
        Some(&self.hooks)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("slot", &self.slot)
            .field("emitter", &self.emitter)
            .field("methods", &self.methods)
            .finish()
    }
}
