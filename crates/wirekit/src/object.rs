#![forbid(unsafe_code)]

//! The participant side of wiring: what an object must expose to be held in
//! a [`Container`](crate::Container).
//!
//! # Architecture
//!
//! Objects are shared as [`ObjectRef`] (`Rc<dyn Wireable>`). All state the
//! engine installs on an object lives in its [`WireSlot`], which uses a
//! `RefCell` so the engine can mutate it through a shared handle:
//!
//! - declarations, keyed by declaration-field name;
//! - the wired marker (the name the object is currently wired under);
//! - reference properties, one per successfully wired target;
//! - event sources, the object each target's bindings were subscribed on.
//!
//! Optional capabilities (event source, method table, lifecycle hooks) are
//! exposed through `Option`-returning trait methods with `None` defaults, so
//! an object opts in by overriding a single method.
//!
//! # Invariants
//!
//! 1. A `WireSlot` never holds two references under the same target name.
//! 2. No `RefCell` borrow of a slot is held while user code (hooks, handlers)
//!    runs.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::declaration::DependencyMap;
use crate::emitter::{EventSource, Handler};

/// Shared handle to a participating object.
pub type ObjectRef = Rc<dyn Wireable>;

/// Upcast to `&dyn Any`, implemented for every `'static` type.
pub trait AsAny: Any {
    /// Borrow `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An object that can be registered in and wired by a container.
pub trait Wireable: AsAny {
    /// Engine-managed wiring state.
    fn slot(&self) -> &WireSlot;

    /// Event source used when this object is the target of event bindings.
    fn events(&self) -> Option<&dyn EventSource> {
        None
    }

    /// Named handlers used to resolve method handlers with this object as
    /// the callback scope.
    fn methods(&self) -> Option<&MethodTable> {
        None
    }

    /// Lifecycle hooks invoked by the engine.
    fn lifecycle(&self) -> Option<&dyn WireLifecycle> {
        None
    }
}

impl dyn Wireable {
    /// Downcast to the concrete object type.
    #[must_use]
    pub fn downcast_ref<T: Wireable>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// The reference installed for `target`, if wired.
    #[must_use]
    pub fn dependency(&self, target: &str) -> Option<ObjectRef> {
        self.slot().dependency(target)
    }

    /// The name this object is currently wired under.
    #[must_use]
    pub fn wired_as(&self) -> Option<String> {
        self.slot().wired_as()
    }
}

impl fmt::Debug for dyn Wireable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wireable")
            .field("wired_as", &self.slot().wired_as())
            .field("dependencies", &self.slot().dependency_names())
            .finish()
    }
}

/// Whether `a` and `b` are the same object (address identity).
#[must_use]
pub fn same_object(a: &dyn Wireable, b: &dyn Wireable) -> bool {
    std::ptr::addr_eq(a, b)
}

/// Lifecycle hooks. Every hook defaults to a no-op.
pub trait WireLifecycle {
    /// The object and everything it depends on are now connected.
    fn on_wire(&self) {}

    /// The object has been unwired.
    fn on_unwire(&self) {}

    /// A dependency that was missing at wire time has now been connected.
    fn on_wire_late(&self, _target: &str) {}
}

/// Name → handler lookup for method handlers.
///
/// `get` hands out clones of the stored `Rc`, so the same name always
/// resolves to the same handler identity. Unsubscribing relies on that.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: AHashMap<String, Handler>,
}

impl MethodTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, handler: Handler) {
        self.methods.insert(name.into(), handler);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.insert(name, handler);
        self
    }

    /// Look up a method by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Handler> {
        self.methods.get(name).cloned()
    }

    /// Whether a method with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("MethodTable").field("methods", &names).finish()
    }
}

#[derive(Default)]
struct SlotState {
    declarations: AHashMap<String, DependencyMap>,
    wired: Option<String>,
    references: Vec<(String, ObjectRef)>,
    sources: Vec<(String, ObjectRef)>,
}

/// Per-object wiring state, installed and removed by the engine.
#[derive(Default)]
pub struct WireSlot {
    state: RefCell<SlotState>,
}

impl WireSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot that already declares `map` under `field`.
    #[must_use]
    pub fn with_declaration(field: impl Into<String>, map: DependencyMap) -> Self {
        let slot = Self::new();
        slot.declare(field, map);
        slot
    }

    /// Replace the declaration stored under `field`.
    pub fn declare(&self, field: impl Into<String>, map: DependencyMap) {
        self.state.borrow_mut().declarations.insert(field.into(), map);
    }

    /// A copy of the declaration stored under `field`.
    #[must_use]
    pub fn declaration(&self, field: &str) -> Option<DependencyMap> {
        self.state.borrow().declarations.get(field).cloned()
    }

    pub(crate) fn ensure_declaration(&self, field: &str) {
        self.state
            .borrow_mut()
            .declarations
            .entry(field.to_owned())
            .or_default();
    }

    pub(crate) fn merge_declaration(&self, field: &str, incoming: &DependencyMap) {
        self.state
            .borrow_mut()
            .declarations
            .entry(field.to_owned())
            .or_default()
            .merge(incoming);
    }

    /// The name the object is wired under, if any.
    #[must_use]
    pub fn wired_as(&self) -> Option<String> {
        self.state.borrow().wired.clone()
    }

    /// Whether the object carries a wired marker.
    #[must_use]
    pub fn is_wired(&self) -> bool {
        self.state.borrow().wired.is_some()
    }

    pub(crate) fn set_wired(&self, name: Option<String>) {
        self.state.borrow_mut().wired = name;
    }

    /// The reference installed for `target`.
    #[must_use]
    pub fn dependency(&self, target: &str) -> Option<ObjectRef> {
        self.state
            .borrow()
            .references
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, object)| Rc::clone(object))
    }

    /// Whether a reference is installed for `target`.
    #[must_use]
    pub fn has_dependency(&self, target: &str) -> bool {
        self.state
            .borrow()
            .references
            .iter()
            .any(|(name, _)| name == target)
    }

    /// Names of installed references, in installation order.
    #[must_use]
    pub fn dependency_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .references
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn set_dependency(&self, target: &str, object: ObjectRef) {
        let previous = {
            let mut state = self.state.borrow_mut();
            match state.references.iter_mut().find(|(name, _)| name == target) {
                Some((_, slot)) => Some(std::mem::replace(slot, object)),
                None => {
                    state.references.push((target.to_owned(), object));
                    None
                }
            }
        };
        drop(previous);
    }

    pub(crate) fn remove_dependency(&self, target: &str) -> Option<ObjectRef> {
        let mut state = self.state.borrow_mut();
        let index = state.references.iter().position(|(name, _)| name == target)?;
        Some(state.references.remove(index).1)
    }

    /// The object the bindings declared for `target` are subscribed on.
    ///
    /// Outlives the reference property: it stays until the bindings are
    /// unsubscribed, even if `target` was drained or no longer resolves.
    #[must_use]
    pub fn event_source(&self, target: &str) -> Option<ObjectRef> {
        self.state
            .borrow()
            .sources
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, object)| Rc::clone(object))
    }

    pub(crate) fn set_event_source(&self, target: &str, object: ObjectRef) {
        let previous = {
            let mut state = self.state.borrow_mut();
            match state.sources.iter_mut().find(|(name, _)| name == target) {
                Some((_, slot)) => Some(std::mem::replace(slot, object)),
                None => {
                    state.sources.push((target.to_owned(), object));
                    None
                }
            }
        };
        drop(previous);
    }

    pub(crate) fn take_event_source(&self, target: &str) -> Option<ObjectRef> {
        let mut state = self.state.borrow_mut();
        let index = state.sources.iter().position(|(name, _)| name == target)?;
        Some(state.sources.remove(index).1)
    }
}

impl fmt::Debug for WireSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WireSlot")
            .field("wired", &state.wired)
            .field(
                "sources",
                &state
                    .sources
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("declarations", &state.declarations.len())
            .field(
                "references",
                &state
                    .references
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
