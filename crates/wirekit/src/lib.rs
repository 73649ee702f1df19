#![forbid(unsafe_code)]

//! Runtime object wiring for single-threaded applications.
//!
//! This crate provides:
//! - [`Container`], a registry of named objects that connects each object to
//!   the targets it declares, deferring targets that are not registered yet
//! - [`DependencyMap`] declarations, written in code or parsed from JSON
//! - [`EventEmitter`] and the [`EventSource`] seam for event bindings
//! - [`Component`], a ready-made participant with every capability enabled
//!
//! Objects are `Rc<dyn Wireable>`; the engine keeps all of its per-object
//! state in the object's [`WireSlot`].

pub mod binder;
pub mod component;
pub mod container;
pub mod declaration;
pub mod emitter;
pub mod error;
pub mod late;
pub mod object;
pub mod options;
pub mod registry;
pub mod track;

pub use component::{Component, LifecycleHooks};
pub use container::Container;
pub use declaration::{Dependency, DependencyMap, EventBindings, HandlerRef};
pub use emitter::{EventEmitter, EventSource, Handler, handler, handler_fn, same_handler};
pub use error::{Result, WireError};
pub use late::{LateTable, PendingBinding, PendingDependent};
pub use object::{AsAny, MethodTable, ObjectRef, WireLifecycle, WireSlot, Wireable, same_object};
pub use options::{ContainerOptions, DEFAULT_DECLARATION_FIELD};
pub use registry::Registry;
pub use track::TrackTable;
