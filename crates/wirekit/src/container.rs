#![forbid(unsafe_code)]

//! The wiring engine.
//!
//! A [`Container`] holds named objects, reads each object's dependency
//! declaration and connects dependents to their targets: it installs a
//! reference on the dependent and subscribes the declared event bindings
//! on the target, with the dependent as callback scope. A target that is
//! not registered yet is deferred to the [`LateTable`] and connected by
//! [`Container::wire_late`] once it appears. Everything `wire` installs is
//! reversible through `unwire`, using the [`TrackTable`] as cleanup index.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use wirekit::{Component, Container, DependencyMap};
//!
//! let mut container = Container::default();
//! let view = Rc::new(Component::new());
//! let db = Rc::new(Component::new());
//!
//! // `db` is not registered yet: the dependency is deferred.
//! container.add_with("view", view.clone(), &DependencyMap::new().wire("db")).unwrap();
//! container.wire_all().unwrap();
//! assert!(container.late().is_pending("db", "view"));
//!
//! container.add("db", db.clone()).unwrap();
//! container.wire_all().unwrap();
//! assert!(view.slot_ref().has_dependency("db"));
//! assert!(container.late().is_empty());
//! ```
//!
//! # Invariants
//!
//! 1. An object's wired marker, when set, is the name it was wired under.
//! 2. Every installed reference `dependent.<target>` has exactly one entry
//!    for the dependent in `track[target]`.
//! 3. `late[target][dependent]` exists only while `dependent` is wired and
//!    `target` has not been resolved since.
//! 4. Mocks shadow registered objects for every operation.
//! 5. Preconditions are checked before any state is mutated. Batch
//!    operations (`wire_all`, `unwire_all`) check every object before
//!    touching the first; `clear_mocks` is atomic per mocked name.
//! 6. Unsubscription goes to the object recorded as the bindings' event
//!    source at bind time, not to whatever the target name resolves to now.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `DuplicateName` | `add` with a registered name | Nothing stored |
//! | `NotFound` | Name neither registered nor mocked | No effect |
//! | `AlreadyWired` | Strict `wire` on a wired object | No effect (`false` when relaxed) |
//! | `NotWired` | Strict `unwire` on an unwired object | No effect (`false` when relaxed) |
//! | `WiredUnderDifferentName` | Object wired under another name | No effect, even when relaxed |
//! | `NotAnEventSource` / `UnknownMethod` | Unbindable event declaration | No effect |
//! | Any of the above from `mock` / `unmock` | Substitute or a dependent cannot be rewired | No effect, the name keeps its current object |
//!
//! # Breadth of `unwire`
//!
//! Unwiring an object drains `track[target]` for each of its targets, which
//! deletes the `target` reference from every dependent recorded there, not
//! only from the object being unwired. Event subscriptions of those other
//! dependents stay in place and are removed when those dependents are
//! unwired themselves.

use std::rc::Rc;

use crate::binder;
use crate::declaration::{Dependency, DependencyMap, EventBindings, HandlerRef};
use crate::error::{Result, WireError};
use crate::late::{LateTable, PendingBinding, PendingDependent};
use crate::object::{ObjectRef, same_object};
use crate::options::ContainerOptions;
use crate::registry::Registry;
use crate::track::TrackTable;

macro_rules! wire_trace {
    ($container:expr, $($arg:tt)+) => {
        if $container.options.verbose {
            tracing::debug!($($arg)+);
        }
    };
}

/// Result of one late-wiring pass.
#[derive(Debug, Default)]
struct LatePass {
    /// Targets whose pending dependents were all connected.
    resolved: Vec<String>,
    /// Dependents whose last pending target was connected.
    completed: Vec<String>,
}

/// Registry of named objects plus the wiring engine.
#[derive(Debug, Default)]
pub struct Container {
    options: ContainerOptions,
    registry: Registry,
    track: TrackTable,
    late: LateTable,
}

impl Container {
    /// Create an empty container.
    #[must_use]
    pub fn new(options: ContainerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The options the container was built with.
    #[must_use]
    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// The cleanup index of installed references.
    #[must_use]
    pub fn track(&self) -> &TrackTable {
        &self.track
    }

    /// Dependencies waiting for their target.
    #[must_use]
    pub fn late(&self) -> &LateTable {
        &self.late
    }

    // --- Registry ---

    /// Whether `name` is registered or mocked.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    /// The object currently known by `name`, preferring a mock.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ObjectRef> {
        self.registry.get(name)
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no object is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Whether `name` is currently mocked.
    #[must_use]
    pub fn is_mocked(&self, name: &str) -> bool {
        self.registry.is_mocked(name)
    }

    /// Register `object` under `name`.
    ///
    /// The object gets an empty declaration under the configured field if
    /// it has none.
    pub fn add(&mut self, name: impl Into<String>, object: ObjectRef) -> Result<&mut Self> {
        self.insert(name.into(), object, None)
    }

    /// Register `object` under `name` and merge `config` into its
    /// declaration (see [`DependencyMap::merge`]).
    pub fn add_with(
        &mut self,
        name: impl Into<String>,
        object: ObjectRef,
        config: &DependencyMap,
    ) -> Result<&mut Self> {
        self.insert(name.into(), object, Some(config))
    }

    fn insert(
        &mut self,
        name: String,
        object: ObjectRef,
        config: Option<&DependencyMap>,
    ) -> Result<&mut Self> {
        if self.registry.is_registered(&name) {
            return Err(WireError::DuplicateName(name));
        }
        wire_trace!(self, object = %name, "add");

        let field = &self.options.declaration_field;
        match config {
            Some(config) => object.slot().merge_declaration(field, config),
            None => object.slot().ensure_declaration(field),
        }
        self.registry.insert(name, object);
        Ok(self)
    }

    /// Unwire (relaxed) and unregister `name`.
    pub fn remove(&mut self, name: &str) -> Result<&mut Self> {
        self.unwire(name, true)?;
        wire_trace!(self, object = name, "remove");
        self.registry.remove(name);
        Ok(self)
    }

    /// Unwire everything, then drop all objects and bookkeeping.
    ///
    /// Mocks are kept.
    pub fn clear(&mut self) -> Result<()> {
        self.unwire_all()?;
        self.registry.clear();
        self.track.clear();
        self.late.clear();
        Ok(())
    }

    // --- Wiring ---

    fn declaration_of(&self, object: &ObjectRef) -> DependencyMap {
        object
            .slot()
            .declaration(&self.options.declaration_field)
            .unwrap_or_default()
    }

    /// Validate the event bindings `object` would subscribe if wired as
    /// `name`, resolving targets through `resolve`.
    fn check_declaration(
        &self,
        name: &str,
        object: &ObjectRef,
        resolve: impl Fn(&str) -> Option<ObjectRef>,
    ) -> Result<()> {
        for (target_name, dependency) in self.declaration_of(object).iter() {
            if let (Some(target), Some(bindings)) = (resolve(target_name), dependency.bindings()) {
                binder::check_bindings(target_name, &target, name, object, bindings)?;
            }
        }
        Ok(())
    }

    /// Connect `name` to every target it declares.
    ///
    /// Missing targets are deferred to the late table. Returns `true` when
    /// every dependency was connected, `false` when at least one was
    /// deferred, or when `relaxed` and the object was already wired.
    pub fn wire(&mut self, name: &str, relaxed: bool) -> Result<bool> {
        let object = self.lookup(name)?;
        if object.slot().is_wired() {
            if relaxed {
                return Ok(false);
            }
            return Err(WireError::AlreadyWired(name.to_owned()));
        }

        self.check_declaration(name, &object, |target| self.get(target))?;

        let declaration = self.declaration_of(&object);
        object.slot().set_wired(Some(name.to_owned()));
        let mut complete = true;
        for (target_name, dependency) in declaration.iter() {
            let Some(target) = self.get(target_name) else {
                wire_trace!(self, object = name, to = target_name, "wire deferred");
                let pending = self.late.defer(target_name, name);
                for (event, handler) in dependency.bindings().into_iter().flat_map(|b| b.iter()) {
                    pending.push_back(PendingBinding {
                        event: event.to_owned(),
                        handler: handler.clone(),
                    });
                }
                complete = false;
                continue;
            };

            wire_trace!(self, object = name, to = target_name, "wire");
            let bindings = dependency.bindings().into_iter().flat_map(|b| b.iter());
            self.connect(target_name, &target, name, &object, bindings)?;
        }
        Ok(complete)
    }

    fn connect<'a>(
        &mut self,
        target_name: &str,
        target: &ObjectRef,
        name: &str,
        object: &ObjectRef,
        bindings: impl Iterator<Item = (&'a str, &'a HandlerRef)>,
    ) -> Result<()> {
        object.slot().set_dependency(target_name, Rc::clone(target));
        self.track.record(target_name, object);
        let mut bound = false;
        for (event, handler) in bindings {
            wire_trace!(self, object = name, to = target_name, event, "bind");
            binder::bind_to(target_name, target, event, handler, name, object)?;
            bound = true;
        }
        if bound {
            object.slot().set_event_source(target_name, Rc::clone(target));
        }
        Ok(())
    }

    /// Disconnect `name` from its targets.
    ///
    /// Drains `track[target]` for every declared target (see the module
    /// docs on breadth), unsubscribes the declared event bindings from the
    /// object they were subscribed on, even if `target` was removed or now
    /// resolves to another object, drops
    /// late-wiring entries involving `name`, runs the unwire hook and clears
    /// the wired marker. Returns `false` only when `relaxed` and the object
    /// was not wired.
    pub fn unwire(&mut self, name: &str, relaxed: bool) -> Result<bool> {
        let object = self.lookup(name)?;
        let Some(wired_as) = object.slot().wired_as() else {
            if relaxed {
                return Ok(false);
            }
            return Err(WireError::NotWired(name.to_owned()));
        };
        if wired_as != name {
            return Err(WireError::WiredUnderDifferentName {
                name: name.to_owned(),
                wired_as,
            });
        }

        let declaration = self.declaration_of(&object);
        for (target_name, dependency) in declaration.iter() {
            for dependent in self.track.drain(target_name) {
                wire_trace!(self, object = name, to = target_name, "unwire reference");
                dependent.slot().remove_dependency(target_name);
            }

            let Some(source) = object.slot().take_event_source(target_name) else {
                continue;
            };
            for (event, handler) in dependency.bindings().into_iter().flat_map(|b| b.iter()) {
                wire_trace!(self, object = name, to = target_name, event, "unbind");
                binder::unbind_from(&source, event, handler, &object);
            }
        }

        self.late.forget_target(name);
        self.late.forget_dependent(name);

        if let Some(lifecycle) = object.lifecycle() {
            lifecycle.on_unwire();
        }
        object.slot().set_wired(None);
        wire_trace!(self, object = name, "unwired");
        Ok(true)
    }

    /// Connect deferred dependencies whose target is now available.
    ///
    /// Returns the targets resolved in this pass, in the order they were
    /// first deferred.
    pub fn wire_late(&mut self) -> Result<Vec<String>> {
        Ok(self.resolve_late()?.resolved)
    }

    fn late_ready(&self) -> Vec<(String, ObjectRef)> {
        self.late
            .targets()
            .into_iter()
            .filter_map(|target_name| self.get(&target_name).map(|target| (target_name, target)))
            .collect()
    }

    fn check_late(&self, ready: &[(String, ObjectRef)]) -> Result<()> {
        for (target_name, target) in ready {
            for pending in self.late.dependents(target_name).unwrap_or_default() {
                let Some(object) = self.get(&pending.name) else {
                    continue;
                };
                let bindings = pending
                    .bindings
                    .iter()
                    .map(|b| (b.event.as_str(), &b.handler));
                binder::check_pairs(target_name, target, &pending.name, &object, bindings)?;
            }
        }
        Ok(())
    }

    fn resolve_late(&mut self) -> Result<LatePass> {
        let ready = self.late_ready();
        self.check_late(&ready)?;

        let mut pass = LatePass::default();
        let mut touched: Vec<String> = Vec::new();
        for (target_name, target) in ready {
            for PendingDependent { name, bindings } in self.late.take_target(&target_name) {
                let Some(object) = self.get(&name) else {
                    continue;
                };
                wire_trace!(self, object = %name, to = %target_name, "wire late");
                let pairs = bindings.iter().map(|b| (b.event.as_str(), &b.handler));
                self.connect(&target_name, &target, &name, &object, pairs)?;
                if let Some(lifecycle) = object.lifecycle() {
                    lifecycle.on_wire_late(&target_name);
                }
                if !touched.contains(&name) {
                    touched.push(name);
                }
            }
            pass.resolved.push(target_name);
        }
        pass.completed = touched
            .into_iter()
            .filter(|name| !self.late.waits(name))
            .collect();
        Ok(pass)
    }

    /// Wire every registered object (relaxed), resolve late dependencies,
    /// then run the post-wire hook of every object that became fully
    /// connected in this pass. Each hook runs at most once per call.
    ///
    /// A target resolved by the late pass is notified only if it is not
    /// waiting for a target of its own. The bindings of every unwired object
    /// and of every pending late dependency are checked before anything is
    /// wired, so an error leaves the container untouched.
    pub fn wire_all(&mut self) -> Result<()> {
        let names = self.registry.names();
        for name in &names {
            let Some(object) = self.get(name) else {
                continue;
            };
            if !object.slot().is_wired() {
                self.check_declaration(name, &object, |target| self.get(target))?;
            }
        }
        self.check_late(&self.late_ready())?;

        let mut ready = Vec::new();
        for name in names {
            if self.wire(&name, true)? {
                ready.push(name);
            }
        }
        let pass = self.resolve_late()?;
        let late = &self.late;
        ready.extend(pass.resolved.into_iter().filter(|target| !late.waits(target)));
        ready.extend(pass.completed);

        let mut notified: Vec<String> = Vec::with_capacity(ready.len());
        for name in ready {
            if notified.contains(&name) {
                continue;
            }
            if let Some(object) = self.get(&name) {
                if let Some(lifecycle) = object.lifecycle() {
                    lifecycle.on_wire();
                }
            }
            notified.push(name);
        }
        Ok(())
    }

    /// Unwire every registered object (relaxed), then run the unwire hook
    /// again for every object that was actually unwired.
    ///
    /// An object wired under a name other than the one it is registered
    /// under fails the call before anything is unwired, unless a name it is
    /// also registered under comes first and unwires it.
    pub fn unwire_all(&mut self) -> Result<()> {
        let names = self.registry.names();
        let mut leaving: Vec<ObjectRef> = Vec::new();
        for name in &names {
            let Some(object) = self.get(name) else {
                continue;
            };
            let Some(wired_as) = object.slot().wired_as() else {
                continue;
            };
            if leaving.iter().any(|gone| same_object(&**gone, &*object)) {
                continue;
            }
            if wired_as != *name {
                return Err(WireError::WiredUnderDifferentName {
                    name: name.clone(),
                    wired_as,
                });
            }
            leaving.push(object);
        }

        let mut unwired = Vec::new();
        for name in names {
            if self.unwire(&name, true)? {
                unwired.push(name);
            }
        }
        for name in unwired {
            if let Some(object) = self.get(&name) {
                if let Some(lifecycle) = object.lifecycle() {
                    lifecycle.on_unwire();
                }
            }
        }
        Ok(())
    }

    // --- Mocking ---

    /// Substitute `substitute` for the object known as `name`.
    ///
    /// The current object is unwired (strict), the substitute installed and
    /// wired (strict), and every dependent holding a reference to `name` is
    /// repointed at the substitute, moving its event bindings along. Fails
    /// without any effect if the substitute or one of those dependents could
    /// not be rewired.
    pub fn mock(&mut self, name: &str, substitute: ObjectRef) -> Result<&mut Self> {
        let previous = self.lookup(name)?;
        self.check_swap(name, &previous, &substitute)?;
        self.unwire(name, false)?;

        wire_trace!(self, object = name, "mock");
        substitute
            .slot()
            .ensure_declaration(&self.options.declaration_field);
        self.registry.set_mock(name, Rc::clone(&substitute));
        self.wire(name, false)?;
        self.retarget(name, &previous, &substitute)?;
        Ok(self)
    }

    /// Remove the mock for `name`, restoring the registered object and
    /// repointing dependents back at it.
    ///
    /// On a name that is not mocked this rewires the registered object in
    /// place. Fails without any effect if the registered object is gone or
    /// could not be rewired.
    pub fn unmock(&mut self, name: &str) -> Result<&mut Self> {
        let previous = self.lookup(name)?;
        let restored = if self.registry.is_mocked(name) {
            self.registry
                .get_registered(name)
                .ok_or_else(|| WireError::NotFound(name.to_owned()))?
        } else {
            Rc::clone(&previous)
        };
        self.check_swap(name, &previous, &restored)?;
        self.unwire(name, false)?;

        wire_trace!(self, object = name, "unmock");
        self.registry.remove_mock(name);
        self.wire(name, false)?;
        self.retarget(name, &previous, &restored)?;
        Ok(self)
    }

    /// Unmock every mocked name.
    ///
    /// Stops at the first name that fails; mocks removed before it stay
    /// removed.
    pub fn clear_mocks(&mut self) -> Result<()> {
        for name in self.registry.mocked_names() {
            self.unmock(&name)?;
        }
        Ok(())
    }

    /// Everything that can fail when `next` replaces the wired `previous`
    /// under `name`: the wired-state contract, the bindings `next` declares
    /// and the bindings of every dependent that would be repointed.
    fn check_swap(&self, name: &str, previous: &ObjectRef, next: &ObjectRef) -> Result<()> {
        match previous.slot().wired_as() {
            None => return Err(WireError::NotWired(name.to_owned())),
            Some(wired_as) if wired_as != name => {
                return Err(WireError::WiredUnderDifferentName {
                    name: name.to_owned(),
                    wired_as,
                });
            }
            Some(_) => {}
        }
        if next.slot().is_wired() && !same_object(&**next, &**previous) {
            return Err(WireError::AlreadyWired(name.to_owned()));
        }

        self.check_declaration(name, next, |target| {
            if target == name {
                Some(Rc::clone(next))
            } else {
                self.get(target)
            }
        })?;
        // Unwiring an object that depends on its own name drains track[name].
        if !self.declaration_of(previous).contains(name) {
            self.plan_retarget(name, next)?;
        }
        Ok(())
    }

    /// Repoint every dependent tracked under `name` from `previous` to
    /// `current`, moving its declared event bindings.
    fn retarget(&mut self, name: &str, previous: &ObjectRef, current: &ObjectRef) -> Result<()> {
        if same_object(&**previous, &**current) {
            return Ok(());
        }

        for (dependent, scope_name, bindings) in self.plan_retarget(name, current)? {
            wire_trace!(self, object = %scope_name, to = name, "retarget");
            if let Some(source) = dependent.slot().take_event_source(name) {
                for (event, handler) in bindings.iter() {
                    binder::unbind_from(&source, event, handler, &dependent);
                }
            }
            dependent.slot().set_dependency(name, Rc::clone(current));
            for (event, handler) in bindings.iter() {
                binder::bind_to(name, current, event, handler, &scope_name, &dependent)?;
            }
            if !bindings.is_empty() {
                dependent.slot().set_event_source(name, Rc::clone(current));
            }
        }
        Ok(())
    }

    /// Dependents tracked under `name` that do not point at `current` yet,
    /// with their scope names and declared bindings, all checked against
    /// `current`.
    fn plan_retarget(
        &self,
        name: &str,
        current: &ObjectRef,
    ) -> Result<Vec<(ObjectRef, String, EventBindings)>> {
        let mut moves = Vec::new();
        for dependent in self.track.dependents(name) {
            let already_current = dependent
                .slot()
                .dependency(name)
                .is_some_and(|held| same_object(&*held, &**current));
            if already_current {
                continue;
            }
            let scope_name = dependent.slot().wired_as().unwrap_or_default();
            let bindings = self
                .declaration_of(dependent)
                .get(name)
                .and_then(Dependency::bindings)
                .cloned()
                .unwrap_or_default();
            binder::check_bindings(name, current, &scope_name, dependent, &bindings)?;
            moves.push((Rc::clone(dependent), scope_name, bindings));
        }
        Ok(moves)
    }

    fn lookup(&self, name: &str) -> Result<ObjectRef> {
        self.get(name)
            .ok_or_else(|| WireError::NotFound(name.to_owned()))
    }
}
