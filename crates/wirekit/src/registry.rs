#![forbid(unsafe_code)]

//! Name-keyed object storage with a parallel table of mock overrides.
//!
//! Plain storage: no wiring happens here. Lookups prefer a mock over the real
//! object registered under the same name. Iteration follows registration
//! order.

use std::rc::Rc;

use ahash::AHashMap;

use crate::object::ObjectRef;

/// Insertion-ordered `name → object` map.
#[derive(Default)]
struct NamedObjects {
    order: Vec<String>,
    entries: AHashMap<String, ObjectRef>,
}

impl NamedObjects {
    fn get(&self, name: &str) -> Option<&ObjectRef> {
        self.entries.get(name)
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn insert(&mut self, name: String, object: ObjectRef) -> Option<ObjectRef> {
        let previous = self.entries.insert(name.clone(), object);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    fn remove(&mut self, name: &str) -> Option<ObjectRef> {
        let removed = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

/// Registered objects plus mock overrides.
#[derive(Default)]
pub struct Registry {
    objects: NamedObjects,
    mocks: NamedObjects,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The object currently known by `name`: the mock if one exists,
    /// otherwise the registered object.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ObjectRef> {
        self.mocks
            .get(name)
            .or_else(|| self.objects.get(name))
            .map(Rc::clone)
    }

    /// Whether a mock or a registered object exists under `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.mocks.contains(name) || self.objects.contains(name)
    }

    /// The registered object under `name`, ignoring mocks.
    #[must_use]
    pub fn get_registered(&self, name: &str) -> Option<ObjectRef> {
        self.objects.get(name).map(Rc::clone)
    }

    /// Whether an object (not a mock) is registered under `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.objects.contains(name)
    }

    /// Store `object` under `name`. Returns `false`, storing nothing, if the
    /// name is taken.
    pub fn insert(&mut self, name: impl Into<String>, object: ObjectRef) -> bool {
        let name = name.into();
        if self.objects.contains(&name) {
            return false;
        }
        self.objects.insert(name, object);
        true
    }

    /// Remove the registered object under `name`.
    pub fn remove(&mut self, name: &str) -> Option<ObjectRef> {
        self.objects.remove(name)
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.objects.names()
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no object is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.len() == 0
    }

    /// Drop every registered object. Mocks are kept.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Install `substitute` as the mock for `name`, returning the previous
    /// mock.
    pub fn set_mock(&mut self, name: impl Into<String>, substitute: ObjectRef) -> Option<ObjectRef> {
        self.mocks.insert(name.into(), substitute)
    }

    /// Remove the mock for `name`.
    pub fn remove_mock(&mut self, name: &str) -> Option<ObjectRef> {
        self.mocks.remove(name)
    }

    /// Whether `name` is currently mocked.
    #[must_use]
    pub fn is_mocked(&self, name: &str) -> bool {
        self.mocks.contains(name)
    }

    /// Mocked names in the order the mocks were installed.
    #[must_use]
    pub fn mocked_names(&self) -> Vec<String> {
        self.mocks.names()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("objects", &self.objects.order)
            .field("mocks", &self.mocks.order)
            .finish()
    }
}
