#![forbid(unsafe_code)]

//! Dependency declarations: which named targets an object depends on, and
//! which events on each target it wants bound to handlers.
//!
//! A [`DependencyMap`] keeps targets in declaration order, and
//! [`EventBindings`] keeps events in declaration order. `wire` processes
//! targets in that order and subscribes events in that order.
//!
//! # Serde
//!
//! A map deserializes from any self-describing format in document order:
//!
//! ```
//! use wirekit::declaration::{Dependency, DependencyMap};
//!
//! let map = DependencyMap::from_json(r#"{
//!     "store": true,
//!     "clock": { "tick": "on_tick", "stop": "on_stop" }
//! }"#).unwrap();
//!
//! assert_eq!(map.targets(), vec!["store", "clock"]);
//! assert!(matches!(map.get("store"), Some(Dependency::WireOnly)));
//! ```

use std::fmt;
use std::rc::Rc;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

use crate::emitter::Handler;
use crate::object::Wireable;

/// A handler: a function value, or the name of a method resolved against
/// the callback scope at bind time.
#[derive(Clone)]
pub enum HandlerRef {
    /// A handler value.
    Func(Handler),
    /// A method name looked up in the scope's method table.
    Method(String),
}

impl HandlerRef {
    /// Reference a method by name.
    #[must_use]
    pub fn method(name: impl Into<String>) -> Self {
        Self::Method(name.into())
    }

    /// Resolve to a concrete handler with `scope` as the callback scope.
    ///
    /// Returns `None` when a method name is not exposed by `scope`.
    #[must_use]
    pub fn resolve(&self, scope: &dyn Wireable) -> Option<Handler> {
        match self {
            Self::Func(handler) => Some(Rc::clone(handler)),
            Self::Method(name) => scope.methods().and_then(|table| table.get(name)),
        }
    }
}

impl From<Handler> for HandlerRef {
    fn from(handler: Handler) -> Self {
        Self::Func(handler)
    }
}

impl From<&str> for HandlerRef {
    fn from(name: &str) -> Self {
        Self::Method(name.to_owned())
    }
}

impl From<String> for HandlerRef {
    fn from(name: String) -> Self {
        Self::Method(name)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Func(handler) => write!(f, "Func({:p})", Rc::as_ptr(handler).cast::<()>()),
            Self::Method(name) => f.debug_tuple("Method").field(name).finish(),
        }
    }
}

/// Ordered `event → handler` bindings for one target.
#[derive(Clone, Debug, Default)]
pub struct EventBindings {
    entries: Vec<(String, HandlerRef)>,
}

impl EventBindings {
    /// Create an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: bind `event` to `handler`, replacing an earlier binding of
    /// the same event.
    #[must_use]
    pub fn on(mut self, event: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        let event = event.into();
        let handler = handler.into();
        match self.entries.iter_mut().find(|(name, _)| *name == event) {
            Some((_, slot)) => *slot = handler,
            None => self.entries.push((event, handler)),
        }
        self
    }

    /// Add a binding unless `event` is already bound. Returns whether the
    /// binding was added.
    pub fn insert_if_absent(&mut self, event: &str, handler: &HandlerRef) -> bool {
        if self.contains(event) {
            return false;
        }
        self.entries.push((event.to_owned(), handler.clone()));
        true
    }

    /// The handler bound to `event`.
    #[must_use]
    pub fn get(&self, event: &str) -> Option<&HandlerRef> {
        self.entries
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, handler)| handler)
    }

    /// Whether `event` is bound.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.get(event).is_some()
    }

    /// Iterate `(event, handler)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HandlerRef)> {
        self.entries
            .iter()
            .map(|(event, handler)| (event.as_str(), handler))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What an object wants from one target.
#[derive(Clone, Debug)]
pub enum Dependency {
    /// Install the reference only.
    WireOnly,
    /// Install the reference and subscribe these event bindings.
    Events(EventBindings),
}

impl Dependency {
    /// The event bindings, if any.
    #[must_use]
    pub fn bindings(&self) -> Option<&EventBindings> {
        match self {
            Self::WireOnly => None,
            Self::Events(bindings) => Some(bindings),
        }
    }
}

/// Ordered `target → dependency` declaration of one object.
#[derive(Clone, Debug, Default)]
pub struct DependencyMap {
    entries: Vec<(String, Dependency)>,
}

impl DependencyMap {
    /// Create an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration from JSON (see the module docs for the shape).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Builder: depend on `target` for its reference only.
    #[must_use]
    pub fn wire(mut self, target: impl Into<String>) -> Self {
        self.insert(target, Dependency::WireOnly);
        self
    }

    /// Builder: depend on `target` and bind `event` on it to `handler`.
    ///
    /// Turns a wire-only entry for `target` into an event entry.
    #[must_use]
    pub fn on(
        mut self,
        target: impl Into<String>,
        event: impl Into<String>,
        handler: impl Into<HandlerRef>,
    ) -> Self {
        let target = target.into();
        let bindings = match self.get(&target) {
            Some(Dependency::Events(existing)) => existing.clone(),
            _ => EventBindings::new(),
        };
        self.insert(target, Dependency::Events(bindings.on(event, handler)));
        self
    }

    /// Set the dependency for `target`, keeping its position if present.
    pub fn insert(&mut self, target: impl Into<String>, dependency: Dependency) {
        let target = target.into();
        match self.entries.iter_mut().find(|(name, _)| *name == target) {
            Some((_, slot)) => *slot = dependency,
            None => self.entries.push((target, dependency)),
        }
    }

    /// The dependency declared for `target`.
    #[must_use]
    pub fn get(&self, target: &str) -> Option<&Dependency> {
        self.entries
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, dependency)| dependency)
    }

    /// Whether `target` is declared.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.get(target).is_some()
    }

    /// Iterate `(target, dependency)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dependency)> {
        self.entries
            .iter()
            .map(|(target, dependency)| (target.as_str(), dependency))
    }

    /// Declared target names in order.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of declared targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `incoming` into this declaration, additively.
    ///
    /// - a target already declared wire-only is left as is;
    /// - a target already declared with events gains only the events it
    ///   does not bind yet; existing bindings are kept;
    /// - an undeclared target is copied verbatim.
    pub fn merge(&mut self, incoming: &DependencyMap) {
        for (target, dependency) in incoming.iter() {
            let Some(index) = self.entries.iter().position(|(name, _)| name == target) else {
                self.entries.push((target.to_owned(), dependency.clone()));
                continue;
            };
            if let (Dependency::Events(existing), Dependency::Events(added)) =
                (&mut self.entries[index].1, dependency)
            {
                for (event, handler) in added.iter() {
                    existing.insert_if_absent(event, handler);
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for DependencyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = DependencyMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of target names to `true` or event bindings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = DependencyMap::new();
                while let Some((target, dependency)) = access.next_entry::<String, Dependency>()? {
                    if map.contains(&target) {
                        return Err(de::Error::custom(format_args!(
                            "duplicate target `{target}`"
                        )));
                    }
                    map.entries.push((target, dependency));
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

impl<'de> Deserialize<'de> for Dependency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DependencyVisitor;

        impl<'de> Visitor<'de> for DependencyVisitor {
            type Value = Dependency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("`true` or a map of event names to method names")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
                if value {
                    Ok(Dependency::WireOnly)
                } else {
                    Err(E::invalid_value(de::Unexpected::Bool(false), &self))
                }
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut bindings = EventBindings::new();
                while let Some((event, method)) = access.next_entry::<String, String>()? {
                    if bindings.contains(&event) {
                        return Err(de::Error::custom(format_args!(
                            "duplicate event `{event}`"
                        )));
                    }
                    bindings.entries.push((event, HandlerRef::Method(method)));
                }
                Ok(Dependency::Events(bindings))
            }
        }

        deserializer.deserialize_any(DependencyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::handler_fn;

    fn method_name(handler: &HandlerRef) -> &str {
        match handler {
            HandlerRef::Method(name) => name,
            HandlerRef::Func(_) => panic!("expected a method handler"),
        }
    }

    #[test]
    fn builder_keeps_declaration_order() {
        let map = DependencyMap::new()
            .wire("c")
            .on("a", "fire", "on_fire")
            .wire("b");
        assert_eq!(map.targets(), vec!["c", "a", "b"]);
    }

    #[test]
    fn on_upgrades_wire_only_in_place() {
        let map = DependencyMap::new()
            .wire("a")
            .wire("b")
            .on("a", "fire", "on_fire");
        assert_eq!(map.targets(), vec!["a", "b"]);
        let bindings = map.get("a").and_then(Dependency::bindings).unwrap();
        assert_eq!(method_name(bindings.get("fire").unwrap()), "on_fire");
    }

    #[test]
    fn merge_leaves_wire_only_untouched() {
        let mut map = DependencyMap::new().wire("a");
        map.merge(&DependencyMap::new().on("a", "fire", "on_fire"));
        assert!(matches!(map.get("a"), Some(Dependency::WireOnly)));
    }

    #[test]
    fn merge_adds_events_without_overwriting() {
        let mut map = DependencyMap::new().on("a", "fire", "first");
        map.merge(
            &DependencyMap::new()
                .on("a", "fire", "second")
                .on("a", "stop", "on_stop"),
        );
        let bindings = map.get("a").and_then(Dependency::bindings).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(method_name(bindings.get("fire").unwrap()), "first");
        assert_eq!(method_name(bindings.get("stop").unwrap()), "on_stop");
    }

    #[test]
    fn merge_keeps_events_when_incoming_is_wire_only() {
        let mut map = DependencyMap::new().on("a", "fire", "on_fire");
        map.merge(&DependencyMap::new().wire("a"));
        assert!(map.get("a").and_then(Dependency::bindings).is_some());
    }

    #[test]
    fn merge_copies_new_targets() {
        let handler = handler_fn(|_, _| {});
        let mut map = DependencyMap::new().wire("a");
        map.merge(&DependencyMap::new().on("b", "fire", handler));
        assert_eq!(map.targets(), vec!["a", "b"]);
        let bindings = map.get("b").and_then(Dependency::bindings).unwrap();
        assert!(matches!(bindings.get("fire"), Some(HandlerRef::Func(_))));
    }

    #[test]
    fn json_preserves_document_order() {
        let map = DependencyMap::from_json(
            r#"{"zeta": true, "alpha": {"b": "on_b", "a": "on_a"}, "mid": {}}"#,
        )
        .unwrap();
        assert_eq!(map.targets(), vec!["zeta", "alpha", "mid"]);
        let alpha = map.get("alpha").and_then(Dependency::bindings).unwrap();
        let events: Vec<&str> = alpha.iter().map(|(event, _)| event).collect();
        assert_eq!(events, vec!["b", "a"]);
        assert!(map.get("mid").and_then(Dependency::bindings).unwrap().is_empty());
    }

    #[test]
    fn json_rejects_false_and_scalars() {
        assert!(DependencyMap::from_json(r#"{"a": false}"#).is_err());
        assert!(DependencyMap::from_json(r#"{"a": 3}"#).is_err());
        assert!(DependencyMap::from_json(r#"{"a": {"fire": 1}}"#).is_err());
        assert!(DependencyMap::from_json(r#"[]"#).is_err());
    }

    #[test]
    fn json_rejects_duplicate_targets() {
        let err = DependencyMap::from_json(r#"{"a": true, "a": true}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate target"));
    }
}
