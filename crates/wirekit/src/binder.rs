#![forbid(unsafe_code)]

//! Subscribes and unsubscribes declared handlers on a target's event source.
//!
//! A [`HandlerRef::Method`] is resolved against the scope's method table at
//! call time, never earlier. [`check_bindings`] runs the same resolution
//! without subscribing, so callers can validate a whole binding set before
//! touching any state.

use crate::declaration::{EventBindings, HandlerRef};
use crate::error::{Result, WireError};
use crate::object::ObjectRef;

/// Validate that every binding in `bindings` can be subscribed on `target`
/// with `scope` as callback scope.
pub fn check_bindings(
    target_name: &str,
    target: &ObjectRef,
    scope_name: &str,
    scope: &ObjectRef,
    bindings: &EventBindings,
) -> Result<()> {
    check_pairs(target_name, target, scope_name, scope, bindings.iter())
}

pub(crate) fn check_pairs<'a>(
    target_name: &str,
    target: &ObjectRef,
    scope_name: &str,
    scope: &ObjectRef,
    mut pairs: impl Iterator<Item = (&'a str, &'a HandlerRef)>,
) -> Result<()> {
    let Some((_, first)) = pairs.next() else {
        return Ok(());
    };
    if target.events().is_none() {
        return Err(WireError::NotAnEventSource {
            target: target_name.to_owned(),
            dependent: scope_name.to_owned(),
        });
    }
    for handler in std::iter::once(first).chain(pairs.map(|(_, handler)| handler)) {
        if handler.resolve(&**scope).is_none() {
            return Err(unknown_method(scope_name, handler));
        }
    }
    Ok(())
}

/// Subscribe `handler` to `event` on `target`, with `scope` as callback scope.
pub fn bind_to(
    target_name: &str,
    target: &ObjectRef,
    event: &str,
    handler: &HandlerRef,
    scope_name: &str,
    scope: &ObjectRef,
) -> Result<()> {
    let Some(source) = target.events() else {
        return Err(WireError::NotAnEventSource {
            target: target_name.to_owned(),
            dependent: scope_name.to_owned(),
        });
    };
    let Some(resolved) = handler.resolve(&**scope) else {
        return Err(unknown_method(scope_name, handler));
    };
    source.subscribe(event, resolved, scope);
    Ok(())
}

/// Remove the subscription made by [`bind_to`] with the same arguments.
///
/// Returns whether a subscription was removed. A target without an event
/// source, or a method the scope no longer exposes, removes nothing.
pub fn unbind_from(target: &ObjectRef, event: &str, handler: &HandlerRef, scope: &ObjectRef) -> bool {
    let (Some(source), Some(resolved)) = (target.events(), handler.resolve(&**scope)) else {
        return false;
    };
    source.unsubscribe(event, &resolved, scope)
}

fn unknown_method(scope_name: &str, handler: &HandlerRef) -> WireError {
    let method = match handler {
        HandlerRef::Method(name) => name.clone(),
        HandlerRef::Func(_) => String::new(),
    };
    WireError::UnknownMethod {
        scope: scope_name.to_owned(),
        method,
    }
}
