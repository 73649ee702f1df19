#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wirekit::{Component, Container, DependencyMap, HandlerRef, MethodTable, handler_fn};

const NAMES: u8 = 6;
const MAX_OPS: usize = 64;

#[derive(Arbitrary, Debug)]
enum Op {
    Add { name: u8, deps: Vec<(u8, Binding)> },
    Remove(u8),
    Wire { name: u8, relaxed: bool },
    Unwire { name: u8, relaxed: bool },
    WireLate,
    WireAll,
    UnwireAll,
    Mock(u8),
    Unmock(u8),
    ClearMocks,
    Emit(u8),
    Clear,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum Binding {
    WireOnly,
    Func,
    Method,
    UnknownMethod,
}

fn name(raw: u8) -> String {
    format!("n{}", raw % NAMES)
}

fn component() -> Rc<Component> {
    let methods = MethodTable::new().with("on_ping", handler_fn(|_, _| {}));
    Rc::new(Component::with_methods(methods))
}

fn declaration(deps: &[(u8, Binding)]) -> DependencyMap {
    let ping = handler_fn(|_, _| {});
    deps.iter().fold(DependencyMap::new(), |map, &(target, binding)| {
        let target = name(target);
        match binding {
            Binding::WireOnly => map.wire(target),
            Binding::Func => map.on(target, "ping", HandlerRef::Func(Rc::clone(&ping))),
            Binding::Method => map.on(target, "ping", "on_ping"),
            Binding::UnknownMethod => map.on(target, "ping", "missing"),
        }
    })
}

fn check(container: &Container) {
    for index in 0..NAMES {
        let target = name(index);
        for dependent in container.track().dependents(&target) {
            assert!(
                dependent.slot().has_dependency(&target),
                "tracked dependent lost its reference to {target}"
            );
        }
    }
    for target in container.late().targets() {
        for pending in container.late().dependents(&target).unwrap_or_default() {
            let waiting = container.get(&pending.name);
            assert!(
                waiting.is_some_and(|object| object.slot().is_wired()),
                "{} waits on {target} without being wired",
                pending.name
            );
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut container = Container::default();
    for op in ops.into_iter().take(MAX_OPS) {
        match op {
            Op::Add { name: raw, deps } => {
                let _ = container.add_with(name(raw), component(), &declaration(&deps));
            }
            Op::Remove(raw) => {
                let _ = container.remove(&name(raw));
            }
            Op::Wire { name: raw, relaxed } => {
                let _ = container.wire(&name(raw), relaxed);
            }
            Op::Unwire { name: raw, relaxed } => {
                let _ = container.unwire(&name(raw), relaxed);
            }
            Op::WireLate => {
                let _ = container.wire_late();
            }
            Op::WireAll => {
                let _ = container.wire_all();
            }
            Op::UnwireAll => {
                let _ = container.unwire_all();
            }
            Op::Mock(raw) => {
                let _ = container.mock(&name(raw), component());
            }
            Op::Unmock(raw) => {
                let _ = container.unmock(&name(raw));
            }
            Op::ClearMocks => {
                let _ = container.clear_mocks();
            }
            Op::Emit(raw) => {
                if let Some(object) = container.get(&name(raw)) {
                    if let Some(events) = object.downcast_ref::<Component>() {
                        events.emit("ping", &());
                    }
                }
            }
            Op::Clear => {
                let _ = container.clear();
            }
        }
        check(&container);
    }
});
