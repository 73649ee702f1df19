use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wirekit::{Component, Container, DependencyMap, MethodTable, WireError, handler};

fn component() -> Rc<Component> {
    Rc::new(Component::new())
}

fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    (count, move || c.set(c.get() + 1))
}

#[test]
fn missing_target_is_deferred_then_resolved() {
    let mut c = Container::default();
    let a = component();
    let late_targets = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&late_targets);
    a.set_on_wire_late(Some(move |target: &str| seen.borrow_mut().push(target.to_owned())));
    let (wired, on_wire) = counter();
    a.set_on_wire(Some(on_wire));

    c.add_with("A", a.clone(), &DependencyMap::new().wire("B"))
        .unwrap();
    c.wire_all().unwrap();

    assert!(!a.slot_ref().has_dependency("B"));
    assert!(c.late().is_pending("B", "A"));
    assert_eq!(wired.get(), 0);

    let b = component();
    c.add("B", b.clone()).unwrap();
    c.wire_all().unwrap();

    assert!(a.slot_ref().has_dependency("B"));
    assert!(c.late().is_empty());
    assert_eq!(*late_targets.borrow(), vec!["B"]);
    assert_eq!(wired.get(), 1);

    c.wire_all().unwrap();
    assert_eq!(late_targets.borrow().len(), 1);
    assert_eq!(wired.get(), 1);
}

#[test]
fn late_references_are_tracked_and_unwired() {
    let mut c = Container::default();
    let a = component();
    c.add_with("A", a.clone(), &DependencyMap::new().wire("B"))
        .unwrap();
    c.wire_all().unwrap();
    c.add("B", component()).unwrap();
    c.wire_all().unwrap();

    assert_eq!(c.track().dependents("B").len(), 1);

    c.unwire("A", false).unwrap();
    assert!(!a.slot_ref().has_dependency("B"));
    assert!(c.track().is_empty());
}

#[test]
fn chain_registered_backwards_resolves_in_one_pass() {
    let mut c = Container::default();
    let first = component();
    let second = component();
    let third = component();
    c.add_with("third", third.clone(), &DependencyMap::new().wire("second"))
        .unwrap();
    c.add_with("second", second.clone(), &DependencyMap::new().wire("first"))
        .unwrap();
    c.add("first", first.clone()).unwrap();

    c.wire_all().unwrap();

    assert!(third.slot_ref().has_dependency("second"));
    assert!(second.slot_ref().has_dependency("first"));
    assert!(c.late().is_empty());
}

#[test]
fn wire_late_returns_resolved_targets_in_deferral_order() {
    let mut c = Container::default();
    c.add_with("A", component(), &DependencyMap::new().wire("Y").wire("X"))
        .unwrap();
    c.add_with("B", component(), &DependencyMap::new().wire("Z"))
        .unwrap();
    c.wire_all().unwrap();
    assert_eq!(c.late().targets(), vec!["Y", "X", "Z"]);

    c.add("X", component()).unwrap();
    c.add("Y", component()).unwrap();
    assert_eq!(c.wire_late().unwrap(), vec!["Y", "X"]);
    assert_eq!(c.wire_late().unwrap(), Vec::<String>::new());
    assert_eq!(c.late().targets(), vec!["Z"]);
}

#[test]
fn deferred_event_bindings_subscribe_in_order() {
    let mut c = Container::default();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (first, second) = (Rc::clone(&calls), Rc::clone(&calls));
    let methods = MethodTable::new()
        .with("on_open", handler(move |_: &Component, _| first.borrow_mut().push("open")))
        .with("on_close", handler(move |_: &Component, _| second.borrow_mut().push("close")));
    let listener = Rc::new(Component::with_methods(methods));

    c.add_with(
        "listener",
        listener,
        &DependencyMap::new()
            .on("door", "open", "on_open")
            .on("door", "close", "on_close"),
    )
    .unwrap();
    c.wire_all().unwrap();
    let pending: Vec<String> = c
        .late()
        .pending("door", "listener")
        .unwrap()
        .iter()
        .map(|b| b.event.clone())
        .collect();
    assert_eq!(pending, vec!["open", "close"]);

    let door = component();
    c.add("door", door.clone()).unwrap();
    c.wire_all().unwrap();

    door.emit("close", &());
    door.emit("open", &());
    assert_eq!(*calls.borrow(), vec!["close", "open"]);
    assert_eq!(door.emitter().total_listeners(), 2);
}

#[test]
fn unwiring_a_waiting_dependent_forgets_it() {
    let mut c = Container::default();
    let (late_calls, on_late) = counter();
    let a = component();
    a.set_on_wire_late(Some(move |_: &str| on_late()));

    c.add_with("A", a.clone(), &DependencyMap::new().wire("B"))
        .unwrap();
    c.wire_all().unwrap();
    c.unwire("A", false).unwrap();
    assert!(c.late().is_empty());

    c.add("B", component()).unwrap();
    c.wire_all().unwrap();
    assert_eq!(late_calls.get(), 0);
    assert!(a.slot_ref().has_dependency("B"));
}

#[test]
fn failing_late_binding_mutates_nothing() {
    let mut c = Container::default();
    let a = component();
    c.add_with("A", a.clone(), &DependencyMap::new().on("B", "fire", "missing"))
        .unwrap();
    c.wire_all().unwrap();

    let b = component();
    c.add("B", b.clone()).unwrap();
    let err = c.wire_all().unwrap_err();

    assert_eq!(
        err,
        WireError::UnknownMethod {
            scope: "A".into(),
            method: "missing".into()
        }
    );
    assert!(c.late().is_pending("B", "A"));
    assert!(!a.slot_ref().has_dependency("B"));
    assert!(!b.slot_ref().is_wired(), "the first pass must not run either");
    assert_eq!(b.emitter().total_listeners(), 0);
}

#[test]
fn target_hook_runs_once_when_resolved_late() {
    let mut c = Container::default();
    let (target_wired, on_wire) = counter();
    let target = component();
    target.set_on_wire(Some(on_wire));

    c.add_with("dependent", component(), &DependencyMap::new().wire("target"))
        .unwrap();
    c.wire_all().unwrap();
    c.add("target", target).unwrap();
    c.wire_all().unwrap();

    assert_eq!(target_wired.get(), 1);
}

#[test]
fn resolved_target_waiting_on_its_own_target_is_notified_later() {
    let mut c = Container::default();
    let (a_wired, on_a) = counter();
    let (b_wired, on_b) = counter();
    let a = component();
    let b = component();
    a.set_on_wire(Some(on_a));
    b.set_on_wire(Some(on_b));

    c.add_with("a", a, &DependencyMap::new().wire("b")).unwrap();
    c.wire_all().unwrap();
    c.add_with("b", b, &DependencyMap::new().wire("z")).unwrap();
    c.wire_all().unwrap();
    assert_eq!((a_wired.get(), b_wired.get()), (1, 0));

    c.add("z", component()).unwrap();
    c.wire_all().unwrap();
    assert_eq!((a_wired.get(), b_wired.get()), (1, 1));
}
