use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wirekit::{
    Component, Container, DependencyMap, MethodTable, WireError, WireSlot, Wireable, handler,
    handler_fn,
};

fn component() -> Rc<Component> {
    Rc::new(Component::new())
}

/// A participant with no event source.
struct Silent {
    slot: WireSlot,
}

impl Wireable for Silent {
    fn slot(&self) -> &WireSlot {
        &self.slot
    }
}

#[test]
fn handler_runs_with_dependent_as_scope_once_per_emit() {
    let mut c = Container::default();
    let target = component();
    let scopes = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&scopes);
    let on_fire = handler_fn(move |scope, payload| {
        let value = payload.downcast_ref::<u32>().copied();
        seen.borrow_mut().push((scope.slot().wired_as(), value));
    });

    c.add("B", target.clone()).unwrap();
    c.add_with("A", component(), &DependencyMap::new().on("B", "fire", on_fire))
        .unwrap();
    c.wire("A", false).unwrap();

    assert_eq!(target.emit("fire", &7u32), 1);
    assert_eq!(target.emit("fire", &8u32), 1);
    assert_eq!(
        *scopes.borrow(),
        vec![(Some("A".to_owned()), Some(7)), (Some("A".to_owned()), Some(8))]
    );

    c.unwire("A", false).unwrap();
    assert_eq!(target.emit("fire", &9u32), 0);
    assert_eq!(scopes.borrow().len(), 2);
    assert_eq!(target.emitter().total_listeners(), 0);
}

#[test]
fn method_handlers_resolve_against_the_dependent() {
    let mut c = Container::default();
    let ticks = Rc::new(Cell::new(0));
    let t = Rc::clone(&ticks);
    let methods = MethodTable::new().with(
        "on_tick",
        handler(move |me: &Component, _| {
            assert!(me.slot_ref().has_dependency("clock"));
            t.set(t.get() + 1);
        }),
    );
    let clock = component();

    c.add("clock", clock.clone()).unwrap();
    c.add_with(
        "view",
        Rc::new(Component::with_methods(methods)),
        &DependencyMap::from_json(r#"{ "clock": { "tick": "on_tick" } }"#).unwrap(),
    )
    .unwrap();
    c.wire_all().unwrap();

    clock.emit("tick", &());
    clock.emit("tick", &());
    assert_eq!(ticks.get(), 2);

    c.unwire_all().unwrap();
    clock.emit("tick", &());
    assert_eq!(ticks.get(), 2);
}

#[test]
fn several_events_on_one_target() {
    let mut c = Container::default();
    let log = Rc::new(RefCell::new(Vec::new()));
    let (up, down) = (Rc::clone(&log), Rc::clone(&log));
    let target = component();
    c.add("target", target.clone()).unwrap();
    c.add_with(
        "dependent",
        component(),
        &DependencyMap::new()
            .on("target", "up", handler_fn(move |_, _| up.borrow_mut().push("up")))
            .on("target", "down", handler_fn(move |_, _| down.borrow_mut().push("down"))),
    )
    .unwrap();
    c.wire_all().unwrap();

    target.emit("down", &());
    target.emit("up", &());
    target.emit("sideways", &());
    assert_eq!(*log.borrow(), vec!["down", "up"]);
}

#[test]
fn unwiring_one_dependent_keeps_the_others_subscribed() {
    let mut c = Container::default();
    let target = component();
    let hits = Rc::new(Cell::new(0));
    let bump = {
        let hits = Rc::clone(&hits);
        handler_fn(move |_, _| hits.set(hits.get() + 1))
    };

    c.add("target", target.clone()).unwrap();
    c.add_with("one", component(), &DependencyMap::new().on("target", "fire", Rc::clone(&bump)))
        .unwrap();
    c.add_with("two", component(), &DependencyMap::new().on("target", "fire", bump))
        .unwrap();
    c.wire_all().unwrap();
    assert_eq!(target.emit("fire", &()), 2);

    c.unwire("one", false).unwrap();
    assert_eq!(target.emit("fire", &()), 1);
    assert_eq!(hits.get(), 3);
}

#[test]
fn event_bindings_need_an_event_source() {
    let mut c = Container::default();
    let dependent = component();
    c.add("silent", Rc::new(Silent { slot: WireSlot::new() }))
        .unwrap();
    c.add_with(
        "dependent",
        dependent.clone(),
        &DependencyMap::new().on("silent", "fire", handler_fn(|_, _| {})),
    )
    .unwrap();

    assert_eq!(
        c.wire("dependent", false),
        Err(WireError::NotAnEventSource {
            target: "silent".into(),
            dependent: "dependent".into()
        })
    );
    assert!(!dependent.slot_ref().is_wired());
    assert!(!dependent.slot_ref().has_dependency("silent"));
}

#[test]
fn wire_only_dependency_on_a_silent_target() {
    let mut c = Container::default();
    let dependent = component();
    c.add("silent", Rc::new(Silent { slot: WireSlot::new() }))
        .unwrap();
    c.add_with("dependent", dependent.clone(), &DependencyMap::new().wire("silent"))
        .unwrap();
    c.wire_all().unwrap();

    let held = dependent.slot_ref().dependency("silent").unwrap();
    assert!(held.downcast_ref::<Silent>().is_some());
}

#[test]
fn dropped_dependent_stops_receiving() {
    let target = component();
    let hits = Rc::new(Cell::new(0));
    {
        let mut c = Container::default();
        let h = Rc::clone(&hits);
        c.add("target", target.clone()).unwrap();
        c.add_with(
            "dependent",
            component(),
            &DependencyMap::new().on("target", "fire", handler_fn(move |_, _| h.set(h.get() + 1))),
        )
        .unwrap();
        c.wire_all().unwrap();
        assert_eq!(target.emit("fire", &()), 1);
    }
    assert_eq!(target.emit("fire", &()), 0);
    assert_eq!(hits.get(), 1);
}

#[test]
fn unwire_after_target_removed_stops_events() {
    let mut c = Container::default();
    let target = component();
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);

    c.add("B", target.clone()).unwrap();
    c.add_with(
        "A",
        component(),
        &DependencyMap::new().on("B", "fire", handler_fn(move |_, _| h.set(h.get() + 1))),
    )
    .unwrap();
    c.wire_all().unwrap();

    c.remove("B").unwrap();
    c.unwire("A", false).unwrap();

    assert_eq!(target.emit("fire", &()), 0);
    assert_eq!(hits.get(), 0);
    assert_eq!(target.emitter().total_listeners(), 0);
}

#[test]
fn unwire_after_target_name_rebound_unsubscribes_the_original() {
    let mut c = Container::default();
    let original = component();
    let replacement = component();
    let dependent = component();

    c.add("B", original.clone()).unwrap();
    c.add_with(
        "A",
        dependent.clone(),
        &DependencyMap::new().on("B", "fire", handler_fn(|_, _| {})),
    )
    .unwrap();
    c.wire_all().unwrap();

    c.remove("B").unwrap();
    c.add("B", replacement.clone()).unwrap();
    c.unwire("A", false).unwrap();

    assert_eq!(original.emitter().total_listeners(), 0);
    assert_eq!(replacement.emitter().total_listeners(), 0);
    assert!(dependent.slot_ref().event_source("B").is_none());
}

#[test]
fn breadth_drained_dependent_still_unsubscribes() {
    let mut c = Container::default();
    let target = component();
    let first = component();
    let second = component();
    let binding = || DependencyMap::new().on("B", "fire", handler_fn(|_, _| {}));

    c.add("B", target.clone()).unwrap();
    c.add_with("first", first.clone(), &binding()).unwrap();
    c.add_with("second", second.clone(), &binding()).unwrap();
    c.wire_all().unwrap();
    assert_eq!(target.emitter().total_listeners(), 2);

    c.unwire("first", false).unwrap();
    assert!(!second.slot_ref().has_dependency("B"));
    assert_eq!(target.emitter().total_listeners(), 1);

    c.remove("B").unwrap();
    c.unwire("second", false).unwrap();
    assert_eq!(target.emitter().total_listeners(), 0);
}
