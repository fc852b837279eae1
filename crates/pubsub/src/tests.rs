use std::cell::RefCell;
use std::rc::Rc;

use weft_value::Value;

use super::*;

fn recording(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Listener {
	let log = Rc::clone(log);
	listener(move |_, _| log.borrow_mut().push(tag))
}

#[test]
fn delivery_is_newest_first() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	bus.subscribe(&["t"], recording(&log, "a"));
	bus.subscribe(&["t"], recording(&log, "b"));
	bus.subscribe(&["t"], recording(&log, "c"));

	let count = bus.publish(&[Value::from("t")]);

	assert_eq!(count, 3);
	assert_eq!(*log.borrow(), vec!["c", "b", "a"]);
}

#[test]
fn prefix_depths_all_match() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	bus.subscribe(&[], recording(&log, "root"));
	bus.subscribe(&["a"], recording(&log, "a"));
	bus.subscribe(&["a", "b"], recording(&log, "ab"));
	bus.subscribe(&["a", "c"], recording(&log, "ac"));

	let count = bus.publish(&[Value::from("a"), Value::from("b")]);

	assert_eq!(count, 3);
	assert_eq!(*log.borrow(), vec!["root", "a", "ab"]);
}

#[test]
fn root_list_sees_every_publish() {
	let bus = Bus::new();
	let hits = Rc::new(RefCell::new(0));
	let h = Rc::clone(&hits);
	bus.subscribe(&[], listener(move |_, _| *h.borrow_mut() += 1));

	bus.publish(&[]);
	bus.publish(&[Value::from("x")]);
	bus.publish(&[Value::from("y"), Value::Int(2)]);

	assert_eq!(*hits.borrow(), 3);
}

#[test]
fn matching_is_by_coerced_text() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	bus.subscribe(&["5"], recording(&log, "five"));

	assert_eq!(bus.publish(&[Value::Int(5)]), 1);
	assert_eq!(bus.publish(&[Value::from("5")]), 1);
	assert_eq!(bus.publish(&[Value::Int(6)]), 0);
	assert_eq!(*log.borrow(), vec!["five", "five"]);
}

#[test]
fn listener_receives_full_argument_path() {
	let bus = Bus::new();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let s = Rc::clone(&seen);
	bus.subscribe(
		&["propertyChange"],
		listener(move |_, args| s.borrow_mut().push(args.to_vec())),
	);

	bus.publish(&[
		Value::from("propertyChange"),
		Value::from("x"),
		Value::Int(1),
		Value::Int(2),
	]);

	let seen = seen.borrow();
	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].len(), 4);
	assert_eq!(seen[0][3], Value::Int(2));
}

#[test]
fn self_destroy_mid_delivery() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	bus.subscribe(&["t"], recording(&log, "a"));
	{
		let log = Rc::clone(&log);
		bus.subscribe(
			&["t"],
			listener(move |sub, _| {
				log.borrow_mut().push("b-once");
				sub.destroy();
			}),
		);
	}
	bus.subscribe(&["t"], recording(&log, "c"));

	assert_eq!(bus.publish(&[Value::from("t")]), 3);
	assert_eq!(*log.borrow(), vec!["c", "b-once", "a"]);

	// The self-destroyed node is gone on the next pass.
	assert_eq!(bus.publish(&[Value::from("t")]), 2);
	assert_eq!(*log.borrow(), vec!["c", "b-once", "a", "c", "a"]);
}

#[test]
fn cross_destroy_of_the_next_node() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));

	// Delivery order is newest first: killer runs before victim.
	let victim = bus.subscribe(&["t"], recording(&log, "victim"));
	let survivor = bus.subscribe(&["t"], recording(&log, "survivor"));
	{
		let log = Rc::clone(&log);
		let victim = victim.clone();
		bus.subscribe(
			&["t"],
			listener(move |_, _| {
				log.borrow_mut().push("killer");
				victim.destroy();
			}),
		);
	}

	// killer, survivor run; victim was destroyed before its turn.
	assert_eq!(bus.publish(&[Value::from("t")]), 2);
	assert_eq!(*log.borrow(), vec!["killer", "survivor"]);
	assert!(victim.is_destroyed());
	assert!(!survivor.is_destroyed());
}

#[test]
fn destroy_is_idempotent() {
	let bus = Bus::new();
	let hits = Rc::new(RefCell::new(0));
	let h = Rc::clone(&hits);
	let sub = bus.subscribe(&["t"], listener(move |_, _| *h.borrow_mut() += 1));

	sub.destroy();
	sub.destroy();
	assert!(sub.is_destroyed());
	assert_eq!(bus.publish(&[Value::from("t")]), 0);
	assert_eq!(*hits.borrow(), 0);
}

#[test]
fn double_destroy_does_not_unlink_a_neighbor() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	bus.subscribe(&["t"], recording(&log, "a"));
	let b = bus.subscribe(&["t"], recording(&log, "b"));
	bus.subscribe(&["t"], recording(&log, "c"));

	// After the first destroy, b's neighbors are c <-> a. A second destroy
	// must not touch the list again.
	b.destroy();
	b.destroy();

	assert_eq!(bus.publish(&[Value::from("t")]), 2);
	assert_eq!(*log.borrow(), vec!["c", "a"]);
}

#[test]
fn subscribe_during_delivery_waits_for_next_publish() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	let bus = Rc::new(bus);
	{
		let log = Rc::clone(&log);
		let bus2 = Rc::clone(&bus);
		bus.subscribe(
			&["t"],
			listener(move |sub, _| {
				log.borrow_mut().push("outer");
				// Only the first delivery registers the late listener.
				sub.destroy();
				let log = Rc::clone(&log);
				bus2.subscribe(&["t"], listener(move |_, _| log.borrow_mut().push("late")));
			}),
		);
	}

	assert_eq!(bus.publish(&[Value::from("t")]), 1);
	assert_eq!(*log.borrow(), vec!["outer"]);

	assert_eq!(bus.publish(&[Value::from("t")]), 1);
	assert_eq!(*log.borrow(), vec!["outer", "late"]);
}

#[test]
fn reentrant_publish_from_a_listener() {
	let bus = Rc::new(Bus::new());
	let log = Rc::new(RefCell::new(Vec::new()));
	{
		let log = Rc::clone(&log);
		bus.subscribe(&["inner"], listener(move |_, _| log.borrow_mut().push("inner")));
	}
	{
		let log = Rc::clone(&log);
		let bus2 = Rc::clone(&bus);
		bus.subscribe(
			&["outer"],
			listener(move |_, _| {
				log.borrow_mut().push("outer");
				bus2.publish(&[Value::from("inner")]);
			}),
		);
	}

	assert_eq!(bus.publish(&[Value::from("outer")]), 1);
	assert_eq!(*log.borrow(), vec!["outer", "inner"]);
}

#[test]
fn unsubscribe_removes_by_listener_identity() {
	let bus = Bus::new();
	let log = Rc::new(RefCell::new(Vec::new()));
	let keep = recording(&log, "keep");
	let drop_me = recording(&log, "drop");
	bus.subscribe(&["t"], keep.clone());
	bus.subscribe(&["t"], drop_me.clone());

	assert!(bus.unsubscribe(&["t"], &drop_me));
	assert!(!bus.unsubscribe(&["t"], &drop_me));
	assert!(!bus.unsubscribe(&["missing"], &keep));

	bus.publish(&[Value::from("t")]);
	assert_eq!(*log.borrow(), vec!["keep"]);
}

#[test]
fn every_still_live_listener_runs_exactly_once_under_churn() {
	// One listener destroys another and subscribes a replacement; the
	// remaining live listeners must each run exactly once.
	let bus = Rc::new(Bus::new());
	let log = Rc::new(RefCell::new(Vec::new()));

	let first = bus.subscribe(&["t"], recording(&log, "first"));
	bus.subscribe(&["t"], recording(&log, "second"));
	{
		let log = Rc::clone(&log);
		let bus2 = Rc::clone(&bus);
		let first = first.clone();
		bus.subscribe(
			&["t"],
			listener(move |_, _| {
				log.borrow_mut().push("churn");
				first.destroy();
				let log = Rc::clone(&log);
				bus2.subscribe(&["t"], listener(move |_, _| log.borrow_mut().push("new")));
			}),
		);
	}

	assert_eq!(bus.publish(&[Value::from("t")]), 2);
	assert_eq!(*log.borrow(), vec!["churn", "second"]);

	// Next pass: new (head), churn, second — first stays gone, but churn
	// destroys first again (no-op) and adds another replacement.
	log.borrow_mut().clear();
	assert_eq!(bus.publish(&[Value::from("t")]), 3);
	assert_eq!(*log.borrow(), vec!["new", "churn", "second"]);
}
