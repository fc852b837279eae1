use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_model::{Ctx, Model, Slot, SlotRef, declare, root_context};
use weft_pubsub::{Listener, Subscription, listener};
use weft_value::Value;

use super::*;

fn test_ctx() -> Ctx {
	root_context().sub_context([], None)
}

/// Two property slots on fresh instances, preset to `a` and `b`.
fn pair(ctx: &Ctx, a: i64, b: i64) -> (SlotRef, SlotRef) {
	let model = Model::define("demo.Cell").property("v", 0).build();
	let cls = declare(&model, ctx).unwrap();
	let x = cls.create(ctx, &[("v", Value::Int(a))]).unwrap();
	let y = cls.create(ctx, &[("v", Value::Int(b))]).unwrap();
	let sa: SlotRef = x.slot("v").unwrap();
	let sb: SlotRef = y.slot("v").unwrap();
	(sa, sb)
}

fn int(v: &SlotRef) -> i64 {
	v.get().as_int().unwrap_or(i64::MIN)
}

#[test]
fn value_slot_basics() {
	let s = ValueSlot::new(Value::Absent);
	assert!(!s.is_defined());
	assert_eq!(s.get(), Value::Absent);

	let fired = Rc::new(Cell::new(0));
	let f = Rc::clone(&fired);
	s.when_changed(listener(move |_, _| f.set(f.get() + 1)));

	s.set(Value::Int(1));
	assert!(s.is_defined());
	assert_eq!(fired.get(), 1);

	s.set(Value::Int(1)); // equal: silent
	assert_eq!(fired.get(), 1);

	s.clear();
	assert!(!s.is_defined());
	assert_eq!(fired.get(), 2);
}

#[test]
fn constant_slot_rejects_writes() {
	let c = ConstantSlot::new(Value::Int(7));
	c.set(Value::Int(9));
	c.clear();
	assert_eq!(c.get(), Value::Int(7));
	assert!(c.is_defined());

	let fired = Rc::new(Cell::new(0));
	let f = Rc::clone(&fired);
	let sub = c.when_changed(listener(move |_, _| f.set(f.get() + 1)));
	assert_eq!(fired.get(), 0);
	sub.destroy();
}

#[test]
fn link_from_converges_then_tracks_both_ways() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 1, 2);

	let binding = a.link_from(&b);
	assert_eq!(int(&a), 2);
	assert_eq!(int(&b), 2);

	a.set(Value::Int(5));
	assert_eq!(int(&b), 5);

	b.set(Value::Int(9));
	assert_eq!(int(&a), 9);

	binding.destroy();
	a.set(Value::Int(100));
	assert_eq!(int(&b), 9);
}

#[test]
fn link_from_corrects_a_rejecting_setter() {
	/// A cell that clamps everything to at most 10.
	struct Clamp(Rc<ValueSlot>);
	impl Slot for Clamp {
		fn get(&self) -> Value {
			self.0.get()
		}
		fn set(&self, v: Value) {
			let clamped = v.as_int().map(|n| Value::Int(n.min(10))).unwrap_or(v);
			self.0.set(clamped);
		}
		fn is_defined(&self) -> bool {
			self.0.is_defined()
		}
		fn clear(&self) {
			self.0.clear();
		}
		fn when_changed(&self, l: Listener) -> Subscription {
			self.0.when_changed(l)
		}
	}

	let a: SlotRef = Rc::new(Clamp(ValueSlot::new(Value::Int(0))));
	let b: SlotRef = ValueSlot::new(Value::Int(50));

	// Copy b -> a clamps to 10; the corrective round-trip pushes 10 back.
	a.link_from(&b);
	assert_eq!(int(&a), 10);
	assert_eq!(int(&b), 10);

	b.set(Value::Int(99));
	assert_eq!(int(&a), 10);
	assert_eq!(int(&b), 10);
}

#[test]
fn follow_is_one_directional() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 1, 2);

	a.follow(&b);
	assert_eq!(int(&a), 2);

	b.set(Value::Int(7));
	assert_eq!(int(&a), 7);

	// The other direction does not propagate.
	a.set(Value::Int(3));
	assert_eq!(int(&b), 7);
}

#[test]
fn map_from_applies_transform() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 0, 3);

	let double = transform(|v| Value::Int(v.as_int().unwrap_or(0) * 2));
	a.map_from(&b, double);
	assert_eq!(int(&a), 6);

	b.set(Value::Int(10));
	assert_eq!(int(&a), 20);
}

#[test]
fn map_to_delegates_to_the_reverse_primitive() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 4, 0);

	let negate = transform(|v| Value::Int(-v.as_int().unwrap_or(0)));
	a.map_to(&b, negate);
	assert_eq!(int(&b), -4);

	a.set(Value::Int(6));
	assert_eq!(int(&b), -6);
}

#[test]
fn relate_to_with_an_inverting_pair_is_stable() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 3, 0);

	let inc = transform(|v| Value::Int(v.as_int().unwrap_or(0) + 1));
	let dec = transform(|v| Value::Int(v.as_int().unwrap_or(0) - 1));
	a.relate_to(&b, inc, dec, false);

	// Initial application: b = a + 1.
	assert_eq!(int(&b), 4);

	a.set(Value::Int(10));
	assert_eq!(int(&b), 11);

	b.set(Value::Int(20));
	assert_eq!(int(&a), 19);
}

#[test]
#[should_panic(expected = "divergent relation")]
fn relate_to_with_a_non_inverting_pair_fails() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 1, 2);

	let zero_f = transform(|_| Value::Int(0));
	let zero_fp = transform(|_| Value::Int(0));
	a.relate_to(&b, zero_f, zero_fp, false);
}

#[test]
fn relate_to_expect_unstable_suppresses_instead_of_failing() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 0, 0);

	// Not an inverse pair; with expect_unstable the echo is suppressed
	// after one bounce per direction instead of being checked.
	let inc = transform(|v| Value::Int(v.as_int().unwrap_or(0) + 1));
	let also_inc = transform(|v| Value::Int(v.as_int().unwrap_or(0) + 1));
	a.relate_to(&b, inc, also_inc, true);

	a.set(Value::Int(3));
	assert_eq!(int(&b), 4); // a -> b through f
	assert_eq!(int(&a), 5); // one echo b -> a through f', then suppressed
}

#[test]
fn relate_from_reverses_the_directions() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 0, 3);

	let inc = transform(|v| Value::Int(v.as_int().unwrap_or(0) + 1));
	let dec = transform(|v| Value::Int(v.as_int().unwrap_or(0) - 1));
	// Equivalent to b.relate_to(a, inc, dec, false): a = b + 1.
	a.relate_from(&b, inc, dec, false);
	assert_eq!(int(&a), 4);
}

#[test]
fn binding_destroy_is_idempotent_and_severs_all_directions() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 1, 2);

	let binding = a.link_from(&b);
	assert!(!binding.is_destroyed());

	binding.destroy();
	binding.destroy();
	assert!(binding.is_destroyed());

	a.set(Value::Int(50));
	b.set(Value::Int(60));
	assert_eq!(int(&a), 50);
	assert_eq!(int(&b), 60);
}

#[test]
fn mixed_value_and_property_slots_link() {
	let ctx = test_ctx();
	let (a, _) = pair(&ctx, 1, 0);
	let v: SlotRef = ValueSlot::new(Value::Int(42));

	a.link_from(&v);
	assert_eq!(int(&a), 42);

	v.set(Value::Int(43));
	assert_eq!(int(&a), 43);

	a.set(Value::Int(44));
	assert_eq!(int(&v), 44);
}

#[test]
fn chained_propagation_settles_synchronously() {
	// a follows b, c maps from a: one set on b updates the whole chain
	// before set() returns.
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 0, 0);
	let c: SlotRef = ValueSlot::new(Value::Int(0));

	a.follow(&b);
	let double = transform(|v| Value::Int(v.as_int().unwrap_or(0) * 2));
	c.map_from(&a, double);

	b.set(Value::Int(21));
	assert_eq!(int(&a), 21);
	assert_eq!(int(&c), 42);
}

#[test]
fn listener_sees_change_exactly_once_per_linked_set() {
	let ctx = test_ctx();
	let (a, b) = pair(&ctx, 0, 0);
	a.link_from(&b);

	let log = Rc::new(RefCell::new(Vec::new()));
	let l = Rc::clone(&log);
	a.when_changed(listener(move |_, args| {
		l.borrow_mut().push(args.to_vec());
	}));

	b.set(Value::Int(8));
	assert_eq!(log.borrow().len(), 1);
	assert_eq!(int(&a), 8);
}
