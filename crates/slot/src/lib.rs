//! The slot binding protocol, plus standalone cells.
//!
//! Everything here works against the [`Slot`] contract: bindings connect
//! two slots so values propagate between them, with feedback suppression so
//! the propagation itself cannot ring forever.
//!
//! - [`SlotBinding::link_from`] converges two slots onto one value and
//!   keeps them converged, with one corrective round-trip when a setter
//!   rejects or coerces.
//! - [`SlotBinding::follow`] and [`SlotBinding::map_from`] are the
//!   one-directional variants (identity / transformed).
//! - [`SlotBinding::relate_to`] is bidirectional through a transform pair
//!   and fails fatally when the pair does not invert (see
//!   [`FEEDBACK_LIMIT`]).
//!
//! Every operation returns a [`Binding`]; destroying it severs propagation.

#[cfg(test)]
mod tests;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;
use weft_model::{Slot, SlotRef};
use weft_pubsub::{Bus, Listener, Subscription, listener};
use weft_value::Value;

/// Maximum propagation depth a relation may reach before it is declared
/// divergent (when instability is not expected).
pub const FEEDBACK_LIMIT: u32 = 5;

/// A pure value transform used by mapping and relating.
pub type Transform = Rc<dyn Fn(Value) -> Value>;

/// Wraps a closure as a [`Transform`].
pub fn transform(f: impl Fn(Value) -> Value + 'static) -> Transform {
	Rc::new(f)
}

/// The destroyable handle tying slots together.
///
/// Dropping the handle does *not* sever the binding; call
/// [`Binding::destroy`] (idempotent).
pub struct Binding {
	subs: Vec<Subscription>,
}

impl Binding {
	fn new(subs: Vec<Subscription>) -> Self {
		Self { subs }
	}

	/// Severs every direction of the binding. Idempotent.
	pub fn destroy(&self) {
		for sub in &self.subs {
			sub.destroy();
		}
	}

	/// True once every underlying subscription is destroyed.
	pub fn is_destroyed(&self) -> bool {
		self.subs.iter().all(Subscription::is_destroyed)
	}
}

/// Binding operations available on any pair of slots.
///
/// `link_to`, `map_to` and `relate_from` are argument-order conveniences
/// delegating to the reverse-direction primitive.
pub trait SlotBinding {
	/// Converges `self` and `other` onto one value, `other` winning the
	/// initial copy, then keeps them bidirectionally synchronized.
	fn link_from(&self, other: &SlotRef) -> Binding;

	/// One-directional continuous synchronization from `other` into
	/// `self`; applies immediately.
	fn follow(&self, other: &SlotRef) -> Binding;

	/// One-directional synchronization through `f`; applies immediately.
	fn map_from(&self, other: &SlotRef, f: Transform) -> Binding;

	/// Bidirectional synchronization through a transform pair: `self`
	/// pushes through `f`, `other` pushes back through `f_prime`.
	///
	/// With `expect_unstable == false` the pair must invert
	/// (`f_prime(f(x)) == x`) and propagation depth is bounded by
	/// [`FEEDBACK_LIMIT`]; violating either fails fatally with a
	/// "divergent relation" panic. With `expect_unstable == true`,
	/// per-direction feedback suppression is engaged instead and no
	/// divergence check runs.
	fn relate_to(
		&self,
		other: &SlotRef,
		f: Transform,
		f_prime: Transform,
		expect_unstable: bool,
	) -> Binding;

	fn link_to(&self, other: &SlotRef) -> Binding;
	fn map_to(&self, other: &SlotRef, f: Transform) -> Binding;
	fn relate_from(
		&self,
		other: &SlotRef,
		f: Transform,
		f_prime: Transform,
		expect_unstable: bool,
	) -> Binding;
}

impl SlotBinding for SlotRef {
	fn link_from(&self, other: &SlotRef) -> Binding {
		let a = Rc::clone(self);
		let b = Rc::clone(other);

		// Initial convergence: other's value wins; if the setter rejected
		// or coerced it, one corrective copy back.
		a.set(b.get());
		if a.get() != b.get() {
			b.set(a.get());
		}

		// One feedback flag per direction: a side's own re-entrant
		// notification is suppressed only while that side is actively
		// propagating.
		let flag_a = Rc::new(Cell::new(false));
		let flag_b = Rc::new(Cell::new(false));

		let sub_a = {
			let (a, b, flag) = (Rc::clone(&a), Rc::clone(&b), Rc::clone(&flag_a));
			a.clone().when_changed(listener(move |_, _| {
				if flag.get() {
					return;
				}
				flag.set(true);
				b.set(a.get());
				if b.get() != a.get() {
					a.set(b.get());
				}
				flag.set(false);
			}))
		};
		let sub_b = {
			let (a, b, flag) = (Rc::clone(&a), Rc::clone(&b), Rc::clone(&flag_b));
			b.clone().when_changed(listener(move |_, _| {
				if flag.get() {
					return;
				}
				flag.set(true);
				a.set(b.get());
				if a.get() != b.get() {
					b.set(a.get());
				}
				flag.set(false);
			}))
		};

		Binding::new(vec![sub_a, sub_b])
	}

	fn follow(&self, other: &SlotRef) -> Binding {
		let a = Rc::clone(self);
		let b = Rc::clone(other);
		if a.get() != b.get() {
			a.set(b.get());
		}
		let sub = {
			let (a, b) = (Rc::clone(&a), Rc::clone(&b));
			other.when_changed(listener(move |_, _| {
				if a.get() != b.get() {
					a.set(b.get());
				}
			}))
		};
		Binding::new(vec![sub])
	}

	fn map_from(&self, other: &SlotRef, f: Transform) -> Binding {
		let a = Rc::clone(self);
		let b = Rc::clone(other);
		a.set((f.as_ref())(b.get()));
		let sub = {
			let (a, b) = (Rc::clone(&a), Rc::clone(&b));
			other.when_changed(listener(move |_, _| a.set((f.as_ref())(b.get()))))
		};
		Binding::new(vec![sub])
	}

	fn relate_to(
		&self,
		other: &SlotRef,
		f: Transform,
		f_prime: Transform,
		expect_unstable: bool,
	) -> Binding {
		let a = Rc::clone(self);
		let b = Rc::clone(other);
		let depth = Rc::new(Cell::new(0u32));
		let flag_a = Rc::new(Cell::new(false));
		let flag_b = Rc::new(Cell::new(false));

		// Initial application, through the same checked path as any later
		// propagation.
		propagate(&a, &b, &f, &f_prime, &depth, &flag_a, expect_unstable);

		let sub_a = {
			let (a, b) = (Rc::clone(&a), Rc::clone(&b));
			let (f, f_prime) = (Rc::clone(&f), Rc::clone(&f_prime));
			let (depth, flag) = (Rc::clone(&depth), Rc::clone(&flag_a));
			a.clone().when_changed(listener(move |_, _| {
				propagate(&a, &b, &f, &f_prime, &depth, &flag, expect_unstable);
			}))
		};
		let sub_b = {
			let (a, b) = (Rc::clone(&a), Rc::clone(&b));
			let (f, f_prime) = (Rc::clone(&f), Rc::clone(&f_prime));
			let (depth, flag) = (Rc::clone(&depth), Rc::clone(&flag_b));
			b.clone().when_changed(listener(move |_, _| {
				// Reverse direction: push through f', invert with f.
				propagate(&b, &a, &f_prime, &f, &depth, &flag, expect_unstable);
			}))
		};

		Binding::new(vec![sub_a, sub_b])
	}

	fn link_to(&self, other: &SlotRef) -> Binding {
		other.link_from(self)
	}

	fn map_to(&self, other: &SlotRef, f: Transform) -> Binding {
		other.map_from(self, f)
	}

	fn relate_from(
		&self,
		other: &SlotRef,
		f: Transform,
		f_prime: Transform,
		expect_unstable: bool,
	) -> Binding {
		other.relate_to(self, f, f_prime, expect_unstable)
	}
}

/// One relation propagation step: `dst.set(fwd(src.get()))`.
///
/// Expected-unstable relations engage the per-direction suppression flag
/// and skip every check: the caller accepts that convergence is not
/// guaranteed. Otherwise the transform pair must invert on the value being
/// propagated, and nested propagation depth is bounded by
/// [`FEEDBACK_LIMIT`]; either violation is fatal.
fn propagate(
	src: &SlotRef,
	dst: &SlotRef,
	fwd: &Transform,
	inv: &Transform,
	depth: &Rc<Cell<u32>>,
	flag: &Rc<Cell<bool>>,
	expect_unstable: bool,
) {
	if expect_unstable {
		if flag.get() {
			return;
		}
		flag.set(true);
		dst.set((fwd.as_ref())(src.get()));
		flag.set(false);
		return;
	}

	let x = src.get();
	if (inv.as_ref())((fwd.as_ref())(x.clone())) != x {
		panic!("divergent relation: transform pair does not invert at {x}");
	}
	let d = depth.get() + 1;
	depth.set(d);
	if d > FEEDBACK_LIMIT {
		panic!("divergent relation: feedback depth {d} exceeds {FEEDBACK_LIMIT}");
	}
	if d == FEEDBACK_LIMIT {
		warn!(depth = d, "relation feedback approaching its bound");
	}
	dst.set((fwd.as_ref())(src.get()));
	depth.set(depth.get() - 1);
}

/// A standalone value cell with its own change bus.
pub struct ValueSlot {
	value: RefCell<Value>,
	bus: Bus,
}

const CHANGE: &str = "change";

impl ValueSlot {
	/// A cell holding `initial`. Pass [`Value::Absent`] for an undefined
	/// cell.
	pub fn new(initial: impl Into<Value>) -> Rc<ValueSlot> {
		Rc::new(ValueSlot {
			value: RefCell::new(initial.into()),
			bus: Bus::new(),
		})
	}
}

impl Slot for ValueSlot {
	fn get(&self) -> Value {
		self.value.borrow().clone()
	}

	fn set(&self, v: Value) {
		let old = self.value.borrow().clone();
		if old == v {
			return;
		}
		*self.value.borrow_mut() = v.clone();
		self.bus.publish(&[Value::from(CHANGE), old, v]);
	}

	fn is_defined(&self) -> bool {
		!self.value.borrow().is_absent()
	}

	fn clear(&self) {
		self.set(Value::Absent);
	}

	fn when_changed(&self, l: Listener) -> Subscription {
		self.bus.subscribe(&[CHANGE], l)
	}
}

/// A read-only cell: writes are rejected with a warning and ignored.
pub struct ConstantSlot {
	value: Value,
	bus: Bus,
}

impl ConstantSlot {
	pub fn new(value: impl Into<Value>) -> Rc<ConstantSlot> {
		Rc::new(ConstantSlot {
			value: value.into(),
			bus: Bus::new(),
		})
	}
}

impl Slot for ConstantSlot {
	fn get(&self) -> Value {
		self.value.clone()
	}

	fn set(&self, _v: Value) {
		warn!("set on a constant slot; ignored");
	}

	fn is_defined(&self) -> bool {
		!self.value.is_absent()
	}

	fn clear(&self) {
		warn!("clear on a constant slot; ignored");
	}

	fn when_changed(&self, l: Listener) -> Subscription {
		// Never fires; returned so callers can treat constants uniformly.
		self.bus.subscribe(&[CHANGE], l)
	}
}
