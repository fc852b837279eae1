//! Intrusive subscriber lists.
//!
//! Each topic node owns one sentinel-headed, doubly-linked list of
//! subscribers, newest first. The list is built for mutation during
//! delivery: a delivery cursor captures the next pointer before invoking a
//! callback, destroyed nodes become tombstones that keep their forward
//! pointer (so in-flight cursors pass through them), and insertion lands at
//! the head, behind every live cursor.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_value::Value;

/// A subscriber callback. Receives its own [`Subscription`] (so it can
/// destroy itself mid-delivery) and the full published argument path.
pub type Listener = Rc<dyn Fn(&Subscription, &[Value])>;

/// Wraps a closure as a [`Listener`].
pub fn listener(f: impl Fn(&Subscription, &[Value]) + 'static) -> Listener {
	Rc::new(f)
}

pub(crate) struct SubNode {
	/// Dropped on destroy so captured state is released promptly.
	listener: Option<Listener>,
	prev: Weak<RefCell<SubNode>>,
	/// Kept intact on destroy: in-flight cursors traverse tombstones.
	next: Option<Rc<RefCell<SubNode>>>,
	destroyed: bool,
}

/// A destroy-capable handle to one subscriber-list node.
#[derive(Clone)]
pub struct Subscription {
	node: Rc<RefCell<SubNode>>,
}

impl Subscription {
	/// Unlinks the node from its list. Idempotent: destroying an
	/// already-destroyed node is a no-op, and never resurrects it.
	pub fn destroy(&self) {
		let (prev_weak, next) = {
			let mut n = self.node.borrow_mut();
			if n.destroyed {
				return;
			}
			n.destroyed = true;
			n.listener = None;
			(n.prev.clone(), n.next.clone())
		};
		if let Some(prev) = prev_weak.upgrade() {
			prev.borrow_mut().next = next.clone();
		}
		if let Some(next) = next {
			next.borrow_mut().prev = prev_weak;
		}
	}

	/// Returns true once [`Subscription::destroy`] has run.
	pub fn is_destroyed(&self) -> bool {
		self.node.borrow().destroyed
	}

	pub(crate) fn listener_is(&self, l: &Listener) -> bool {
		match &self.node.borrow().listener {
			Some(own) => Rc::ptr_eq(own, l),
			None => false,
		}
	}
}

/// Sentinel-headed subscriber list. Cloning shares the same list.
#[derive(Clone)]
pub(crate) struct SubList {
	sentinel: Rc<RefCell<SubNode>>,
}

impl SubList {
	pub fn new() -> Self {
		Self {
			sentinel: Rc::new(RefCell::new(SubNode {
				listener: None,
				prev: Weak::new(),
				next: None,
				destroyed: false,
			})),
		}
	}

	/// Inserts at the head: delivery order is most-recently-subscribed
	/// first, and a node inserted during delivery sits behind every live
	/// cursor, so it is only visible to later publishes.
	pub fn insert_head(&self, listener: Listener) -> Subscription {
		let first = self.sentinel.borrow().next.clone();
		let node = Rc::new(RefCell::new(SubNode {
			listener: Some(listener),
			prev: Rc::downgrade(&self.sentinel),
			next: first.clone(),
			destroyed: false,
		}));
		if let Some(first) = first {
			first.borrow_mut().prev = Rc::downgrade(&node);
		}
		self.sentinel.borrow_mut().next = Some(node.clone());
		Subscription { node }
	}

	/// Delivers `args` to every live subscriber, head to tail.
	///
	/// The next pointer is captured before each callback runs, so a
	/// callback may destroy its own node, the next node, or any other node
	/// without a still-live subscriber being skipped or double-delivered,
	/// and without a destroyed node being visited.
	pub fn deliver(&self, args: &[Value]) -> usize {
		let mut count = 0;
		let mut cur = self.sentinel.borrow().next.clone();
		while let Some(node) = cur {
			let (listener, next) = {
				let b = node.borrow();
				if b.destroyed {
					(None, b.next.clone())
				} else {
					(b.listener.clone(), b.next.clone())
				}
			};
			cur = next;
			if let Some(listener) = listener {
				let sub = Subscription {
					node: Rc::clone(&node),
				};
				(listener.as_ref())(&sub, args);
				count += 1;
			}
		}
		count
	}

	/// Destroys the first live node whose listener is reference-equal to
	/// `l`. Returns true if one was found.
	pub fn remove_listener(&self, l: &Listener) -> bool {
		let mut cur = self.sentinel.borrow().next.clone();
		while let Some(node) = cur {
			let next = node.borrow().next.clone();
			let sub = Subscription {
				node: Rc::clone(&node),
			};
			if sub.listener_is(l) {
				sub.destroy();
				return true;
			}
			cur = next;
		}
		false
	}
}
