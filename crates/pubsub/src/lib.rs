//! Topic-tree publish/subscribe.
//!
//! A [`Bus`] owns a tree of topic nodes. Depth *k* keys on the coerced text
//! of the *k*-th published argument; every node carries its own subscriber
//! list plus children. Subscribing with an empty path attaches to the root
//! list, which is notified on every publish regardless of arguments.
//!
//! `publish` delivers synchronously, in order, to the root list and then to
//! each prefix-depth node actually present along the coerced argument path,
//! traversing each list head to tail from its current head. Delivery is
//! safe against arbitrary mutation from inside callbacks: see
//! [`list`](self) for the capture-next / tombstone protocol.

mod list;
#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;
use weft_value::{Value, topic_segment};

pub use list::{Listener, Subscription, listener};

use list::SubList;

struct TreeNode {
	subs: SubList,
	children: FxHashMap<String, Rc<RefCell<TreeNode>>>,
}

impl TreeNode {
	fn new() -> Self {
		Self {
			subs: SubList::new(),
			children: FxHashMap::default(),
		}
	}
}

/// A per-instance event bus.
pub struct Bus {
	root: Rc<RefCell<TreeNode>>,
}

impl Default for Bus {
	fn default() -> Self {
		Self::new()
	}
}

impl Bus {
	pub fn new() -> Self {
		Self {
			root: Rc::new(RefCell::new(TreeNode::new())),
		}
	}

	/// Subscribes `l` at `path`. An empty path subscribes to every publish.
	///
	/// The new subscriber is inserted at the head of its node's list, so it
	/// is delivered first on the next publish and is not visited by any
	/// delivery already in flight.
	pub fn subscribe(&self, path: &[&str], l: Listener) -> Subscription {
		let mut node = Rc::clone(&self.root);
		for seg in path {
			let child = {
				let mut b = node.borrow_mut();
				b.children
					.entry((*seg).to_owned())
					.or_insert_with(|| Rc::new(RefCell::new(TreeNode::new())))
					.clone()
			};
			node = child;
		}
		let subs = node.borrow().subs.clone();
		subs.insert_head(l)
	}

	/// Publishes `args` and returns the number of listeners invoked.
	///
	/// Matching is by coerced textual identity per segment: an integer `5`
	/// reaches a subscription made at `"5"`. The matching lists are
	/// collected before any callback runs, so re-entrant subscription or
	/// tree growth from inside a callback affects later publishes only.
	pub fn publish(&self, args: &[Value]) -> usize {
		let mut lists: SmallVec<[SubList; 4]> = SmallVec::new();
		lists.push(self.root.borrow().subs.clone());
		let mut node = Rc::clone(&self.root);
		for arg in args {
			let seg = topic_segment(arg);
			let child = node.borrow().children.get(&seg).cloned();
			match child {
				Some(child) => {
					lists.push(child.borrow().subs.clone());
					node = child;
				}
				None => break,
			}
		}

		let mut count = 0;
		for list in lists {
			count += list.deliver(args);
		}
		trace!(count, depth = args.len(), "publish");
		count
	}

	/// Destroys the first subscription at `path` whose listener is
	/// reference-equal to `l`. Returns true if one was removed.
	pub fn unsubscribe(&self, path: &[&str], l: &Listener) -> bool {
		let mut node = Rc::clone(&self.root);
		for seg in path {
			let child = node.borrow().children.get(*seg).cloned();
			match child {
				Some(child) => node = child,
				None => return false,
			}
		}
		let subs = node.borrow().subs.clone();
		subs.remove_listener(l)
	}
}
