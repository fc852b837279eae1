//! Immutable, parent-delegating lookup scopes.
//!
//! A [`Context`] is a frozen scope used for registry lookup and dependency
//! injection: it owns a private id → item cache (fed by [`Context::register`]),
//! a set of named [`Value`] bindings fixed at creation, and an optional
//! parent. Lookups check the own cache first and then delegate up the parent
//! chain; registrations only ever touch the current context.
//!
//! The crate is generic over the registered item so it can sit below the
//! class system: the class runtime instantiates it with its class handle
//! type via the [`RegistryItem`] trait.

mod error;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;
use weft_value::Value;

pub use error::ContextError;

/// An item a [`Context`] can register: anything with a stable,
/// fully-qualified id.
pub trait RegistryItem: Clone {
	/// The fully-qualified id the item registers under.
	fn registry_id(&self) -> &str;
}

thread_local! {
	static NEXT_SERIAL: Cell<u64> = const { Cell::new(0) };
}

fn next_serial() -> u64 {
	NEXT_SERIAL.with(|c| {
		let n = c.get();
		c.set(n + 1);
		n
	})
}

struct Inner<T> {
	serial: u64,
	name: Option<String>,
	parent: Option<Context<T>>,
	bindings: FxHashMap<String, Value>,
	cache: RefCell<FxHashMap<String, T>>,
}

/// An immutable scope with a parent-delegating lookup cache.
///
/// Created only via [`Context::new_root`] (once, at process start, by the
/// runtime that owns the root) or [`Context::sub_context`]. Once created the
/// bindings are frozen; only the registration cache grows.
pub struct Context<T>(Rc<Inner<T>>);

impl<T> Clone for Context<T> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<T: RegistryItem> Context<T> {
	/// Creates a parentless root scope.
	pub fn new_root() -> Self {
		Self(Rc::new(Inner {
			serial: next_serial(),
			name: Some("root".to_owned()),
			parent: None,
			bindings: FxHashMap::default(),
			cache: RefCell::new(FxHashMap::default()),
		}))
	}

	/// Creates a frozen child scope delegating to `self`, with extra named
	/// bindings.
	pub fn sub_context(
		&self,
		bindings: impl IntoIterator<Item = (String, Value)>,
		name: Option<&str>,
	) -> Self {
		Self(Rc::new(Inner {
			serial: next_serial(),
			name: name.map(str::to_owned),
			parent: Some(self.clone()),
			bindings: bindings.into_iter().collect(),
			cache: RefCell::new(FxHashMap::default()),
		}))
	}

	/// Registers an item under its id in this context's own cache only.
	///
	/// Fails with [`ContextError::DuplicateRegistration`] if the id is
	/// already present here. Ids registered by ancestors may be shadowed.
	pub fn register(&self, item: T) -> Result<(), ContextError> {
		let id = item.registry_id().to_owned();
		let mut cache = self.0.cache.borrow_mut();
		if cache.contains_key(&id) {
			return Err(ContextError::DuplicateRegistration(id));
		}
		debug!(id = %id, ctx = self.0.serial, "registered");
		cache.insert(id, item);
		Ok(())
	}

	/// Resolves `id` against this context, then the parent chain.
	pub fn lookup(&self, id: &str) -> Result<T, ContextError> {
		self.find(id)
			.ok_or_else(|| ContextError::UnresolvedReference(id.to_owned()))
	}

	/// Error-suppressed lookup: `None` instead of
	/// [`ContextError::UnresolvedReference`].
	pub fn find(&self, id: &str) -> Option<T> {
		if let Some(item) = self.0.cache.borrow().get(id) {
			return Some(item.clone());
		}
		self.0.parent.as_ref().and_then(|p| p.find(id))
	}

	/// Resolves a named binding against this context, then the parent chain.
	pub fn binding(&self, name: &str) -> Option<Value> {
		if let Some(v) = self.0.bindings.get(name) {
			return Some(v.clone());
		}
		self.0.parent.as_ref().and_then(|p| p.binding(name))
	}

	/// The unique numeric id of this scope.
	pub fn serial(&self) -> u64 {
		self.0.serial
	}

	/// The scope's optional name.
	pub fn name(&self) -> Option<&str> {
		self.0.name.as_deref()
	}

	/// The parent scope, if any.
	pub fn parent(&self) -> Option<&Context<T>> {
		self.0.parent.as_ref()
	}

	/// Identity comparison for scopes.
	pub fn ptr_eq(&self, other: &Context<T>) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<T> fmt::Debug for Context<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("serial", &self.0.serial)
			.field("name", &self.0.name)
			.field("entries", &self.0.cache.borrow().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Clone, Debug, PartialEq)]
	struct Item(&'static str);

	impl RegistryItem for Item {
		fn registry_id(&self) -> &str {
			self.0
		}
	}

	#[test]
	fn child_registration_invisible_to_parent() {
		let root: Context<Item> = Context::new_root();
		let child = root.sub_context([], None);

		child.register(Item("demo.A")).unwrap();

		assert_eq!(root.find("demo.A"), None);
		assert_eq!(child.lookup("demo.A").unwrap(), Item("demo.A"));
	}

	#[test]
	fn lookup_delegates_to_parent() {
		let root: Context<Item> = Context::new_root();
		root.register(Item("demo.A")).unwrap();

		let child = root.sub_context([], Some("child"));
		assert_eq!(child.lookup("demo.A").unwrap(), Item("demo.A"));
		assert_eq!(child.name(), Some("child"));
	}

	#[test]
	fn duplicate_in_same_cache_fails() {
		let root: Context<Item> = Context::new_root();
		root.register(Item("demo.A")).unwrap();
		assert_eq!(
			root.register(Item("demo.A")),
			Err(ContextError::DuplicateRegistration("demo.A".to_owned()))
		);
	}

	#[test]
	fn shadowing_an_ancestor_is_allowed() {
		let root: Context<Item> = Context::new_root();
		root.register(Item("demo.A")).unwrap();

		let child = root.sub_context([], None);
		child.register(Item("demo.A")).unwrap();
		assert!(child.lookup("demo.A").is_ok());
	}

	#[test]
	fn unresolved_reference() {
		let root: Context<Item> = Context::new_root();
		assert_eq!(
			root.lookup("no.Such"),
			Err(ContextError::UnresolvedReference("no.Such".to_owned()))
		);
		assert_eq!(root.find("no.Such"), None);
	}

	#[test]
	fn bindings_delegate_up_the_chain() {
		let root: Context<Item> = Context::new_root();
		let a = root.sub_context([("who".to_owned(), Value::from("a"))], None);
		let b = a.sub_context([("extra".to_owned(), Value::from(1))], None);

		assert_eq!(b.binding("who"), Some(Value::from("a")));
		assert_eq!(b.binding("extra"), Some(Value::from(1)));
		assert_eq!(root.binding("who"), None);
	}

	#[test]
	fn serials_are_unique_and_increasing() {
		let root: Context<Item> = Context::new_root();
		let a = root.sub_context([], None);
		let b = root.sub_context([], None);
		assert!(root.serial() < a.serial());
		assert!(a.serial() < b.serial());
	}
}
