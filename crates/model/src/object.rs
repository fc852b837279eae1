//! Instances.
//!
//! An [`Object`] derives its behavior from its class's prototype chain and
//! holds a private name → value store for materialized property values.
//! Setting a property publishes `("propertyChange", name, old, new)` on the
//! instance's own topic tree — change notification is a specialization of
//! the general pub/sub mechanism, not a separate one.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::warn;
use weft_pubsub::{Bus, Listener, Subscription};
use weft_value::{AnyObject, Value, type_of};

use crate::class::{Class, Ctx};
use crate::error::ModelError;
use crate::slot::PropertySlot;

/// First topic segment of property-change events.
pub const PROPERTY_CHANGE: &str = "propertyChange";

pub(crate) struct ObjectInner {
	pub(crate) class: Class,
	pub(crate) ctx: Ctx,
	pub(crate) values: RefCell<FxHashMap<String, Value>>,
	pub(crate) bus: Bus,
	pub(crate) slots: RefCell<FxHashMap<String, Weak<PropertySlot>>>,
	pub(crate) self_ref: Weak<ObjectInner>,
}

/// An instance of a [`Class`]. Cheap to clone; clones share identity.
#[derive(Clone)]
pub struct Object(pub(crate) Rc<ObjectInner>);

impl Object {
	pub(crate) fn allocate(class: Class, ctx: Ctx) -> Object {
		Object(Rc::new_cyclic(|weak| ObjectInner {
			class,
			ctx,
			values: RefCell::new(FxHashMap::default()),
			bus: Bus::new(),
			slots: RefCell::new(FxHashMap::default()),
			self_ref: weak.clone(),
		}))
	}

	pub fn class(&self) -> &Class {
		&self.0.class
	}

	/// The context this instance was created in.
	pub fn context(&self) -> &Ctx {
		&self.0.ctx
	}

	/// Identity comparison; clones of one handle are identical.
	pub fn ptr_eq(&self, other: &Object) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Wraps this instance as a [`Value`].
	pub fn to_value(&self) -> Value {
		Value::Object(self.0.clone())
	}

	/// Recovers an instance from a [`Value::Object`] produced by
	/// [`Object::to_value`].
	pub fn from_value(v: &Value) -> Option<Object> {
		let obj = v.as_object()?;
		let inner = obj.as_any().downcast_ref::<ObjectInner>()?;
		inner.self_ref.upgrade().map(Object)
	}

	fn property_spec(
		&self,
		name: &str,
	) -> Result<Rc<crate::axiom::PropertyAxiom>, ModelError> {
		self.0
			.class
			.find_property(name)
			.ok_or_else(|| ModelError::UnknownAxiom(name.to_owned()))
	}

	/// Reads a property's effective value.
	///
	/// An unset property with a factory computes the value without
	/// materializing it into the private store (and without firing change
	/// notification); otherwise the declared default applies.
	pub fn get(&self, name: &str) -> Result<Value, ModelError> {
		let spec = self.property_spec(name)?;
		if let Some(v) = self.0.values.borrow().get(name) {
			return Ok(v.clone());
		}
		if let Some(factory) = &spec.factory {
			return Ok((factory.as_ref())(self));
		}
		Ok(spec.default.clone())
	}

	/// Writes a property.
	///
	/// Always materializes the value; publishes exactly one
	/// `propertyChange` event if the effective value changed, none if the
	/// new value equals the old.
	pub fn set(&self, name: &str, v: Value) -> Result<(), ModelError> {
		self.property_spec(name)?;
		let old = self.get(name)?;
		let changed = !type_of(&old).equals(&old, &v);
		self.0.values.borrow_mut().insert(name.to_owned(), v.clone());
		if changed {
			self.publish_change(name, old, v);
		}
		Ok(())
	}

	/// True if the property has a materialized value in the private store.
	pub fn has_own(&self, name: &str) -> bool {
		self.0.values.borrow().contains_key(name)
	}

	/// Resets a property to its default/factory state.
	///
	/// Fires a change notification if the effective value differs, or
	/// unconditionally for a factory-backed property (its result counts as
	/// possibly-changed whenever the materialized state is discarded).
	pub fn clear(&self, name: &str) -> Result<(), ModelError> {
		let spec = self.property_spec(name)?;
		let removed = self.0.values.borrow_mut().remove(name);
		if spec.factory.is_some() {
			let old = removed.unwrap_or(Value::Absent);
			let new = self.get(name)?;
			self.publish_change(name, old, new);
			return Ok(());
		}
		if let Some(old) = removed {
			let new = self.get(name)?;
			if !type_of(&old).equals(&old, &new) {
				self.publish_change(name, old, new);
			}
		}
		Ok(())
	}

	fn publish_change(&self, name: &str, old: Value, new: Value) {
		self.0.bus.publish(&[
			Value::from(PROPERTY_CHANGE),
			Value::from(name),
			old,
			new,
		]);
	}

	/// Copies every materialized property value from `other`, through the
	/// normal setter path (so change-notification rules apply). Values for
	/// properties this instance does not declare are skipped.
	pub fn copy_from(&self, other: &Object) -> Result<(), ModelError> {
		for (name, _) in other.class().properties() {
			if !other.has_own(&name) {
				continue;
			}
			let v = other.get(&name)?;
			if self.0.class.find_property(&name).is_some() {
				self.set(&name, v)?;
			} else {
				warn!(class = %self.0.class.id(), property = %name, "copy_from: property not declared here; skipped");
			}
		}
		Ok(())
	}

	/// Invokes an installed method.
	pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ModelError> {
		let method = self
			.0
			.class
			.find_method(name)
			.ok_or_else(|| ModelError::UnknownAxiom(name.to_owned()))?;
		Ok((method.code.as_ref())(self, args))
	}

	/// Deep clone: a fresh same-class instance whose materialized values
	/// are cloned through the type dispatch (nested instances recursively).
	/// The clone goes through the normal construction path, so `init` runs.
	pub fn clone_instance(&self) -> Result<Object, ModelError> {
		let owned: Vec<(String, Value)> = self
			.0
			.values
			.borrow()
			.iter()
			.map(|(k, v)| (k.clone(), type_of(v).clone_value(v)))
			.collect();
		let args: Vec<(&str, Value)> = owned
			.iter()
			.map(|(k, v)| (k.as_str(), v.clone()))
			.collect();
		self.0.class.create(&self.0.ctx, &args)
	}

	/// Equality: an installed `equals` method decides; without one,
	/// reference identity.
	pub fn equals(&self, other: &Object) -> bool {
		if self.0.class.find_method("equals").is_some()
			&& let Ok(Value::Bool(b)) = self.call("equals", &[other.to_value()])
		{
			return b;
		}
		self.ptr_eq(other)
	}

	/// The instance's event bus.
	pub fn bus(&self) -> &Bus {
		&self.0.bus
	}

	/// Subscribes on this instance's topic tree.
	pub fn subscribe(&self, path: &[&str], l: Listener) -> Subscription {
		self.0.bus.subscribe(path, l)
	}

	/// Publishes on this instance's topic tree.
	pub fn publish(&self, args: &[Value]) -> usize {
		self.0.bus.publish(args)
	}

	/// Removes the first subscription at `path` with this exact listener.
	pub fn unsubscribe(&self, path: &[&str], l: &Listener) -> bool {
		self.0.bus.unsubscribe(path, l)
	}

	/// Subscribes to changes of one property.
	pub fn on_property_change(&self, name: &str, l: Listener) -> Subscription {
		self.0.bus.subscribe(&[PROPERTY_CHANGE, name], l)
	}
}

impl AnyObject for ObjectInner {
	fn type_name(&self) -> String {
		self.class.name().to_owned()
	}

	fn to_text(&self) -> String {
		match self.self_ref.upgrade().map(Object) {
			Some(obj) => obj.to_string(),
			None => self.class.name().to_owned(),
		}
	}

	fn identity(&self) -> usize {
		self as *const ObjectInner as usize
	}

	fn deep_clone(&self) -> Value {
		match self.self_ref.upgrade().map(Object) {
			Some(obj) => match obj.clone_instance() {
				Ok(clone) => clone.to_value(),
				Err(e) => {
					warn!(class = %self.class.id(), error = %e, "clone failed; substituting absent");
					Value::Absent
				}
			},
			None => Value::Absent,
		}
	}

	fn as_any(&self) -> &dyn std::any::Any {
		self
	}
}

impl fmt::Display for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.class.find_method("toString").is_some()
			&& let Ok(Value::Text(s)) = self.call("toString", &[])
		{
			return f.write_str(&s);
		}
		f.write_str(self.0.class.name())
	}
}

impl fmt::Debug for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Object")
			.field("class", &self.0.class.id())
			.field("values", &self.0.values.borrow().len())
			.finish()
	}
}
