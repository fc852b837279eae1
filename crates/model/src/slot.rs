//! The Slot contract and the property-backed slot.
//!
//! A slot is a reactive single-value cell. The binding protocol (linking,
//! following, mapping, relating) lives in `weft-slot` and works against
//! any [`Slot`] implementation; the property-backed variant lives here
//! because its identity cache is part of the instance.

use std::rc::Rc;

use tracing::warn;
use weft_pubsub::{Listener, Subscription};
use weft_value::Value;

use crate::error::ModelError;
use crate::object::{Object, PROPERTY_CHANGE};

/// A reactive single-value cell.
pub trait Slot {
	/// The current effective value.
	fn get(&self) -> Value;
	/// Writes the cell. Implementations publish a change only when the
	/// value actually changes.
	fn set(&self, v: Value);
	/// True if the cell holds an explicitly set value.
	fn is_defined(&self) -> bool;
	/// Resets the cell to its unset state.
	fn clear(&self);
	/// Subscribes to changes of the cell's value.
	fn when_changed(&self, l: Listener) -> Subscription;
}

/// Shared handle to any slot.
pub type SlotRef = Rc<dyn Slot>;

/// A slot wrapping one (instance, property) pair.
///
/// Obtained via [`Object::slot`], which caches per property name: two
/// fetches for the same property on the same instance return the identical
/// slot object.
pub struct PropertySlot {
	obj: Object,
	name: String,
}

impl PropertySlot {
	pub fn object(&self) -> &Object {
		&self.obj
	}

	pub fn property_name(&self) -> &str {
		&self.name
	}
}

impl Slot for PropertySlot {
	fn get(&self) -> Value {
		self.obj.get(&self.name).unwrap_or(Value::Absent)
	}

	fn set(&self, v: Value) {
		if let Err(e) = self.obj.set(&self.name, v) {
			warn!(property = %self.name, error = %e, "slot set rejected");
		}
	}

	fn is_defined(&self) -> bool {
		self.obj.has_own(&self.name)
	}

	fn clear(&self) {
		if let Err(e) = self.obj.clear(&self.name) {
			warn!(property = %self.name, error = %e, "slot clear rejected");
		}
	}

	fn when_changed(&self, l: Listener) -> Subscription {
		self.obj.subscribe(&[PROPERTY_CHANGE, self.name.as_str()], l)
	}
}

impl Object {
	/// The slot for one property, identity-cached on the instance.
	///
	/// Fails with [`ModelError::UnknownAxiom`] if `name` does not name an
	/// installed property.
	pub fn slot(&self, name: &str) -> Result<Rc<PropertySlot>, ModelError> {
		if let Some(weak) = self.0.slots.borrow().get(name)
			&& let Some(slot) = weak.upgrade()
		{
			return Ok(slot);
		}
		if self.class().find_property(name).is_none() {
			return Err(ModelError::UnknownAxiom(name.to_owned()));
		}
		let slot = Rc::new(PropertySlot {
			obj: self.clone(),
			name: name.to_owned(),
		});
		self.0
			.slots
			.borrow_mut()
			.insert(name.to_owned(), Rc::downgrade(&slot));
		Ok(slot)
	}
}
