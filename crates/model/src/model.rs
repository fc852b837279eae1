//! Models: declarative class descriptions.
//!
//! A [`Model`] is plain data — identity, an optional parent or refinement
//! target, and an ordered axiom list — interpreted by the class builder.
//! It is immutable once built; validation happens at class-construction
//! time so a builder chain never fails midway.

use weft_value::Value;

use crate::axiom::{Axiom, CustomAxiom};
use crate::object::Object;

/// A declarative class description.
#[derive(Clone)]
pub struct Model {
	name: String,
	package: String,
	extends: Option<String>,
	refines: Option<String>,
	axioms: Vec<Axiom>,
}

impl Model {
	/// Starts a description of a new class. `path` is the fully-qualified
	/// id: the segment after the last `.` is the name, the rest is the
	/// package (which may be empty).
	pub fn define(path: &str) -> ModelBuilder {
		let (package, name) = match path.rfind('.') {
			Some(i) => (path[..i].to_owned(), path[i + 1..].to_owned()),
			None => (String::new(), path.to_owned()),
		};
		ModelBuilder {
			model: Model {
				name,
				package,
				extends: None,
				refines: None,
				axioms: Vec::new(),
			},
		}
	}

	/// Starts a refinement: the axioms will be installed into the already
	/// registered class with id `target`, mutating it in place.
	pub fn refine(target: &str) -> ModelBuilder {
		let mut b = Model::define("");
		b.model.refines = Some(target.to_owned());
		b
	}

	/// The fully-qualified id this model builds (or refines).
	pub fn id(&self) -> String {
		if let Some(target) = &self.refines {
			return target.clone();
		}
		if self.package.is_empty() {
			self.name.clone()
		} else {
			format!("{}.{}", self.package, self.name)
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn package(&self) -> &str {
		&self.package
	}

	pub fn extends(&self) -> Option<&str> {
		self.extends.as_deref()
	}

	pub fn refines(&self) -> Option<&str> {
		self.refines.as_deref()
	}

	pub fn axioms(&self) -> &[Axiom] {
		&self.axioms
	}
}

/// Fluent construction of a [`Model`].
pub struct ModelBuilder {
	model: Model,
}

impl ModelBuilder {
	/// Sets the parent class id. Without this, classes extend the kernel
	/// base class.
	pub fn extends(mut self, parent: &str) -> Self {
		self.model.extends = Some(parent.to_owned());
		self
	}

	/// Appends an axiom.
	pub fn axiom(mut self, axiom: Axiom) -> Self {
		self.model.axioms.push(axiom);
		self
	}

	/// Appends a property axiom with a plain default.
	pub fn property(self, name: &str, default: impl Into<Value>) -> Self {
		self.axiom(Axiom::property(name, default))
	}

	/// Appends a factory-backed property axiom.
	pub fn factory_property(
		self,
		name: &str,
		factory: impl Fn(&Object) -> Value + 'static,
	) -> Self {
		self.axiom(Axiom::factory_property(name, factory))
	}

	/// Appends a method axiom.
	pub fn method(self, name: &str, code: impl Fn(&Object, &[Value]) -> Value + 'static) -> Self {
		self.axiom(Axiom::method(name, code))
	}

	/// Appends a custom axiom.
	pub fn custom(self, name: &str, spec: CustomAxiom) -> Self {
		self.axiom(Axiom::custom(name, spec))
	}

	pub fn build(self) -> Model {
		self.model
	}
}
