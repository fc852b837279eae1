//! Axioms: the named, composable units a class is built from.
//!
//! An axiom is polymorphic over the capability set
//! `{install_in_class?, install_in_proto?}`. The two built-in kinds carry
//! their installers inherently: a [`PropertyAxiom`] installs an accessor
//! spec into the prototype table, a [`MethodAxiom`] installs a callable.
//! [`CustomAxiom`] is the open extension point; it must offer at least one
//! hook, checked when the axiom is registered into a class.

use std::fmt;
use std::rc::Rc;

use weft_value::Value;

use crate::class::{Class, Proto};
use crate::object::Object;

/// Kind tag for the by-kind axiom query and its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxiomKind {
	Property,
	Method,
	Custom,
}

/// A property factory: computes the effective value of an unset property.
pub type Factory = Rc<dyn Fn(&Object) -> Value>;

/// A method body. Receives the instance and the call arguments.
pub type MethodFn = Rc<dyn Fn(&Object, &[Value]) -> Value>;

/// Installer run against the class itself.
pub type ClassInstaller = Rc<dyn Fn(&Class)>;

/// Installer run against the class's prototype table.
///
/// The prototype is borrowed mutably for the duration of the call; the
/// installer must not re-enter axiom installation on the same class.
pub type ProtoInstaller = Rc<dyn Fn(&Class, &mut Proto)>;

/// Accessor spec a property installs into the prototype.
pub struct PropertyAxiom {
	/// Effective value of the property while unset (and no factory).
	pub default: Value,
	/// Computes the effective value while unset; wins over `default`.
	/// A factory-backed property is always treated as possibly-changed
	/// when cleared.
	pub factory: Option<Factory>,
	pub doc: String,
}

/// A callable installed into the prototype.
pub struct MethodAxiom {
	pub code: MethodFn,
	pub doc: String,
}

/// An arbitrary class-construction unit.
#[derive(Clone, Default)]
pub struct CustomAxiom {
	pub install_in_class: Option<ClassInstaller>,
	pub install_in_proto: Option<ProtoInstaller>,
}

/// The capability variants an axiom can be.
pub enum AxiomSpec {
	Property(Rc<PropertyAxiom>),
	Method(Rc<MethodAxiom>),
	Custom(CustomAxiom),
}

struct AxiomInner {
	name: String,
	spec: AxiomSpec,
}

/// A named unit of class-construction behavior. Cheap to clone; clones
/// share identity (used by the pointer-stability guarantees on classes).
#[derive(Clone)]
pub struct Axiom(Rc<AxiomInner>);

impl Axiom {
	/// A property with a plain default value.
	pub fn property(name: &str, default: impl Into<Value>) -> Axiom {
		Self::property_from(
			name,
			PropertyAxiom {
				default: default.into(),
				factory: None,
				doc: String::new(),
			},
		)
	}

	/// A property whose unset value is computed by `factory`.
	pub fn factory_property(name: &str, factory: impl Fn(&Object) -> Value + 'static) -> Axiom {
		Self::property_from(
			name,
			PropertyAxiom {
				default: Value::Absent,
				factory: Some(Rc::new(factory)),
				doc: String::new(),
			},
		)
	}

	/// A property from a full spec.
	pub fn property_from(name: &str, spec: PropertyAxiom) -> Axiom {
		Axiom(Rc::new(AxiomInner {
			name: name.to_owned(),
			spec: AxiomSpec::Property(Rc::new(spec)),
		}))
	}

	/// A method with the given body.
	pub fn method(name: &str, code: impl Fn(&Object, &[Value]) -> Value + 'static) -> Axiom {
		Axiom(Rc::new(AxiomInner {
			name: name.to_owned(),
			spec: AxiomSpec::Method(Rc::new(MethodAxiom {
				code: Rc::new(code),
				doc: String::new(),
			})),
		}))
	}

	/// An arbitrary unit. Validity (at least one hook) is checked when the
	/// axiom is registered into a class.
	pub fn custom(name: &str, spec: CustomAxiom) -> Axiom {
		Axiom(Rc::new(AxiomInner {
			name: name.to_owned(),
			spec: AxiomSpec::Custom(spec),
		}))
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	pub fn kind(&self) -> AxiomKind {
		match &self.0.spec {
			AxiomSpec::Property(_) => AxiomKind::Property,
			AxiomSpec::Method(_) => AxiomKind::Method,
			AxiomSpec::Custom(_) => AxiomKind::Custom,
		}
	}

	pub fn spec(&self) -> &AxiomSpec {
		&self.0.spec
	}

	/// The property spec, if this is a property axiom.
	pub fn as_property(&self) -> Option<&Rc<PropertyAxiom>> {
		match &self.0.spec {
			AxiomSpec::Property(p) => Some(p),
			_ => None,
		}
	}

	/// The method spec, if this is a method axiom.
	pub fn as_method(&self) -> Option<&Rc<MethodAxiom>> {
		match &self.0.spec {
			AxiomSpec::Method(m) => Some(m),
			_ => None,
		}
	}

	/// Identity comparison; clones of one axiom are identical.
	pub fn ptr_eq(&self, other: &Axiom) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// True if the axiom carries at least one installer capability.
	/// Properties and methods are installable by construction.
	pub fn is_installable(&self) -> bool {
		match &self.0.spec {
			AxiomSpec::Property(_) | AxiomSpec::Method(_) => true,
			AxiomSpec::Custom(c) => {
				c.install_in_class.is_some() || c.install_in_proto.is_some()
			}
		}
	}
}

impl fmt::Debug for Axiom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Axiom")
			.field("name", &self.0.name)
			.field("kind", &self.kind())
			.finish()
	}
}
