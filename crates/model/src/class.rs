//! Classes and the axiom-driven class builder.
//!
//! A [`Class`] holds only its *own* axiom entries plus a link to its
//! parent; every inherited query walks the parent chain explicitly. The
//! prototype table ([`Proto`]) is the installed artifact instances read
//! through: axioms are registered into the axiom map first (pass 1, so
//! siblings can see each other) and only then take effect by installing
//! into the class/prototype (pass 2).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::{debug, warn};
use weft_context::{Context, RegistryItem};
use weft_value::Value;

use crate::axiom::{Axiom, AxiomKind, AxiomSpec, MethodAxiom, PropertyAxiom};
use crate::error::ModelError;
use crate::model::Model;
use crate::object::Object;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// The context type the class system registers into.
pub type Ctx = Context<Class>;

/// How far through the bootstrap a class has come.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
	/// Hand-built by the phase-1 kernel: prototype populated directly, no
	/// axiom entries yet.
	Raw,
	/// Carries a real axiom map (phase 2 upgrade or ordinary phase-3
	/// construction).
	Described,
}

/// Installed prototype tables instances resolve against.
///
/// Each class's `Proto` holds only its own installed entries; resolution
/// walks the parent chain.
#[derive(Default)]
pub struct Proto {
	pub(crate) properties: FxIndexMap<String, Rc<PropertyAxiom>>,
	pub(crate) methods: FxIndexMap<String, Rc<MethodAxiom>>,
}

impl Proto {
	/// Installs a property spec under `name`.
	pub fn install_property(&mut self, name: &str, spec: Rc<PropertyAxiom>) {
		self.methods.shift_remove(name);
		self.properties.insert(name.to_owned(), spec);
	}

	/// Installs a method under `name`.
	pub fn install_method(&mut self, name: &str, spec: Rc<MethodAxiom>) {
		self.properties.shift_remove(name);
		self.methods.insert(name.to_owned(), spec);
	}
}

pub(crate) struct ClassInner {
	id: String,
	name: String,
	package: String,
	// Immutable after construction; the subclass memo depends on this.
	parent: Option<Class>,
	model: RefCell<Option<Model>>,
	axioms: RefCell<FxIndexMap<String, Axiom>>,
	proto: RefCell<Proto>,
	kind_cache: RefCell<FxHashMap<AxiomKind, Rc<[Axiom]>>>,
	subclass_memo: RefCell<FxHashMap<String, bool>>,
	phase: Cell<BootPhase>,
}

/// A constructed, installable, instantiable class. Cheap to clone; clones
/// share identity.
#[derive(Clone)]
pub struct Class(Rc<ClassInner>);

impl RegistryItem for Class {
	fn registry_id(&self) -> &str {
		self.id()
	}
}

impl Class {
	fn alloc(package: &str, name: &str, parent: Option<Class>, phase: BootPhase) -> Class {
		let id = if package.is_empty() {
			name.to_owned()
		} else {
			format!("{package}.{name}")
		};
		Class(Rc::new(ClassInner {
			id,
			name: name.to_owned(),
			package: package.to_owned(),
			parent,
			model: RefCell::new(None),
			axioms: RefCell::new(FxIndexMap::default()),
			proto: RefCell::new(Proto::default()),
			kind_cache: RefCell::new(FxHashMap::default()),
			subclass_memo: RefCell::new(FxHashMap::default()),
			phase: Cell::new(phase),
		}))
	}

	/// Phase-1 kernel constructor: a bare class with an empty axiom map,
	/// outside the Model machinery.
	pub(crate) fn raw(package: &str, name: &str, parent: Option<Class>) -> Class {
		Self::alloc(package, name, parent, BootPhase::Raw)
	}

	/// Directly populates the prototype, bypassing the axiom protocol.
	/// Phase-1 only: no axiom entries, no cache invalidation needed (the
	/// class has never been queried).
	pub(crate) fn raw_install_method(&self, name: &str, spec: Rc<MethodAxiom>) {
		self.0.proto.borrow_mut().install_method(name, spec);
	}

	pub fn id(&self) -> &str {
		&self.0.id
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	pub fn package(&self) -> &str {
		&self.0.package
	}

	pub fn parent(&self) -> Option<Class> {
		self.0.parent.clone()
	}

	/// The model this class was built from, if any (phase-1 kernel classes
	/// acquire one during their phase-2 upgrade).
	pub fn model(&self) -> Option<Model> {
		self.0.model.borrow().clone()
	}

	pub fn boot_phase(&self) -> BootPhase {
		self.0.phase.get()
	}

	/// Identity comparison; clones of one class are identical.
	pub fn ptr_eq(&self, other: &Class) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Resolves an axiom by name: own map first, then the parent chain.
	/// Repeated calls return the identical axiom object.
	pub fn axiom_by_name(&self, name: &str) -> Option<Axiom> {
		if let Some(ax) = self.0.axioms.borrow().get(name) {
			return Some(ax.clone());
		}
		self.parent().and_then(|p| p.axiom_by_name(name))
	}

	/// This class's own axiom entries, in declaration order.
	pub fn own_axioms(&self) -> Vec<Axiom> {
		self.0.axioms.borrow().values().cloned().collect()
	}

	/// The full inherited axiom list: ancestor entries first, in
	/// declaration order; an overridden name keeps its first-declared
	/// position but yields the most-derived axiom.
	pub fn axioms(&self) -> Vec<Axiom> {
		let mut merged = FxIndexMap::default();
		self.collect_axioms(&mut merged);
		merged.into_values().collect()
	}

	fn collect_axioms(&self, into: &mut FxIndexMap<String, Axiom>) {
		if let Some(parent) = self.parent() {
			parent.collect_axioms(into);
		}
		for (name, ax) in self.0.axioms.borrow().iter() {
			into.insert(name.clone(), ax.clone());
		}
	}

	/// The inherited axiom list filtered by kind. Cached: repeated calls
	/// return the identical slice until the next axiom installation on
	/// this class.
	pub fn axioms_of(&self, kind: AxiomKind) -> Rc<[Axiom]> {
		if let Some(hit) = self.0.kind_cache.borrow().get(&kind) {
			return Rc::clone(hit);
		}
		let filtered: Rc<[Axiom]> = self
			.axioms()
			.into_iter()
			.filter(|ax| ax.kind() == kind)
			.collect();
		self.0
			.kind_cache
			.borrow_mut()
			.insert(kind, Rc::clone(&filtered));
		filtered
	}

	/// Walks the parent chain upward. Memoized by the candidate's id; the
	/// memo is never invalidated, since parentage is immutable after
	/// construction (axiom installation only touches the kind cache).
	pub fn is_subclass_of(&self, other: &Class) -> bool {
		if let Some(&hit) = self.0.subclass_memo.borrow().get(other.id()) {
			return hit;
		}
		let mut cur = Some(self.clone());
		let mut found = false;
		while let Some(c) = cur {
			if c.ptr_eq(other) {
				found = true;
				break;
			}
			cur = c.parent();
		}
		self.0
			.subclass_memo
			.borrow_mut()
			.insert(other.id().to_owned(), found);
		found
	}

	/// Inserts or overwrites `axiom` in this class's own map, invalidates
	/// the kind cache, then runs the axiom's installers.
	///
	/// Visible immediately to new instances; existing instances see new
	/// methods through chain lookup but keep materialized property values.
	pub fn install_axiom(&self, axiom: Axiom) -> Result<(), ModelError> {
		self.insert_axiom(&axiom)?;
		self.run_installers(&axiom);
		Ok(())
	}

	/// Pass 1 of installation: register by name and invalidate. A custom
	/// axiom with no installer hook is rejected here, at construction time.
	fn insert_axiom(&self, axiom: &Axiom) -> Result<(), ModelError> {
		if !axiom.is_installable() {
			return Err(ModelError::InvalidAxiom(axiom.name().to_owned()));
		}
		self.0
			.axioms
			.borrow_mut()
			.insert(axiom.name().to_owned(), axiom.clone());
		self.0.kind_cache.borrow_mut().clear();
		Ok(())
	}

	/// Pass 2 of installation: let the axiom take effect.
	fn run_installers(&self, axiom: &Axiom) {
		match axiom.spec() {
			AxiomSpec::Property(p) => {
				self.0
					.proto
					.borrow_mut()
					.install_property(axiom.name(), Rc::clone(p));
			}
			AxiomSpec::Method(m) => {
				self.0
					.proto
					.borrow_mut()
					.install_method(axiom.name(), Rc::clone(m));
			}
			AxiomSpec::Custom(c) => {
				if let Some(install) = &c.install_in_class {
					(install.as_ref())(self);
				}
				if let Some(install) = &c.install_in_proto {
					let mut proto = self.0.proto.borrow_mut();
					(install.as_ref())(self, &mut proto);
				}
			}
		}
	}

	/// The uniform two-pass installation loop: register every axiom by
	/// name first (so installers can query yet-to-be-applied siblings),
	/// then run installers in declaration order.
	pub(crate) fn install_model(&self, model: &Model) -> Result<(), ModelError> {
		for ax in model.axioms() {
			self.insert_axiom(ax)?;
		}
		for ax in model.axioms() {
			self.run_installers(ax);
		}
		if self.0.model.borrow().is_none() {
			*self.0.model.borrow_mut() = Some(model.clone());
		}
		self.0.phase.set(BootPhase::Described);
		Ok(())
	}

	/// Resolves a property spec through the prototype chain.
	pub(crate) fn find_property(&self, name: &str) -> Option<Rc<PropertyAxiom>> {
		if let Some(p) = self.0.proto.borrow().properties.get(name) {
			return Some(Rc::clone(p));
		}
		self.parent().and_then(|p| p.find_property(name))
	}

	/// Resolves a method through the prototype chain.
	pub(crate) fn find_method(&self, name: &str) -> Option<Rc<MethodAxiom>> {
		if let Some(m) = self.0.proto.borrow().methods.get(name) {
			return Some(Rc::clone(m));
		}
		self.parent().and_then(|p| p.find_method(name))
	}

	/// Installed properties in declaration order, inherited first; an
	/// overridden name keeps its first-declared position.
	pub fn properties(&self) -> Vec<(String, Rc<PropertyAxiom>)> {
		let mut merged = FxIndexMap::default();
		self.collect_properties(&mut merged);
		merged.into_iter().collect()
	}

	fn collect_properties(&self, into: &mut FxIndexMap<String, Rc<PropertyAxiom>>) {
		if let Some(parent) = self.parent() {
			parent.collect_properties(into);
		}
		for (name, spec) in self.0.proto.borrow().properties.iter() {
			into.insert(name.clone(), Rc::clone(spec));
		}
	}

	/// Creates an instance: derive from the prototype chain, apply `args`
	/// in property-declaration order, then invoke `init` exactly once.
	///
	/// Arguments naming no installed property are discarded with a warning.
	pub fn create(&self, ctx: &Ctx, args: &[(&str, Value)]) -> Result<Object, ModelError> {
		let obj = Object::allocate(self.clone(), ctx.clone());
		for (name, _) in self.properties() {
			if let Some((_, v)) = args.iter().find(|(n, _)| *n == name) {
				obj.set(&name, v.clone())?;
			}
		}
		for (name, _) in args {
			if self.find_property(name).is_none() {
				warn!(class = %self.0.id, arg = %name, "create argument names no property; discarded");
			}
		}
		match obj.call("init", &[]) {
			Ok(_) | Err(ModelError::UnknownAxiom(_)) => {}
			Err(e) => return Err(e),
		}
		Ok(obj)
	}
}

impl fmt::Display for Class {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}Class", self.0.name)
	}
}

impl fmt::Debug for Class {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Class")
			.field("id", &self.0.id)
			.field("phase", &self.0.phase.get())
			.field("axioms", &self.0.axioms.borrow().len())
			.finish()
	}
}

/// Builds a class from a model.
///
/// A refinement looks the existing class up by id and mutates it in place,
/// preserving identity. A definition allocates a new class (parent: the
/// `extends` id, or the kernel base class when the context provides one)
/// and runs the two-pass installation. The new class is *not* registered;
/// see [`declare`].
pub fn build_class(model: &Model, ctx: &Ctx) -> Result<Class, ModelError> {
	if let Some(target) = model.refines() {
		let cls = ctx.lookup(target)?;
		debug!(id = target, "refining class in place");
		cls.install_model(model)?;
		return Ok(cls);
	}
	if model.name().is_empty() {
		return Err(ModelError::MissingIdentity);
	}
	let parent = match model.extends() {
		Some(pid) => Some(ctx.lookup(pid)?),
		None => ctx.find(crate::boot::BASE_CLASS),
	};
	let cls = Class::alloc(model.package(), model.name(), parent, BootPhase::Described);
	cls.install_model(model)?;
	debug!(id = %cls.id(), axioms = model.axioms().len(), "built class");
	Ok(cls)
}

/// Builds a class and registers it in `ctx`.
///
/// Idempotent for unchanged models: declaring an id that is already
/// resolvable returns the existing class untouched. Refinements always
/// pass through to [`build_class`].
pub fn declare(model: &Model, ctx: &Ctx) -> Result<Class, ModelError> {
	if model.refines().is_none()
		&& let Some(existing) = ctx.find(&model.id())
	{
		return Ok(existing);
	}
	let cls = build_class(model, ctx)?;
	if model.refines().is_none() {
		ctx.register(cls.clone())?;
	}
	Ok(cls)
}
