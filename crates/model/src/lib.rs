//! The class runtime: Axioms, Models, Classes, instances and bootstrap.
//!
//! Classes are built at runtime from declarative [`Model`] descriptions
//! composed of [`Axiom`]s. Construction is a two-pass protocol (register
//! all axioms by name, then run their installers in declaration order) on
//! top of a hand-built kernel that the system upgrades in place to
//! describe itself — see [`boot`](root_context).
//!
//! Instances ([`Object`]) publish property changes over their own topic
//! tree; the [`Slot`] contract layers reactive cells over that.

mod axiom;
mod boot;
mod class;
mod error;
mod model;
mod object;
mod slot;

pub use axiom::{
	Axiom, AxiomKind, AxiomSpec, ClassInstaller, CustomAxiom, Factory, MethodAxiom, MethodFn,
	PropertyAxiom, ProtoInstaller,
};
pub use boot::{
	BASE_CLASS, CORE_PACKAGE, METHOD_CLASS, MODEL_CLASS, PROPERTY_CLASS, root_context,
};
pub use class::{BootPhase, Class, Ctx, Proto, build_class, declare};
pub use error::ModelError;
pub use model::{Model, ModelBuilder};
pub use object::{Object, PROPERTY_CHANGE};
pub use slot::{PropertySlot, Slot, SlotRef};
