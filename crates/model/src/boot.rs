//! The multi-phase bootstrap.
//!
//! The class system describes itself, which needs a hand-built start:
//!
//! - **Phase 1 (raw)**: [`Class::raw`] builds bare classes for the kernel
//!   (the base object class, Model, Property, Method) entirely outside the
//!   Model machinery — prototype entries copied verbatim, no axiom maps,
//!   no change notification.
//! - **Phase 2 (self-describing)**: each raw class is re-built from a real
//!   [`Model`] describing it, through `refines` semantics: looked up by id
//!   and upgraded in place without changing identity. Afterwards the
//!   kernel classes carry real axiom maps and are introspectable like any
//!   other class.
//! - **Phase 3 (axiom-driven)**: from here on every class goes through the
//!   uniform two-pass installation loop in [`build_class`].
//!
//! The root context is created here, once per thread of use, before any
//! class exists; it is frozen immediately and never torn down.

use std::cell::OnceCell;
use std::rc::Rc;

use tracing::debug;
use weft_value::Value;

use crate::axiom::MethodAxiom;
use crate::class::{Class, Ctx, build_class};
use crate::model::Model;
use crate::object::Object;

/// Package holding the kernel classes.
pub const CORE_PACKAGE: &str = "weft.core";
/// Id of the base class every definition extends by default.
pub const BASE_CLASS: &str = "weft.core.FObject";
/// Id of the class describing models.
pub const MODEL_CLASS: &str = "weft.core.Model";
/// Id of the class describing property axioms.
pub const PROPERTY_CLASS: &str = "weft.core.Property";
/// Id of the class describing method axioms.
pub const METHOD_CLASS: &str = "weft.core.Method";

thread_local! {
	static ROOT: OnceCell<Ctx> = const { OnceCell::new() };
}

/// The process-wide root context, booted on first access.
///
/// Repeated calls return the same frozen context; all kernel classes are
/// registered in it.
pub fn root_context() -> Ctx {
	ROOT.with(|c| c.get_or_init(boot).clone())
}

fn boot() -> Ctx {
	let ctx = Ctx::new_root();
	phase_one(&ctx);
	phase_two(&ctx);
	ctx
}

fn raw_method(code: impl Fn(&Object, &[Value]) -> Value + 'static) -> Rc<MethodAxiom> {
	Rc::new(MethodAxiom {
		code: Rc::new(code),
		doc: String::new(),
	})
}

/// Phase 1: just enough raw classes for phase 2 to run.
fn phase_one(ctx: &Ctx) {
	debug!("bootstrap phase 1: raw kernel classes");
	let base = Class::raw(CORE_PACKAGE, "FObject", None);
	base.raw_install_method("init", raw_method(|_, _| Value::Absent));
	base.raw_install_method(
		"toString",
		raw_method(|obj, _| Value::Text(obj.class().name().to_owned())),
	);
	base.raw_install_method(
		"equals",
		raw_method(|obj, args| {
			let eq = args
				.first()
				.and_then(Object::from_value)
				.is_some_and(|other| obj.ptr_eq(&other));
			Value::Bool(eq)
		}),
	);

	let model = Class::raw(CORE_PACKAGE, "Model", Some(base.clone()));
	let property = Class::raw(CORE_PACKAGE, "Property", Some(base.clone()));
	let method = Class::raw(CORE_PACKAGE, "Method", Some(base.clone()));

	for cls in [base, model, property, method] {
		ctx.register(cls).expect("kernel registration");
	}
}

/// Phase 2: every raw kernel class is re-described by a real model and
/// upgraded in place (`refines` preserves identity).
fn phase_two(ctx: &Ctx) {
	debug!("bootstrap phase 2: self-description");
	for model in kernel_models() {
		build_class(&model, ctx).expect("kernel bootstrap");
	}
}

fn kernel_models() -> Vec<Model> {
	vec![
		Model::refine(BASE_CLASS)
			.method("init", |_, _| Value::Absent)
			.method("toString", |obj, _| {
				Value::Text(obj.class().name().to_owned())
			})
			.method("equals", |obj, args| {
				let eq = args
					.first()
					.and_then(Object::from_value)
					.is_some_and(|other| obj.ptr_eq(&other));
				Value::Bool(eq)
			})
			.build(),
		Model::refine(MODEL_CLASS)
			.property("id", "")
			.property("name", "")
			.property("package", "")
			.property("extends", Value::Null)
			.property("refines", Value::Null)
			.property("axioms", Value::Array(Vec::new()))
			.build(),
		Model::refine(PROPERTY_CLASS)
			.property("name", "")
			.property("default", Value::Absent)
			.property("factory", Value::Null)
			.property("doc", "")
			.build(),
		Model::refine(METHOD_CLASS)
			.property("name", "")
			.property("code", Value::Null)
			.property("doc", "")
			.build(),
	]
}
