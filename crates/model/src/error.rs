use thiserror::Error;
use weft_context::ContextError;

/// Errors raised by class construction and the instance lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
	/// A custom axiom offers neither `install_in_class` nor
	/// `install_in_proto`.
	#[error("invalid axiom: {0} provides no installer hook")]
	InvalidAxiom(String),
	/// A non-refinement Model without a name.
	#[error("model is missing identity (name/id) and is not a refinement")]
	MissingIdentity,
	/// An operation named an axiom that does not exist or is not the
	/// expected kind (clearing a non-property, calling a non-method).
	#[error("unknown axiom: {0}")]
	UnknownAxiom(String),
	/// Context registration or lookup failure during construction.
	#[error(transparent)]
	Context(#[from] ContextError),
}
