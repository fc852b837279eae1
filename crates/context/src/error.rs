use thiserror::Error;

/// Errors raised by context registration and lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
	/// The id is already registered in this context's own cache.
	/// Shadowing an ancestor's registration is allowed; colliding with a
	/// sibling entry in the same cache is not.
	#[error("duplicate registration: {0}")]
	DuplicateRegistration(String),
	/// Lookup of an id that is registered nowhere on the parent chain.
	#[error("unresolved reference: {0}")]
	UnresolvedReference(String),
}
