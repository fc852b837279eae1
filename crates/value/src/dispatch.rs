//! Flyweight per-category dispatch.
//!
//! Every [`Value`] belongs to exactly one runtime category (absent, null,
//! boolean, numeric, text, callable, array, date, object). [`type_of`]
//! returns the static dispatch unit for that category; the units carry the
//! equality, ordering, hashing and deep-clone behavior the instance
//! lifecycle delegates to.

use std::cmp::Ordering;
use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::Value;

/// Per-category operations on values.
///
/// `compare` is a total order across categories: values of different
/// categories order by a fixed category rank, values of the same category
/// order by content.
pub trait TypeOps {
	/// Category name, for diagnostics.
	fn name(&self) -> &'static str;

	/// Returns true if `v` belongs to this category.
	fn is_instance(&self, v: &Value) -> bool;

	/// Structural equality. Values of different categories are unequal,
	/// except that integers and floats compare numerically.
	fn equals(&self, a: &Value, b: &Value) -> bool;

	/// Total order (category rank first, then content).
	fn compare(&self, a: &Value, b: &Value) -> Ordering;

	/// Content hash. Equal values hash equally within a category.
	fn hash_code(&self, v: &Value) -> u64;

	/// Deep clone: arrays clone elementwise, objects clone recursively,
	/// scalars copy, callables share.
	fn clone_value(&self, v: &Value) -> Value;
}

/// Returns the dispatch unit for `v`'s category.
pub fn type_of(v: &Value) -> &'static dyn TypeOps {
	match v {
		Value::Absent => &ABSENT,
		Value::Null => &NULL,
		Value::Bool(_) => &BOOLEAN,
		Value::Int(_) | Value::Float(_) => &NUMBER,
		Value::Text(_) => &TEXT,
		Value::Fn(_) => &FUNCTION,
		Value::Array(_) => &ARRAY,
		Value::Date(_) => &DATE,
		Value::Object(_) => &OBJECT,
	}
}

/// Convenience: total-order comparison of two values.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
	type_of(a).compare(a, b)
}

fn rank(v: &Value) -> u8 {
	match v {
		Value::Absent => 0,
		Value::Null => 1,
		Value::Bool(_) => 2,
		Value::Int(_) | Value::Float(_) => 3,
		Value::Text(_) => 4,
		Value::Fn(_) => 5,
		Value::Array(_) => 6,
		Value::Date(_) => 7,
		Value::Object(_) => 8,
	}
}

fn hash_bytes(bytes: &[u8]) -> u64 {
	let mut h = FxHasher::default();
	h.write(bytes);
	h.finish()
}

macro_rules! cross_rank {
	($a:expr, $b:expr) => {
		match rank($a).cmp(&rank($b)) {
			Ordering::Equal => {}
			other => return other,
		}
	};
}

struct AbsentOps;
static ABSENT: AbsentOps = AbsentOps;

impl TypeOps for AbsentOps {
	fn name(&self) -> &'static str {
		"absent"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Absent)
	}

	fn equals(&self, _a: &Value, b: &Value) -> bool {
		matches!(b, Value::Absent)
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		Ordering::Equal
	}

	fn hash_code(&self, _v: &Value) -> u64 {
		hash_bytes(b"absent")
	}

	fn clone_value(&self, _v: &Value) -> Value {
		Value::Absent
	}
}

struct NullOps;
static NULL: NullOps = NullOps;

impl TypeOps for NullOps {
	fn name(&self) -> &'static str {
		"null"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Null)
	}

	fn equals(&self, _a: &Value, b: &Value) -> bool {
		matches!(b, Value::Null)
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		Ordering::Equal
	}

	fn hash_code(&self, _v: &Value) -> u64 {
		hash_bytes(b"null")
	}

	fn clone_value(&self, _v: &Value) -> Value {
		Value::Null
	}
}

struct BooleanOps;
static BOOLEAN: BooleanOps = BooleanOps;

impl TypeOps for BooleanOps {
	fn name(&self) -> &'static str {
		"boolean"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Bool(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		matches!((a, b), (Value::Bool(x), Value::Bool(y)) if x == y)
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Bool(x), Value::Bool(y)) => x.cmp(y),
			_ => unreachable!(),
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		match v {
			Value::Bool(b) => hash_bytes(&[*b as u8, 0xb0]),
			_ => 0,
		}
	}

	fn clone_value(&self, v: &Value) -> Value {
		v.clone()
	}
}

struct NumberOps;
static NUMBER: NumberOps = NumberOps;

fn as_f64(v: &Value) -> Option<f64> {
	match v {
		Value::Int(n) => Some(*n as f64),
		Value::Float(x) => Some(*x),
		_ => None,
	}
}

impl TypeOps for NumberOps {
	fn name(&self) -> &'static str {
		"number"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Int(_) | Value::Float(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		match (a, b) {
			// Exact integer comparison when no float is involved.
			(Value::Int(x), Value::Int(y)) => x == y,
			_ => match (as_f64(a), as_f64(b)) {
				(Some(x), Some(y)) => x == y,
				_ => false,
			},
		}
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Int(x), Value::Int(y)) => x.cmp(y),
			_ => {
				let (x, y) = (as_f64(a).unwrap_or(f64::NAN), as_f64(b).unwrap_or(f64::NAN));
				x.partial_cmp(&y).unwrap_or(Ordering::Equal)
			}
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		// Ints and whole floats must hash alike, since they compare equal.
		let x = as_f64(v).unwrap_or(f64::NAN);
		let bits = if x == 0.0 { 0u64 } else { x.to_bits() };
		hash_bytes(&bits.to_le_bytes())
	}

	fn clone_value(&self, v: &Value) -> Value {
		v.clone()
	}
}

struct TextOps;
static TEXT: TextOps = TextOps;

impl TypeOps for TextOps {
	fn name(&self) -> &'static str {
		"text"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Text(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		matches!((a, b), (Value::Text(x), Value::Text(y)) if x == y)
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Text(x), Value::Text(y)) => x.cmp(y),
			_ => unreachable!(),
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		match v {
			Value::Text(s) => hash_bytes(s.as_bytes()),
			_ => 0,
		}
	}

	fn clone_value(&self, v: &Value) -> Value {
		v.clone()
	}
}

struct FunctionOps;
static FUNCTION: FunctionOps = FunctionOps;

impl TypeOps for FunctionOps {
	fn name(&self) -> &'static str {
		"function"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Fn(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		matches!((a, b), (Value::Fn(x), Value::Fn(y)) if x.ptr_eq(y))
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Fn(x), Value::Fn(y)) => x.addr().cmp(&y.addr()),
			_ => unreachable!(),
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		match v {
			Value::Fn(f) => hash_bytes(&f.addr().to_le_bytes()),
			_ => 0,
		}
	}

	fn clone_value(&self, v: &Value) -> Value {
		// Callables are immutable; a clone shares the same function.
		v.clone()
	}
}

struct ArrayOps;
static ARRAY: ArrayOps = ArrayOps;

impl TypeOps for ArrayOps {
	fn name(&self) -> &'static str {
		"array"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Array(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		match (a, b) {
			(Value::Array(xs), Value::Array(ys)) => {
				xs.len() == ys.len()
					&& xs.iter().zip(ys).all(|(x, y)| type_of(x).equals(x, y))
			}
			_ => false,
		}
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Array(xs), Value::Array(ys)) => {
				for (x, y) in xs.iter().zip(ys) {
					match compare_values(x, y) {
						Ordering::Equal => {}
						other => return other,
					}
				}
				xs.len().cmp(&ys.len())
			}
			_ => unreachable!(),
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		match v {
			Value::Array(xs) => {
				let mut h = FxHasher::default();
				for x in xs {
					h.write_u64(type_of(x).hash_code(x));
				}
				h.finish()
			}
			_ => 0,
		}
	}

	fn clone_value(&self, v: &Value) -> Value {
		match v {
			Value::Array(xs) => {
				Value::Array(xs.iter().map(|x| type_of(x).clone_value(x)).collect())
			}
			_ => Value::Absent,
		}
	}
}

struct DateOps;
static DATE: DateOps = DateOps;

impl TypeOps for DateOps {
	fn name(&self) -> &'static str {
		"date"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Date(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		matches!((a, b), (Value::Date(x), Value::Date(y)) if x == y)
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Date(x), Value::Date(y)) => x.cmp(y),
			_ => unreachable!(),
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		match v {
			Value::Date(d) => hash_bytes(&d.timestamp_millis().to_le_bytes()),
			_ => 0,
		}
	}

	fn clone_value(&self, v: &Value) -> Value {
		v.clone()
	}
}

struct ObjectOps;
static OBJECT: ObjectOps = ObjectOps;

impl TypeOps for ObjectOps {
	fn name(&self) -> &'static str {
		"object"
	}

	fn is_instance(&self, v: &Value) -> bool {
		matches!(v, Value::Object(_))
	}

	fn equals(&self, a: &Value, b: &Value) -> bool {
		match (a, b) {
			(Value::Object(x), Value::Object(y)) => x.object_equals(y.as_ref()),
			_ => false,
		}
	}

	fn compare(&self, a: &Value, b: &Value) -> Ordering {
		cross_rank!(a, b);
		match (a, b) {
			(Value::Object(x), Value::Object(y)) => x.identity().cmp(&y.identity()),
			_ => unreachable!(),
		}
	}

	fn hash_code(&self, v: &Value) -> u64 {
		match v {
			Value::Object(o) => hash_bytes(&o.identity().to_le_bytes()),
			_ => 0,
		}
	}

	fn clone_value(&self, v: &Value) -> Value {
		match v {
			Value::Object(o) => o.deep_clone(),
			_ => Value::Absent,
		}
	}
}
