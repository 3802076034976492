//! The value model.
//!
//! A [`Value`] is a tagged union of the six Lua types of this subset, plus an
//! [`Origin`] recording which source expression produced it. Origins travel
//! with values through operators, assignments and environment lookups, which
//! is what makes [`Value::force`] possible.

mod function;
mod number;
pub(crate) mod ops;
mod string;
mod table;

pub use function::{CallContext, CallResult, Closure, Function, FunctionKind, Native, Vallist};
pub use number::Number;
pub use string::LuaString;
pub use table::Table;

use crate::origin::Origin;
use crate::source_change::SourceChange;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// A Lua value together with its origin.
#[derive(Debug, Clone)]
pub struct Value {
	kind: ValueKind,
	origin: Origin,
}

/// The actual data of a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
	Nil,
	Bool(bool),
	Number(Number),
	String(LuaString),
	Table(Table),
	Function(Function),
}

impl Value {
	/// The nil value, with no origin.
	#[must_use]
	pub fn nil() -> Self {
		Self { kind: ValueKind::Nil, origin: Origin::None }
	}

	#[must_use]
	pub fn new(kind: ValueKind) -> Self {
		Self { kind, origin: Origin::None }
	}

	#[must_use]
	pub fn kind(&self) -> &ValueKind {
		&self.kind
	}

	#[must_use]
	pub fn origin(&self) -> &Origin {
		&self.origin
	}

	/// The same value with a different origin.
	#[must_use]
	pub fn with_origin(mut self, origin: Origin) -> Self {
		self.origin = origin;
		self
	}

	/// The same value with its origin stripped.
	#[must_use]
	pub fn without_origin(self) -> Self {
		self.with_origin(Origin::None)
	}

	#[must_use]
	pub fn is_nil(&self) -> bool {
		matches!(self.kind, ValueKind::Nil)
	}

	/// Lua truthiness: everything except nil and false is truthy.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		!matches!(self.kind, ValueKind::Nil | ValueKind::Bool(false))
	}

	/// The Lua type name, as returned by `type()`.
	#[must_use]
	pub fn type_name(&self) -> &'static str {
		match &self.kind {
			ValueKind::Nil => "nil",
			ValueKind::Bool(_) => "boolean",
			ValueKind::Number(_) => "number",
			ValueKind::String(_) => "string",
			ValueKind::Table(_) => "table",
			ValueKind::Function(_) => "function",
		}
	}

	#[must_use]
	pub fn as_number(&self) -> Option<Number> {
		match &self.kind {
			ValueKind::Number(n) => Some(*n),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match &self.kind {
			ValueKind::String(s) => Some(s.as_str()),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_table(&self) -> Option<&Table> {
		match &self.kind {
			ValueKind::Table(t) => Some(t),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_function(&self) -> Option<&Function> {
		match &self.kind {
			ValueKind::Function(f) => Some(f),
			_ => None,
		}
	}

	/// Arithmetic coercion: numbers pass through, strings that spell a Lua
	/// numeral are converted.
	#[must_use]
	pub fn coerce_number(&self) -> Option<Number> {
		match &self.kind {
			ValueKind::Number(n) => Some(*n),
			ValueKind::String(s) => Number::parse(s.as_str()),
			_ => None,
		}
	}

	/// Concatenation coercion: strings pass through, numbers take their
	/// canonical string form.
	#[must_use]
	pub fn coerce_string(&self) -> Option<String> {
		match &self.kind {
			ValueKind::String(s) => Some(s.as_str().to_string()),
			ValueKind::Number(n) => Some(n.to_literal()),
			_ => None,
		}
	}

	/// Source text that would evaluate to this value, or `None` for tables
	/// and functions, which have no literal form.
	#[must_use]
	pub fn to_literal(&self) -> Option<String> {
		match &self.kind {
			ValueKind::Nil => Some("nil".to_string()),
			ValueKind::Bool(b) => Some(b.to_string()),
			ValueKind::Number(n) => Some(n.to_literal()),
			ValueKind::String(s) => Some(s.to_literal()),
			ValueKind::Table(_) | ValueKind::Function(_) => None,
		}
	}

	/// Computes an edit tree that, applied to the source and re-evaluated,
	/// would make this value equal `target`. Returns `None` when the origin
	/// carries too little information to invert.
	#[must_use]
	pub fn force(&self, target: &Value) -> Option<SourceChange> {
		self.origin.force(target)
	}
}

impl PartialEq for Value {
	/// Lua equality; origins are ignored. NaN is unequal to itself, tables
	/// and functions compare by identity.
	fn eq(&self, rhs: &Self) -> bool {
		self.kind == rhs.kind
	}
}

// Sound because the NaN numbers, the only non-reflexive values, are rejected
// as table keys before hashing ever happens.
impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(&self.kind).hash(state);
		match &self.kind {
			ValueKind::Nil => {}
			ValueKind::Bool(b) => b.hash(state),
			ValueKind::Number(n) => {
				// -0.0 == 0.0, so they must hash alike; NaN never reaches here
				let value = if n.value() == 0.0 { 0.0 } else { n.value() };
				value.to_bits().hash(state);
			}
			ValueKind::String(s) => s.hash(state),
			ValueKind::Table(t) => t.hash(state),
			ValueKind::Function(f) => f.hash(state),
		}
	}
}

impl Display for Value {
	/// The `tostring` rendering.
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match &self.kind {
			ValueKind::Nil => f.write_str("nil"),
			ValueKind::Bool(b) => Display::fmt(b, f),
			ValueKind::Number(n) => Display::fmt(n, f),
			ValueKind::String(s) => Display::fmt(s, f),
			ValueKind::Table(t) => write!(f, "table: {:#x}", t.id()),
			ValueKind::Function(func) => write!(f, "function: {:#x}", func.id()),
		}
	}
}

impl Default for Value {
	fn default() -> Self {
		Self::nil()
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::new(ValueKind::Bool(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::new(ValueKind::Number(Number::new(value)))
	}
}

impl From<Number> for Value {
	fn from(value: Number) -> Self {
		Self::new(ValueKind::Number(value))
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::new(ValueKind::String(value.into()))
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::new(ValueKind::String(value.into()))
	}
}

impl From<LuaString> for Value {
	fn from(value: LuaString) -> Self {
		Self::new(ValueKind::String(value))
	}
}

impl From<Table> for Value {
	fn from(value: Table) -> Self {
		Self::new(ValueKind::Table(value))
	}
}

impl From<Function> for Value {
	fn from(value: Function) -> Self {
		Self::new(ValueKind::Function(value))
	}
}
