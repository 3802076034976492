//! Function values and the native-function protocol.

use super::Value;
use crate::ast::FunctionBody;
use crate::container::RefCount;
use crate::env::Scope;
use crate::error::Result;
use crate::location::Range;
use crate::source_change::SourceChange;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};

/// A callable value: either a function defined in Lua source or a native
/// function provided by the host.
///
/// Functions are reference types with identity equality, like
/// [`Table`](crate::Table).
#[derive(Clone)]
pub struct Function(RefCount<FunctionKind>);

pub enum FunctionKind {
	/// A closure: a function literal plus the scope chain it captured.
	Lua(Closure),
	/// A host-provided callable.
	Native(Native),
}

pub struct Closure {
	pub body: RefCount<FunctionBody>,
	/// Captured by reference: assignments through this chain after capture
	/// are visible inside the closure.
	pub scope: Scope,
}

pub struct Native {
	pub name: String,
	pub func: Box<dyn Fn(CallContext) -> Result<CallResult>>,
}

impl Function {
	/// Wraps a host function. `name` is used in error messages.
	#[must_use]
	pub fn native<F>(name: impl Into<String>, func: F) -> Self
	where
		F: Fn(CallContext) -> Result<CallResult> + 'static,
	{
		Self(RefCount::new(FunctionKind::Native(Native {
			name: name.into(),
			func: Box::new(func),
		})))
	}

	pub(crate) fn closure(body: RefCount<FunctionBody>, scope: Scope) -> Self {
		Self(RefCount::new(FunctionKind::Lua(Closure { body, scope })))
	}

	#[must_use]
	pub fn kind(&self) -> &FunctionKind {
		&self.0
	}

	/// The registered name for natives, `None` for Lua functions.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		match self.kind() {
			FunctionKind::Native(native) => Some(&native.name),
			FunctionKind::Lua(_) => None,
		}
	}

	/// An address uniquely identifying this function while it is alive.
	#[must_use]
	pub fn id(&self) -> usize {
		RefCount::as_ptr(&self.0) as *const () as usize
	}
}

impl PartialEq for Function {
	/// Functions are only equal if they're the same function.
	fn eq(&self, rhs: &Self) -> bool {
		RefCount::ptr_eq(&self.0, &rhs.0)
	}
}
impl Eq for Function {}

impl Hash for Function {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id().hash(state);
	}
}

impl Debug for Function {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self.kind() {
			FunctionKind::Lua(closure) => {
				f.debug_tuple("Function").field(&closure.body.range).finish()
			}
			FunctionKind::Native(native) => f.debug_tuple("NativeFunction").field(&native.name).finish(),
		}
	}
}

/// An ordered sequence of values, used for call arguments and multiple
/// returns. Reading past the end yields nil.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vallist(Vec<Value>);

impl Vallist {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The value at `index`, nil when out of range.
	#[must_use]
	pub fn get(&self, index: usize) -> Value {
		self.0.get(index).cloned().unwrap_or_else(Value::nil)
	}

	/// The first value; the single-value view of a call result.
	#[must_use]
	pub fn first(&self) -> Value {
		self.get(0)
	}

	pub fn push(&mut self, value: Value) {
		self.0.push(value);
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Value> {
		self.0.iter()
	}
}

impl From<Vec<Value>> for Vallist {
	fn from(values: Vec<Value>) -> Self {
		Self(values)
	}
}

impl From<Value> for Vallist {
	fn from(value: Value) -> Self {
		Self(vec![value])
	}
}

impl IntoIterator for Vallist {
	type Item = Value;
	type IntoIter = std::vec::IntoIter<Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a Vallist {
	type Item = &'a Value;
	type IntoIter = std::slice::Iter<'a, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Everything a native function gets to see about its call site.
pub struct CallContext {
	scope: Scope,
	location: Option<Range>,
	args: Vallist,
}

impl CallContext {
	#[must_use]
	pub fn new(scope: Scope, location: Option<Range>, args: Vallist) -> Self {
		Self { scope, location, args }
	}

	/// The range of the call expression, when called from evaluated source.
	#[must_use]
	pub fn call_location(&self) -> Option<Range> {
		self.location
	}

	/// The arguments, in order.
	#[must_use]
	pub fn arguments(&self) -> &Vallist {
		&self.args
	}

	/// Looks up a variable visible at the call site.
	#[must_use]
	pub fn get(&self, name: &str) -> Value {
		self.scope.get_var(name)
	}

	/// Assigns a variable visible at the call site (global by default).
	pub fn set(&self, name: &str, value: Value) {
		self.scope.set_var(name, value);
	}
}

/// What a native function returns: zero or more values, and optionally a
/// [`SourceChange`] to propose to the caller.
#[derive(Debug, Default)]
pub struct CallResult {
	values: Vallist,
	source_change: Option<SourceChange>,
}

impl CallResult {
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn new(values: impl Into<Vallist>) -> Self {
		Self { values: values.into(), source_change: None }
	}

	#[must_use]
	pub fn with_source_change(mut self, change: Option<SourceChange>) -> Self {
		self.source_change = change;
		self
	}

	#[must_use]
	pub fn values(&self) -> &Vallist {
		&self.values
	}

	#[must_use]
	pub fn source_change(&self) -> Option<&SourceChange> {
		self.source_change.as_ref()
	}

	pub(crate) fn into_parts(self) -> (Vallist, Option<SourceChange>) {
		(self.values, self.source_change)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vallist_pads_with_nil() {
		let list = Vallist::from(vec![Value::from(1.0)]);
		assert_eq!(list.get(0), Value::from(1.0));
		assert_eq!(list.get(1), Value::nil());
		assert_eq!(Vallist::new().first(), Value::nil());
	}

	#[test]
	fn natives_have_identity_equality() {
		let a = Function::native("id", |ctx| Ok(CallResult::new(ctx.arguments().first())));
		let b = Function::native("id", |ctx| Ok(CallResult::new(ctx.arguments().first())));

		assert_ne!(a, b);
		assert_eq!(a, a.clone());
	}

	#[test]
	fn call_context_reads_and_writes_the_scope() {
		let scope = Scope::new();
		scope.set_local("x", Value::from(5.0));

		let ctx = CallContext::new(scope.clone(), None, Vallist::new());
		assert_eq!(ctx.get("x"), Value::from(5.0));

		ctx.set("y", Value::from(6.0));
		assert_eq!(scope.get_var("y"), Value::from(6.0));
	}
}
