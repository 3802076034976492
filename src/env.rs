//! Lexical environments: a chain of scopes ending in the global scope.
//!
//! Each scope maps identifiers to *binding slots*. Slots are shared by
//! reference, so a closure that captured a scope chain observes assignments
//! made through that chain after the capture.

use crate::container::{Mutable, RefCount};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

/// A binding slot, shared between every scope handle and closure that can
/// reach it.
pub type Slot = RefCount<Mutable<Value>>;

/// A handle on one scope in a chain. Cloning shares the scope.
#[derive(Clone)]
pub struct Scope(RefCount<Mutable<ScopeData>>);

struct ScopeData {
	bindings: HashMap<String, Slot>,
	parent: Option<Scope>,
}

impl Scope {
	/// Creates a root (global) scope.
	#[must_use]
	pub fn new() -> Self {
		Self(RefCount::new(ScopeData { bindings: HashMap::new(), parent: None }.into()))
	}

	/// Pushes an empty scope whose parent is `self`.
	#[must_use]
	pub fn new_child(&self) -> Self {
		Self(RefCount::new(
			ScopeData { bindings: HashMap::new(), parent: Some(self.clone()) }.into(),
		))
	}

	/// Binds `name` in this scope, shadowing any outer binding. A fresh slot
	/// is always created, so closures over a previous binding of the same
	/// name keep seeing the old slot.
	pub fn set_local(&self, name: impl Into<String>, value: Value) {
		self.0.write().bindings.insert(name.into(), RefCount::new(value.into()));
	}

	/// Assigns through the nearest visible binding. If no scope in the chain
	/// binds `name`, the value becomes a global ("Lua global by default").
	pub fn set_var(&self, name: &str, value: Value) {
		match self.slot(name) {
			Some(slot) => *slot.write() = value,
			None => self.root().set_local(name, value),
		}
	}

	/// Looks `name` up innermost-outward. Unbound names are nil.
	#[must_use]
	pub fn get_var(&self, name: &str) -> Value {
		match self.slot(name) {
			Some(slot) => slot.read().clone(),
			None => Value::nil(),
		}
	}

	/// The slot `name` currently resolves to, if any.
	#[must_use]
	pub fn slot(&self, name: &str) -> Option<Slot> {
		let data = self.0.read();
		match data.bindings.get(name) {
			Some(slot) => Some(slot.clone()),
			None => data.parent.as_ref().and_then(|parent| parent.slot(name)),
		}
	}

	/// The global scope at the end of this chain.
	#[must_use]
	pub fn root(&self) -> Self {
		let parent = self.0.read().parent.clone();
		match parent {
			Some(parent) => parent.root(),
			None => self.clone(),
		}
	}
}

impl Default for Scope {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for Scope {
	// deliberately shallow: closures make scope chains cyclic
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		let data = self.0.read();
		f.debug_struct("Scope")
			.field("names", &data.bindings.keys().collect::<Vec<_>>())
			.field("depth", &{
				let mut depth = 0usize;
				let mut current = data.parent.clone();
				while let Some(scope) = current {
					depth += 1;
					current = scope.0.read().parent.clone();
				}
				depth
			})
			.finish()
	}
}

/// The persistent global environment of an [`Interpreter`](crate::Interpreter).
///
/// It survives re-parsing and repeated evaluation, so values (including
/// functions and tables) registered here are visible to every program run by
/// the same interpreter.
#[derive(Debug, Default)]
pub struct Environment {
	root: Scope,
}

impl Environment {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Defines (or overwrites) a global.
	///
	/// This is also the native-function registration point:
	/// `env.set("print", Value::from(Function::native("print", ...)))`.
	pub fn set(&mut self, name: impl Into<String>, value: Value) {
		self.root.set_local(name, value);
	}

	/// Reads a global; unbound names are nil.
	#[must_use]
	pub fn get(&self, name: &str) -> Value {
		self.root.get_var(name)
	}

	/// The global scope, usable as the base of evaluation scope chains.
	#[must_use]
	pub fn scope(&self) -> &Scope {
		&self.root
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_walks_outward() {
		let root = Scope::new();
		root.set_local("x", Value::from(1.0));

		let child = root.new_child();
		assert_eq!(child.get_var("x"), Value::from(1.0));
		assert_eq!(child.get_var("missing"), Value::nil());
	}

	#[test]
	fn locals_shadow_and_pop() {
		let root = Scope::new();
		root.set_local("x", Value::from(1.0));

		let child = root.new_child();
		child.set_local("x", Value::from(2.0));
		assert_eq!(child.get_var("x"), Value::from(2.0));

		// dropping the child scope reveals the outer binding again
		drop(child);
		assert_eq!(root.get_var("x"), Value::from(1.0));
	}

	#[test]
	fn set_var_writes_through_to_the_binding_scope() {
		let root = Scope::new();
		root.set_local("x", Value::from(1.0));

		let child = root.new_child();
		child.set_var("x", Value::from(2.0));

		assert_eq!(root.get_var("x"), Value::from(2.0));
	}

	#[test]
	fn unbound_assignment_goes_to_the_root() {
		let root = Scope::new();
		let inner = root.new_child().new_child();

		inner.set_var("g", Value::from(true));
		assert_eq!(root.get_var("g"), Value::from(true));
	}

	#[test]
	fn slots_are_shared_by_reference() {
		let root = Scope::new();
		root.set_local("x", Value::from(1.0));

		// a "closure" captures the chain
		let captured = root.new_child();

		root.set_var("x", Value::from(99.0));
		assert_eq!(captured.get_var("x"), Value::from(99.0));
	}

	#[test]
	fn fresh_local_does_not_disturb_captured_slot() {
		let root = Scope::new();
		root.set_local("x", Value::from(1.0));
		let old_slot = root.slot("x").unwrap();

		root.set_local("x", Value::from(2.0));

		// the old slot still holds the old value
		assert_eq!(*old_slot.read(), Value::from(1.0));
		assert_eq!(root.get_var("x"), Value::from(2.0));
	}

	#[test]
	fn environment_globals_are_visible_from_scopes() {
		let mut env = Environment::new();
		env.set("answer", Value::from(42.0));

		let scope = env.scope().new_child();
		assert_eq!(scope.get_var("answer"), Value::from(42.0));
	}
}
