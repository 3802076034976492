//! The table type: a shared-identity mapping from values to values.

use super::{Number, Value};
use crate::container::{Mutable, RefCount};
use crate::error::{Error, ErrorKind, Result};
use indexmap::IndexMap;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};

/// A Lua table.
///
/// Tables are reference types: cloning shares the underlying storage, and two
/// tables are equal iff they are the *same* table. Keys may be any value
/// except nil and NaN.
#[derive(Clone, Default)]
pub struct Table(RefCount<Mutable<IndexMap<Value, Value>>>);

impl Table {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// An address uniquely identifying this table while it is alive.
	#[must_use]
	pub fn id(&self) -> usize {
		RefCount::as_ptr(&self.0) as *const () as usize
	}

	/// Looks up `key`. Missing entries are nil.
	pub fn get(&self, key: &Value) -> Result<Value> {
		let key = normalize_key(key.clone())?;
		Ok(self.0.read().get(&key).cloned().unwrap_or_else(Value::nil))
	}

	/// Inserts `key = value`. Setting a key to nil removes the entry.
	pub fn set(&self, key: Value, value: Value) -> Result<()> {
		let key = normalize_key(key)?;

		if value.is_nil() {
			self.0.write().shift_remove(&key);
		} else {
			self.0.write().insert(key, value);
		}

		Ok(())
	}

	/// The `#` border: the number of consecutive non-nil entries starting at
	/// key 1. (Lua allows any n with `t[n] ~= nil and t[n + 1] == nil`; this
	/// implementation always picks the smallest.)
	#[must_use]
	pub fn border(&self) -> usize {
		let map = self.0.read();
		let mut n = 0;
		while map.contains_key(&Value::from(Number::new((n + 1) as f64))) {
			n += 1;
		}
		n
	}

	/// The number of entries (not the `#` border).
	#[must_use]
	pub fn entry_count(&self) -> usize {
		self.0.read().len()
	}

	/// A snapshot of the entries in insertion order.
	#[must_use]
	pub fn entries(&self) -> Vec<(Value, Value)> {
		self.0.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}
}

/// Rejects nil and NaN keys and collapses `-0.0` into `0.0` so the two zeros
/// address the same slot, matching Lua.
fn normalize_key(key: Value) -> Result<Value> {
	match key.as_number() {
		_ if key.is_nil() => Err(Error::new(ErrorKind::InvalidTableKey("nil"))),
		Some(n) if n.is_nan() => Err(Error::new(ErrorKind::InvalidTableKey("NaN"))),
		Some(n) if n.value() == 0.0 => Ok(Value::from(Number::ZERO)),
		_ => Ok(key),
	}
}

impl PartialEq for Table {
	/// Tables compare by identity, not contents.
	fn eq(&self, rhs: &Self) -> bool {
		RefCount::ptr_eq(&self.0, &rhs.0)
	}
}
impl Eq for Table {}

impl Hash for Table {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id().hash(state);
	}
}

impl Debug for Table {
	// deliberately shallow: tables can contain themselves
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Table({:#x})", self.id())
	}
}
