use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// The reference-counted pointer used for all shared-identity state (tables,
/// functions, scopes, binding slots).
///
/// The interpreter is single-threaded, so this is plain [`Rc`].
pub type RefCount<T> = Rc<T>;

/// Interior mutability for values behind a [`RefCount`].
#[derive(Debug, Default)]
pub struct Mutable<T>(RefCell<T>);

impl<T> From<T> for Mutable<T> {
	fn from(inp: T) -> Self {
		Self(RefCell::new(inp))
	}
}

impl<T> Mutable<T> {
	pub fn read(&self) -> impl Deref<Target = T> + '_ {
		self.0.borrow()
	}

	pub fn write(&self) -> impl DerefMut<Target = T> + '_ {
		self.0.borrow_mut()
	}
}
