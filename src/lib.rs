//! MiniLua is an interpreter for a subset of Lua with a twist: every value
//! remembers the source expression that produced it, and operations on values
//! can compute a [`SourceChange`] — a proposed edit to the program text that
//! would make the value take a desired target.
//!
//! Running a program therefore yields both a result value and an optional
//! tree of candidate source edits, which can be applied, re-parsed and
//! re-evaluated:
//!
//! ```no_run
//! use minilua::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! assert!(interpreter.parse("x = 1 + 2").is_ok());
//! minilua::stdlib::register(interpreter.environment());
//!
//! interpreter.evaluate().unwrap();
//! let x = interpreter.environment().get("x");
//!
//! // Propose edits that would make `x` evaluate to 10 instead.
//! if let Some(change) = x.force(&minilua::Value::from(10.0)) {
//! 	interpreter.apply_source_change(&change).unwrap();
//! 	interpreter.evaluate().unwrap();
//! 	assert_eq!(interpreter.environment().get("x"), minilua::Value::from(10.0));
//! }
//! ```

pub mod ast;
mod container;
pub mod env;
mod error;
mod eval;
mod interpreter;
mod location;
mod origin;
pub mod parse;
mod source_change;
pub mod stdlib;
pub mod value;

pub use container::{Mutable, RefCount};
pub use env::Environment;
pub use error::{Error, ErrorKind, Result};
pub use interpreter::{EvalResult, Interpreter, InterpreterConfig};
pub use location::{Edit, Location, Point, Range};
pub use origin::Origin;
pub use parse::{ParseError, ParseResult};
pub use source_change::SourceChange;
pub use value::{CallContext, CallResult, Function, Number, Table, Vallist, Value};
