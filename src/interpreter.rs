//! The interpreter façade: hold source, parse it, evaluate it, and feed
//! proposed source changes back into the text.

use crate::ast::Block;
use crate::container::RefCount;
use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::eval::Evaluator;
use crate::location::Edit;
use crate::parse::{LuaParser, ParseResult};
use crate::source_change::SourceChange;
use crate::value::Value;

/// Evaluator knobs. Both tracing flags emit `tracing::trace!` events; wiring
/// up a subscriber is the caller's business.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterConfig {
	/// Emit an event when entering/exiting each visited syntax node.
	pub trace_nodes: bool,
	/// Emit an event for each function call.
	pub trace_calls: bool,
}

/// What [`Interpreter::evaluate`] produces: the value of the program and the
/// combined tree of source changes proposed during the run.
#[derive(Debug)]
pub struct EvalResult {
	pub value: Value,
	pub source_change: Option<SourceChange>,
}

/// An interpreter instance: current source text, its parsed form, and the
/// persistent global [`Environment`].
///
/// ```no_run
/// let mut interpreter = minilua::Interpreter::new();
/// assert!(interpreter.parse("x = 1 + 2").is_ok());
///
/// let result = interpreter.evaluate().unwrap();
/// if let Some(change) = result.source_change {
/// 	interpreter.apply_source_change(&change).unwrap();
/// 	interpreter.evaluate().unwrap();
/// }
/// ```
pub struct Interpreter {
	parser: LuaParser,
	source: String,
	chunk: Option<RefCount<Block>>,
	env: Environment,
	config: InterpreterConfig,
}

impl Interpreter {
	/// An interpreter holding the empty program.
	#[must_use]
	pub fn new() -> Self {
		let mut interpreter = Self {
			parser: LuaParser::new(),
			source: String::new(),
			chunk: None,
			env: Environment::new(),
			config: InterpreterConfig::default(),
		};

		let empty = interpreter.parse("");
		debug_assert!(empty.is_ok(), "the empty program must parse");
		interpreter
	}

	/// An interpreter with initial source code. Parse problems are reported
	/// in the returned [`ParseResult`] rather than raised.
	#[must_use]
	pub fn with_source(source: &str) -> (Self, ParseResult) {
		let mut interpreter = Self::new();
		let parsed = interpreter.parse(source);
		(interpreter, parsed)
	}

	#[must_use]
	pub fn config(&self) -> InterpreterConfig {
		self.config
	}

	pub fn set_config(&mut self, config: InterpreterConfig) {
		self.config = config;
	}

	/// The currently-held source code.
	///
	/// Ranges obtained from evaluation refer to this exact text until the
	/// next successful `parse` or `apply_source_change`.
	#[must_use]
	pub fn source_code(&self) -> &str {
		&self.source
	}

	/// The persistent global environment, e.g. for registering natives via
	/// [`crate::stdlib::register`] or inspecting variables after a run.
	pub fn environment(&mut self) -> &mut Environment {
		&mut self.env
	}

	/// Replaces the held program. On failure the previously-held source and
	/// tree are retained, so the interpreter stays consistent.
	pub fn parse(&mut self, source: impl Into<String>) -> ParseResult {
		let source = source.into();
		match self.parser.parse(&source) {
			Ok(chunk) => {
				self.source = source;
				self.chunk = Some(RefCount::new(chunk));
				ParseResult::default()
			}
			Err(errors) => ParseResult { errors },
		}
	}

	/// Runs the held program. The environment keeps whatever mutations
	/// happened before an error.
	pub fn evaluate(&mut self) -> Result<EvalResult> {
		let chunk = match &self.chunk {
			Some(chunk) => chunk.clone(),
			None => return Err(Error::new(ErrorKind::SourceHasErrors)),
		};

		let evaluator = Evaluator::new(&self.config);
		let result = evaluator.run(&chunk, self.env.scope())?;

		Ok(EvalResult { value: result.value, source_change: result.source_change })
	}

	/// Collapses a change tree (Or picks its first child) and applies it.
	pub fn apply_source_change(&mut self, change: &SourceChange) -> Result<()> {
		self.apply_edits(change.clone().normalize().into_edits())
	}

	/// Applies a list of edits to the source and re-parses.
	///
	/// Edits must be in-bounds and pairwise non-overlapping, and the edited
	/// program must parse; otherwise nothing changes and an
	/// [`InvalidEdit`](ErrorKind::InvalidEdit) error is raised. The
	/// environment is retained either way.
	pub fn apply_edits(&mut self, mut edits: Vec<Edit>) -> Result<()> {
		for edit in &edits {
			let range = edit.range.byte_range();
			if range.end > self.source.len() || !self.source.is_char_boundary(range.start)
				|| !self.source.is_char_boundary(range.end)
			{
				return Err(Error::new(ErrorKind::InvalidEdit(format!(
					"range {} is outside the source",
					edit.range
				))));
			}
		}

		for (index, edit) in edits.iter().enumerate() {
			for other in &edits[index + 1..] {
				if edit.range.overlaps(&other.range) {
					return Err(Error::new(ErrorKind::InvalidEdit(format!(
						"edits {} and {} overlap",
						edit.range, other.range
					))));
				}
			}
		}

		// applying from the back keeps earlier byte offsets valid
		edits.sort_by(|a, b| b.range.start.byte.cmp(&a.range.start.byte));

		let mut source = self.source.clone();
		for edit in &edits {
			source.replace_range(edit.range.byte_range(), &edit.replacement);
		}

		match self.parser.parse(&source) {
			Ok(chunk) => {
				self.source = source;
				self.chunk = Some(RefCount::new(chunk));
				Ok(())
			}
			Err(errors) => {
				let detail = errors
					.first()
					.map(ToString::to_string)
					.unwrap_or_else(|| "unknown parse error".to_string());
				Err(Error::new(ErrorKind::InvalidEdit(format!(
					"edited source no longer parses: {detail}"
				))))
			}
		}
	}
}

impl Default for Interpreter {
	fn default() -> Self {
		Self::new()
	}
}
