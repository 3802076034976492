//! The tree-walking evaluator.
//!
//! Control flow is explicit rather than unwinding: statement evaluation
//! produces an [`EvalResult`] whose `do_break`/`do_return` fields travel
//! bottom-up until a loop or call consumes them. Source changes produced
//! anywhere during evaluation are And-merged into the final result.

use crate::ast::{
	Assignment, BinaryOp, Block, Expression, FunctionCall, NumericFor, Statement, TableField,
	Target,
};
use crate::env::Scope;
use crate::error::{Error, ErrorKind, Result};
use crate::interpreter::InterpreterConfig;
use crate::location::Range;
use crate::origin::Origin;
use crate::source_change::SourceChange;
use crate::value::{CallContext, Function, FunctionKind, Table, Value, Vallist};
use tracing::trace;

/// The internal evaluation result; the public one only exposes `value` and
/// `source_change`.
#[derive(Debug, Default)]
pub(crate) struct EvalResult {
	pub value: Value,
	pub do_break: Option<Range>,
	pub do_return: Option<Vallist>,
	pub source_change: Option<SourceChange>,
}

impl EvalResult {
	/// Replaces the value and control flags with `other`'s and And-merges
	/// the source changes.
	fn absorb(&mut self, other: EvalResult) {
		self.value = other.value;
		self.do_break = other.do_break;
		self.do_return = other.do_return;
		merge(&mut self.source_change, other.source_change);
	}

	fn interrupted(&self) -> bool {
		self.do_break.is_some() || self.do_return.is_some()
	}
}

fn merge(change: &mut Option<SourceChange>, extra: Option<SourceChange>) {
	*change = SourceChange::merge(change.take(), extra);
}

pub(crate) struct Evaluator<'c> {
	config: &'c InterpreterConfig,
}

impl<'c> Evaluator<'c> {
	pub fn new(config: &'c InterpreterConfig) -> Self {
		Self { config }
	}

	/// Runs a program. Top-level statements see the global scope directly,
	/// so a top-level `local` lands in the persistent environment and can be
	/// inspected after the run.
	pub fn run(&self, chunk: &Block, globals: &Scope) -> Result<EvalResult> {
		let mut result = self.eval_block(chunk, globals)?;

		if let Some(range) = result.do_break {
			return Err(Error::new(ErrorKind::BreakOutsideLoop).with_range(range));
		}
		if let Some(values) = result.do_return.take() {
			result.value = values.first();
		}

		Ok(result)
	}

	fn trace_enter(&self, what: &'static str, range: Range) {
		if self.config.trace_nodes {
			trace!(target: "minilua::eval", %range, "enter {what}");
		}
	}

	fn trace_exit(&self, what: &'static str, range: Range) {
		if self.config.trace_nodes {
			trace!(target: "minilua::eval", %range, "exit {what}");
		}
	}

	fn eval_block(&self, block: &Block, scope: &Scope) -> Result<EvalResult> {
		let mut result = EvalResult::default();

		for statement in &block.statements {
			let sub = self.eval_statement(statement, scope)?;
			result.absorb(sub);

			if result.interrupted() {
				break;
			}
		}

		Ok(result)
	}

	fn eval_statement(&self, statement: &Statement, scope: &Scope) -> Result<EvalResult> {
		match statement {
			Statement::Assign(assign) => self.eval_assignment(assign, scope),

			Statement::Do { body, range } => {
				self.trace_enter("do", *range);
				let block_scope = scope.new_child();
				let result = self.eval_block(body, &block_scope);
				self.trace_exit("do", *range);
				result
			}

			Statement::If(stmt) => {
				self.trace_enter("if", stmt.range);
				let mut result = EvalResult::default();

				for arm in &stmt.arms {
					let (condition, change) = self.eval_expression(&arm.condition, scope)?;
					merge(&mut result.source_change, change);

					if condition.is_truthy() {
						let block_scope = scope.new_child();
						let sub = self.eval_block(&arm.body, &block_scope)?;
						result.absorb(sub);
						self.trace_exit("if", stmt.range);
						return Ok(result);
					}
				}

				if let Some(else_body) = &stmt.else_body {
					let block_scope = scope.new_child();
					let sub = self.eval_block(else_body, &block_scope)?;
					result.absorb(sub);
				}

				self.trace_exit("if", stmt.range);
				Ok(result)
			}

			Statement::While { condition, body, range } => {
				self.trace_enter("while", *range);
				let mut result = EvalResult::default();

				loop {
					// the condition sees the enclosing scope, not loop locals
					let (cond, change) = self.eval_expression(condition, scope)?;
					merge(&mut result.source_change, change);
					if !cond.is_truthy() {
						break;
					}

					let body_scope = scope.new_child();
					let sub = self.eval_block(body, &body_scope)?;
					merge(&mut result.source_change, sub.source_change);

					if sub.do_break.is_some() {
						break;
					}
					if sub.do_return.is_some() {
						result.do_return = sub.do_return;
						break;
					}
				}

				self.trace_exit("while", *range);
				Ok(result)
			}

			Statement::Repeat { body, condition, range } => {
				self.trace_enter("repeat", *range);
				let mut result = EvalResult::default();

				loop {
					let body_scope = scope.new_child();
					let sub = self.eval_block(body, &body_scope)?;
					merge(&mut result.source_change, sub.source_change);

					if sub.do_break.is_some() {
						break;
					}
					if sub.do_return.is_some() {
						result.do_return = sub.do_return;
						break;
					}

					// the condition shares the body scope, so locals declared
					// in the body are visible to it
					let (cond, change) = self.eval_expression(condition, &body_scope)?;
					merge(&mut result.source_change, change);
					if cond.is_truthy() {
						break;
					}
				}

				self.trace_exit("repeat", *range);
				Ok(result)
			}

			Statement::NumericFor(stmt) => self.eval_numeric_for(stmt, scope),

			Statement::Break(range) => {
				Ok(EvalResult { do_break: Some(*range), ..EvalResult::default() })
			}

			Statement::Return { exprs, range } => {
				self.trace_enter("return", *range);
				let (values, change) = self.eval_expression_list(exprs, scope)?;
				self.trace_exit("return", *range);
				Ok(EvalResult {
					do_return: Some(values),
					source_change: change,
					..EvalResult::default()
				})
			}

			Statement::Call(call) => {
				let (values, change) = self.eval_call(call, scope)?;
				Ok(EvalResult {
					value: values.first(),
					source_change: change,
					..EvalResult::default()
				})
			}
		}
	}

	fn eval_assignment(&self, assign: &Assignment, scope: &Scope) -> Result<EvalResult> {
		self.trace_enter("assignment", assign.range);

		// the right-hand side is evaluated exactly once; missing values pad
		// with nil, extra values are dropped
		let (values, mut change) = self.eval_expression_list(&assign.exprs, scope)?;

		for (index, target) in assign.targets.iter().enumerate() {
			let value = values.get(index);

			match target {
				Target::Name(name, _) => {
					if assign.local {
						scope.set_local(name.clone(), value);
					} else {
						scope.set_var(name, value);
					}
				}
				Target::Field { object, name, range } => {
					let (object, object_change) = self.eval_expression(object, scope)?;
					merge(&mut change, object_change);

					let table = expect_table(&object, *range)?;
					table
						.set(Value::from(name.as_str()), value)
						.map_err(|error| error.with_range(*range))?;
				}
				Target::Index { object, key, range } => {
					let (object, object_change) = self.eval_expression(object, scope)?;
					merge(&mut change, object_change);
					let (key, key_change) = self.eval_expression(key, scope)?;
					merge(&mut change, key_change);

					let table = expect_table(&object, *range)?;
					table.set(key, value).map_err(|error| error.with_range(*range))?;
				}
			}
		}

		self.trace_exit("assignment", assign.range);
		Ok(EvalResult { source_change: change, ..EvalResult::default() })
	}

	fn eval_numeric_for(&self, stmt: &NumericFor, scope: &Scope) -> Result<EvalResult> {
		self.trace_enter("for", stmt.range);
		let mut result = EvalResult::default();

		let bound = |expr: &Expression,
		             what: &'static str,
		             result: &mut EvalResult|
		 -> Result<f64> {
			let (value, change) = self.eval_expression(expr, scope)?;
			merge(&mut result.source_change, change);
			match value.coerce_number() {
				Some(number) => Ok(number.value()),
				None => Err(Error::new(ErrorKind::ForNotNumeric {
					what,
					found: value.type_name(),
				})
				.with_range(expr.range())),
			}
		};

		let start = bound(&stmt.start, "initial value", &mut result)?;
		let stop = bound(&stmt.stop, "limit", &mut result)?;
		let step = match &stmt.step {
			Some(step) => bound(step, "step", &mut result)?,
			None => 1.0,
		};

		if step == 0.0 {
			let range = stmt.step.as_ref().map_or(stmt.range, Expression::range);
			return Err(Error::new(ErrorKind::ForStepIsZero).with_range(range));
		}

		let mut current = start;
		while (step > 0.0 && current <= stop) || (step < 0.0 && current >= stop) {
			// the control variable is a fresh local every iteration
			let iteration_scope = scope.new_child();
			iteration_scope.set_local(stmt.variable.clone(), Value::from(current));

			let sub = self.eval_block(&stmt.body, &iteration_scope)?;
			merge(&mut result.source_change, sub.source_change);

			if sub.do_break.is_some() {
				break;
			}
			if sub.do_return.is_some() {
				result.do_return = sub.do_return;
				break;
			}

			current += step;
		}

		self.trace_exit("for", stmt.range);
		Ok(result)
	}

	fn eval_expression(
		&self,
		expression: &Expression,
		scope: &Scope,
	) -> Result<(Value, Option<SourceChange>)> {
		match expression {
			Expression::Nil(range) => Ok((literal(Value::nil(), *range), None)),
			Expression::True(range) => Ok((literal(Value::from(true), *range), None)),
			Expression::False(range) => Ok((literal(Value::from(false), *range), None)),
			Expression::Number(number, range) => {
				Ok((literal(Value::from(*number), *range), None))
			}
			Expression::String(content, range) => {
				Ok((literal(Value::from(content.as_str()), *range), None))
			}

			// lookups preserve whatever origin the stored value carries
			Expression::Name(name, _) => Ok((scope.get_var(name), None)),

			Expression::Unary { op, operand, range } => {
				self.trace_enter("unary_operation", *range);
				let (operand, change) = self.eval_expression(operand, scope)?;
				let value = operand.unary_op(*op, *range)?;
				self.trace_exit("unary_operation", *range);
				Ok((value, change))
			}

			Expression::Binary { op: op @ (BinaryOp::And | BinaryOp::Or), lhs, rhs, range } => {
				self.eval_short_circuit(*op, lhs, rhs, *range, scope)
			}

			Expression::Binary { op, lhs, rhs, range } => {
				self.trace_enter("binary_operation", *range);
				let (lhs, mut change) = self.eval_expression(lhs, scope)?;
				let (rhs, rhs_change) = self.eval_expression(rhs, scope)?;
				merge(&mut change, rhs_change);
				let value = lhs.binary_op(*op, &rhs, *range)?;
				self.trace_exit("binary_operation", *range);
				Ok((value, change))
			}

			Expression::Function(body) => {
				let function = Function::closure(body.clone(), scope.clone());
				Ok((Value::from(function), None))
			}

			Expression::Call(call) => {
				let (values, change) = self.eval_call(call, scope)?;
				Ok((values.first(), change))
			}

			Expression::Table { fields, range } => self.eval_table(fields, *range, scope),

			Expression::Field { object, name, range } => {
				let (object, change) = self.eval_expression(object, scope)?;
				let table = expect_table(&object, *range)?;
				let value = table
					.get(&Value::from(name.as_str()))
					.map_err(|error| error.with_range(*range))?;
				Ok((value, change))
			}

			Expression::Index { object, key, range } => {
				let (object, mut change) = self.eval_expression(object, scope)?;
				let (key, key_change) = self.eval_expression(key, scope)?;
				merge(&mut change, key_change);

				let table = expect_table(&object, *range)?;
				let value = table.get(&key).map_err(|error| error.with_range(*range))?;
				Ok((value, change))
			}
		}
	}

	/// `and`/`or`: the right operand is only evaluated when the left one
	/// doesn't already decide the result. The picked operand is re-tagged
	/// with a binary origin either way.
	fn eval_short_circuit(
		&self,
		op: BinaryOp,
		lhs: &Expression,
		rhs: &Expression,
		range: Range,
		scope: &Scope,
	) -> Result<(Value, Option<SourceChange>)> {
		self.trace_enter("binary_operation", range);

		let (lhs, mut change) = self.eval_expression(lhs, scope)?;
		let decided = match op {
			BinaryOp::And => !lhs.is_truthy(),
			_ => lhs.is_truthy(),
		};

		let value = if decided {
			// the unevaluated right operand is recorded as plain nil
			lhs.clone().with_origin(Origin::Binary {
				op,
				lhs: Box::new(lhs),
				rhs: Box::new(Value::nil()),
				range,
			})
		} else {
			let (rhs, rhs_change) = self.eval_expression(rhs, scope)?;
			merge(&mut change, rhs_change);
			rhs.clone().with_origin(Origin::Binary {
				op,
				lhs: Box::new(lhs),
				rhs: Box::new(rhs),
				range,
			})
		};

		self.trace_exit("binary_operation", range);
		Ok((value, change))
	}

	fn eval_table(
		&self,
		fields: &[TableField],
		range: Range,
		scope: &Scope,
	) -> Result<(Value, Option<SourceChange>)> {
		self.trace_enter("table", range);

		let table = Table::new();
		let mut change = None;
		let mut next_index = 1.0;

		for field in fields {
			match field {
				TableField::Positional(expr) => {
					let (value, value_change) = self.eval_expression(expr, scope)?;
					merge(&mut change, value_change);
					table
						.set(Value::from(next_index), value)
						.map_err(|error| error.with_range(expr.range()))?;
					next_index += 1.0;
				}
				TableField::Named { name, value } => {
					let (value, value_change) = self.eval_expression(value, scope)?;
					merge(&mut change, value_change);
					table
						.set(Value::from(name.as_str()), value)
						.map_err(|error| error.with_range(range))?;
				}
				TableField::Keyed { key, value } => {
					let (key_value, key_change) = self.eval_expression(key, scope)?;
					merge(&mut change, key_change);
					let (value, value_change) = self.eval_expression(value, scope)?;
					merge(&mut change, value_change);
					table
						.set(key_value, value)
						.map_err(|error| error.with_range(key.range()))?;
				}
			}
		}

		self.trace_exit("table", range);
		Ok((Value::from(table), change))
	}

	/// Evaluates an expression list left-to-right. Only the *last* element
	/// spreads a call's return list; earlier calls collapse to their first
	/// value.
	fn eval_expression_list(
		&self,
		exprs: &[Expression],
		scope: &Scope,
	) -> Result<(Vallist, Option<SourceChange>)> {
		let mut values = Vec::new();
		let mut change = None;

		for (index, expr) in exprs.iter().enumerate() {
			let is_last = index + 1 == exprs.len();

			if is_last {
				if let Expression::Call(call) = expr {
					let (call_values, call_change) = self.eval_call(call, scope)?;
					merge(&mut change, call_change);
					values.extend(call_values);
					continue;
				}
			}

			let (value, value_change) = self.eval_expression(expr, scope)?;
			merge(&mut change, value_change);
			values.push(value);
		}

		Ok((Vallist::from(values), change))
	}

	fn eval_call(
		&self,
		call: &FunctionCall,
		scope: &Scope,
	) -> Result<(Vallist, Option<SourceChange>)> {
		self.trace_enter("function_call", call.range);

		let (callee, mut change) = self.eval_expression(&call.callee, scope)?;
		let (args, args_change) = self.eval_expression_list(&call.args, scope)?;
		merge(&mut change, args_change);

		let function = callee
			.as_function()
			.ok_or_else(|| {
				Error::new(ErrorKind::NotCallable(callee.type_name())).with_range(call.range)
			})?
			.clone();

		if self.config.trace_calls {
			trace!(
				target: "minilua::eval",
				callee = function.name().unwrap_or("<lua function>"),
				args = args.len(),
				range = %call.range,
				"call",
			);
		}

		let values = match function.kind() {
			FunctionKind::Lua(closure) => {
				// the call scope hangs off the *captured* chain, not the
				// caller's; extra arguments are dropped, missing ones are nil
				let call_scope = closure.scope.new_child();
				for (index, param) in closure.body.params.iter().enumerate() {
					call_scope.set_local(param.clone(), args.get(index));
				}

				let mut sub = self.eval_block(&closure.body.body, &call_scope)?;
				merge(&mut change, sub.source_change.take());

				if let Some(range) = sub.do_break {
					return Err(Error::new(ErrorKind::BreakOutsideLoop).with_range(range));
				}

				// falling off the end returns no values
				sub.do_return.take().unwrap_or_default()
			}

			FunctionKind::Native(native) => {
				let context = CallContext::new(scope.clone(), Some(call.range), args);
				let result =
					(native.func)(context).map_err(|error| error.with_range(call.range))?;
				let (values, native_change) = result.into_parts();
				merge(&mut change, native_change);
				values
			}
		};

		self.trace_exit("function_call", call.range);
		Ok((values, change))
	}
}

fn literal(value: Value, range: Range) -> Value {
	value.with_origin(Origin::Literal { range })
}

fn expect_table<'v>(value: &'v Value, range: Range) -> Result<&'v Table> {
	value
		.as_table()
		.ok_or_else(|| Error::new(ErrorKind::NotIndexable(value.type_name())).with_range(range))
}
