//! Value provenance and the force-back solver.
//!
//! An [`Origin`] records how a value came to be: read from a literal, or
//! produced by an operator from other (origin-carrying) values. Forcing asks
//! the inverse question: which edit to the source would have produced a
//! different value here?

use crate::ast::{BinaryOp, UnaryOp};
use crate::location::Range;
use crate::source_change::SourceChange;
use crate::value::{ops::arith_raw, Value};

/// Where a value came from.
///
/// Origins are immutable and propagate through operators; assignment and
/// environment lookup do not erase them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Origin {
	/// Synthetic or native-produced; cannot be forced.
	#[default]
	None,

	/// The value is the literal at `range`.
	Literal { range: Range },

	/// The value is `op` applied to the recorded operand values.
	Binary { op: BinaryOp, lhs: Box<Value>, rhs: Box<Value>, range: Range },

	/// The value is `op` applied to the recorded operand value.
	Unary { op: UnaryOp, operand: Box<Value>, range: Range },
}

impl Origin {
	#[must_use]
	pub fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}

	/// Computes an edit tree that would make the owning value equal `target`.
	///
	/// Never errors: origins that cannot be inverted (or targets outside an
	/// inverse's domain) yield `None`.
	#[must_use]
	pub fn force(&self, target: &Value) -> Option<SourceChange> {
		match self {
			Self::None => None,

			Self::Literal { range } => {
				let replacement = target.to_literal()?;
				Some(SourceChange::edit(*range, replacement))
			}

			Self::Unary { op, operand, .. } => match op {
				UnaryOp::Neg => {
					let target_num = target.as_number()?;
					operand.force(&Value::from(-target_num.value()))
				}
				UnaryOp::Not => match target.kind() {
					crate::value::ValueKind::Bool(b) => operand.force(&Value::from(!b)),
					_ => None,
				},
				// length and bitwise-not lose too much information
				UnaryOp::Len | UnaryOp::BitNot => None,
			},

			Self::Binary { op, lhs, rhs, .. } => {
				let fix_rhs = solve_operand(*op, target, lhs, rhs, Side::Lhs)
					.and_then(|candidate| lhs.force(&candidate));
				let fix_lhs = solve_operand(*op, target, lhs, rhs, Side::Rhs)
					.and_then(|candidate| rhs.force(&candidate));

				match (fix_rhs, fix_lhs) {
					(Some(a), Some(b)) => Some(SourceChange::or(vec![a, b])),
					(Some(a), None) => Some(a),
					(None, Some(b)) => Some(b),
					(None, None) => None,
				}
			}
		}
	}
}

/// Which operand of a binary operation is being solved for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
	Lhs,
	Rhs,
}

/// The pre-image of `target` under `op` with the opposite operand fixed.
///
/// For the arithmetic operators the candidate from the algebraic inverse is
/// verified by re-applying the operator: a strategy only succeeds when it
/// exactly reproduces the target. That uniformly rejects division by zero,
/// `0 * x` with a free parameter, logarithms of non-positive numbers, and
/// any float artifact that would make the proposed edit a lie.
fn solve_operand(
	op: BinaryOp,
	target: &Value,
	lhs: &Value,
	rhs: &Value,
	side: Side,
) -> Option<Value> {
	use BinaryOp::*;

	match op {
		Add | Sub | Mul | Div | Pow => {
			let target_num = target.as_number()?.value();
			let fixed = match side {
				Side::Lhs => rhs.coerce_number()?.value(),
				Side::Rhs => lhs.coerce_number()?.value(),
			};

			let candidate = arith_inverse(op, target_num, fixed, side)?;

			let verified = match side {
				Side::Lhs => arith_raw(op, candidate, fixed) == target_num,
				Side::Rhs => arith_raw(op, fixed, candidate) == target_num,
			};

			verified.then(|| Value::from(candidate))
		}

		Concat => {
			let target_str = target.as_str()?;
			match side {
				// solving lhs: the fixed rhs must be a suffix of the target
				Side::Lhs => {
					let fixed = rhs.coerce_string()?;
					let prefix = target_str.strip_suffix(fixed.as_str())?;
					Some(Value::from(prefix))
				}
				// solving rhs: the fixed lhs must be a prefix of the target
				Side::Rhs => {
					let fixed = lhs.coerce_string()?;
					let suffix = target_str.strip_prefix(fixed.as_str())?;
					Some(Value::from(suffix))
				}
			}
		}

		// the remaining operators are not force-back targets
		FloorDiv | Mod | Eq | Ne | Lt | Le | Gt | Ge | And | Or | BitAnd | BitOr | BitXor
		| Shl | Shr => None,
	}
}

fn arith_inverse(op: BinaryOp, target: f64, fixed: f64, side: Side) -> Option<f64> {
	let candidate = match (op, side) {
		(BinaryOp::Add, _) => target - fixed,

		(BinaryOp::Sub, Side::Lhs) => target + fixed,
		(BinaryOp::Sub, Side::Rhs) => fixed - target,

		// a fixed factor of zero either has no pre-image or infinitely many
		(BinaryOp::Mul, _) if fixed == 0.0 => return None,
		(BinaryOp::Mul, _) => target / fixed,

		(BinaryOp::Div, Side::Lhs) => target * fixed,
		(BinaryOp::Div, Side::Rhs) => fixed / target,

		(BinaryOp::Pow, Side::Lhs) => target.powf(1.0 / fixed),
		(BinaryOp::Pow, Side::Rhs) => target.ln() / fixed.ln(),

		_ => return None,
	};

	candidate.is_finite().then_some(candidate)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::location::{Location, Point};
	use crate::source_change::SourceChange;

	fn range(start: usize, end: usize) -> Range {
		let loc = |byte| Location { point: Point { row: 0, column: byte }, byte };
		Range { start: loc(start), end: loc(end) }
	}

	fn literal(value: f64, start: usize, end: usize) -> Value {
		Value::from(value).with_origin(Origin::Literal { range: range(start, end) })
	}

	fn edit_of(change: &SourceChange) -> (usize, &str) {
		match change {
			SourceChange::Edit(edit) => (edit.range.start.byte, edit.replacement.as_str()),
			other => panic!("expected a single edit, got {other:?}"),
		}
	}

	#[test]
	fn forcing_without_origin_fails() {
		assert_eq!(Value::from(1.0).force(&Value::from(2.0)), None);
	}

	#[test]
	fn forcing_a_literal_rewrites_it() {
		let value = literal(42.0, 0, 2);
		let change = value.force(&Value::from(7.0)).unwrap();
		assert_eq!(edit_of(&change), (0, "7"));

		// non-number targets are fine for literals
		let change = value.force(&Value::from("hi")).unwrap();
		assert_eq!(edit_of(&change), (0, "\"hi\""));
	}

	#[test]
	fn forcing_addition_offers_both_operands() {
		// 1 + 2, as produced by the evaluator for `1 + 2`
		let result = literal(1.0, 0, 1).binary_op(BinaryOp::Add, &literal(2.0, 4, 5), range(0, 5)).unwrap();

		let change = result.force(&Value::from(10.0)).unwrap();
		match change {
			SourceChange::Or(children) => {
				assert_eq!(children.len(), 2);
				assert_eq!(edit_of(&children[0]), (0, "8"));
				assert_eq!(edit_of(&children[1]), (4, "9"));
			}
			other => panic!("expected two strategies, got {other:?}"),
		}
	}

	#[test]
	fn one_sided_origin_unwraps_the_or() {
		// lhs is a plain value (no origin), only the rhs can be rewritten
		let result =
			Value::from(1.0).binary_op(BinaryOp::Add, &literal(2.0, 4, 5), range(0, 5)).unwrap();

		let change = result.force(&Value::from(10.0)).unwrap();
		assert_eq!(edit_of(&change), (4, "9"));
	}

	#[test]
	fn multiplication_by_zero_cannot_be_inverted() {
		let result =
			literal(0.0, 0, 1).binary_op(BinaryOp::Mul, &literal(5.0, 4, 5), range(0, 5)).unwrap();

		// forcing to a nonzero target: solving the rhs would need 0 * x = 3
		let change = result.force(&Value::from(3.0)).unwrap();
		assert_eq!(edit_of(&change), (0, "0.6"));

		// forcing to zero: the rhs strategy is dropped as a free parameter,
		// the lhs strategy still works (0 is already fine, but 0/5 = 0)
		let change = result.force(&Value::from(0.0)).unwrap();
		assert_eq!(edit_of(&change), (0, "0"));
	}

	#[test]
	fn division_force_uses_multiplication() {
		let result =
			literal(10.0, 0, 2).binary_op(BinaryOp::Div, &literal(4.0, 5, 6), range(0, 6)).unwrap();

		let change = result.force(&Value::from(5.0)).unwrap();
		match change {
			SourceChange::Or(children) => {
				assert_eq!(edit_of(&children[0]), (0, "20"));
				assert_eq!(edit_of(&children[1]), (5, "2"));
			}
			other => panic!("expected two strategies, got {other:?}"),
		}
	}

	#[test]
	fn pow_force_is_domain_checked() {
		let result =
			literal(2.0, 0, 1).binary_op(BinaryOp::Pow, &literal(1.0, 4, 5), range(0, 5)).unwrap();

		// 2^1 = 2 -> 5: the base strategy 5^(1/1) = 5 is exact and survives
		// verification; the exponent strategy only survives if ln(5)/ln(2)
		// happens to round-trip, so it may or may not be offered
		let change = result.force(&Value::from(5.0)).unwrap();
		let strategies: Vec<_> = match &change {
			SourceChange::Or(children) => children.iter().map(edit_of).collect(),
			single => vec![edit_of(single)],
		};
		assert!(strategies.contains(&(0, "5")));

		// a negative target has no real logarithm and no real root that
		// verifies; nothing to offer
		let cubed =
			literal(2.0, 0, 1).binary_op(BinaryOp::Pow, &literal(3.0, 4, 5), range(0, 5)).unwrap();
		assert_eq!(cubed.force(&Value::from(-8.0)), None);
	}

	#[test]
	fn concat_force_splits_the_target() {
		let lhs = Value::from("foo").with_origin(Origin::Literal { range: range(0, 5) });
		let rhs = Value::from("bar").with_origin(Origin::Literal { range: range(9, 14) });
		let result = lhs.binary_op(BinaryOp::Concat, &rhs, range(0, 14)).unwrap();

		let change = result.force(&Value::from("foobaz")).unwrap();
		match change {
			SourceChange::Or(children) => {
				// rewrite lhs to "fooba" + keep "z"? no: rhs "bar" is not a
				// suffix of "foobaz", so only the rhs strategy survives
				panic!("expected a single strategy, got {children:?}");
			}
			single => assert_eq!(edit_of(&single), (9, "\"baz\"")),
		}
	}

	#[test]
	fn comparisons_and_logic_are_not_forceable() {
		let result =
			literal(1.0, 0, 1).binary_op(BinaryOp::Lt, &literal(2.0, 4, 5), range(0, 5)).unwrap();
		assert_eq!(result.force(&Value::from(false)), None);

		let result =
			literal(1.0, 0, 1).binary_op(BinaryOp::And, &literal(2.0, 4, 5), range(0, 5)).unwrap();
		assert_eq!(result.force(&Value::from(5.0)), None);
	}

	#[test]
	fn unary_not_force_flips_the_target() {
		let value = Value::from(true).with_origin(Origin::Literal { range: range(0, 4) });
		let inverted = value.invert(range(0, 8));

		let change = inverted.force(&Value::from(true)).unwrap();
		assert_eq!(edit_of(&change), (0, "false"));

		// only boolean targets make sense for `not`
		assert_eq!(inverted.force(&Value::from(1.0)), None);
	}

	#[test]
	fn unary_neg_force_negates_the_target() {
		let value = literal(5.0, 1, 2);
		let negated = value.negate(range(0, 2)).unwrap();

		let change = negated.force(&Value::from(-9.0)).unwrap();
		assert_eq!(edit_of(&change), (1, "9"));
	}

	#[test]
	fn length_is_not_reversible() {
		let value = Value::from("hello").with_origin(Origin::Literal { range: range(0, 7) });
		let length = value.length(range(0, 8)).unwrap();
		assert_eq!(length.force(&Value::from(3.0)), None);
	}

	#[test]
	fn force_recurses_through_nested_origins() {
		// (1 + 2) * 2 == 6; force to 10 -> inner sum must become 5
		let sum = literal(1.0, 0, 1).binary_op(BinaryOp::Add, &literal(2.0, 4, 5), range(0, 5)).unwrap();
		let product = sum.binary_op(BinaryOp::Mul, &Value::from(2.0), range(0, 9)).unwrap();

		let change = product.force(&Value::from(10.0)).unwrap();
		match change {
			SourceChange::Or(children) => {
				assert_eq!(edit_of(&children[0]), (0, "3"));
				assert_eq!(edit_of(&children[1]), (4, "4"));
			}
			other => panic!("expected two strategies, got {other:?}"),
		}
	}
}
