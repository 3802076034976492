//! The value operators.
//!
//! Every operator takes the source range of the operation and tags its result
//! with a [`Binary`](Origin::Binary) or [`Unary`](Origin::Unary) origin
//! recording the operand *values* (origins included), which is what
//! force-back later inverts.

use super::{Number, Value, ValueKind};
use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{Error, ErrorKind, Result};
use crate::location::Range;
use crate::origin::Origin;
use std::cmp::Ordering;

impl Value {
	/// Applies a binary operator. `and`/`or` select an operand (without
	/// short-circuiting — the evaluator short-circuits before calling this).
	pub fn binary_op(&self, op: BinaryOp, rhs: &Value, range: Range) -> Result<Value> {
		use BinaryOp::*;

		match op {
			Add | Sub | Mul | Div | FloorDiv | Mod | Pow => self.arith(op, rhs, range),
			Concat => self.concat(rhs, range),
			Eq => Ok(self.equals(rhs, range)),
			Ne => Ok(self.unequals(rhs, range)),
			Lt | Le | Gt | Ge => self.compare(op, rhs, range),
			And => Ok(self.select(rhs, !self.is_truthy(), op, range)),
			Or => Ok(self.select(rhs, self.is_truthy(), op, range)),
			BitAnd | BitOr | BitXor | Shl | Shr => self.bitwise(op, rhs, range),
		}
	}

	/// Applies a unary operator.
	pub fn unary_op(&self, op: UnaryOp, range: Range) -> Result<Value> {
		match op {
			UnaryOp::Neg => self.negate(range),
			UnaryOp::Not => Ok(self.invert(range)),
			UnaryOp::Len => self.length(range),
			UnaryOp::BitNot => self.bit_not(range),
		}
	}

	fn arith(&self, op: BinaryOp, rhs: &Value, range: Range) -> Result<Value> {
		let lhs_num = self.arith_operand(op, rhs, range)?;
		let rhs_num = rhs.arith_operand(op, self, range)?;

		let result = arith_raw(op, lhs_num.value(), rhs_num.value());
		Ok(Value::from(result).with_origin(self.binary_origin(op, rhs, range)))
	}

	/// Coerces `self` for use in arithmetic, with errors blaming the right
	/// operand pair.
	fn arith_operand(&self, op: BinaryOp, other: &Value, range: Range) -> Result<Number> {
		match &self.kind {
			ValueKind::Number(n) => Ok(*n),
			ValueKind::String(s) => Number::parse(s.as_str()).ok_or_else(|| {
				Error::new(ErrorKind::NotANumber(s.as_str().to_string())).with_range(range)
			}),
			_ => Err(Error::new(ErrorKind::BinaryTypeError {
				op: op.verb(),
				lhs: self.type_name(),
				rhs: other.type_name(),
			})
			.with_range(range)),
		}
	}

	fn concat(&self, rhs: &Value, range: Range) -> Result<Value> {
		let type_error = || {
			Error::new(ErrorKind::BinaryTypeError {
				op: BinaryOp::Concat.verb(),
				lhs: self.type_name(),
				rhs: rhs.type_name(),
			})
			.with_range(range)
		};

		let mut result = self.coerce_string().ok_or_else(type_error)?;
		result.push_str(&rhs.coerce_string().ok_or_else(type_error)?);

		Ok(Value::from(result).with_origin(self.binary_origin(BinaryOp::Concat, rhs, range)))
	}

	/// `==`: never errors; mismatched types are simply unequal.
	#[must_use]
	pub fn equals(&self, rhs: &Value, range: Range) -> Value {
		Value::from(self == rhs).with_origin(self.binary_origin(BinaryOp::Eq, rhs, range))
	}

	/// `~=`
	#[must_use]
	pub fn unequals(&self, rhs: &Value, range: Range) -> Value {
		Value::from(self != rhs).with_origin(self.binary_origin(BinaryOp::Ne, rhs, range))
	}

	fn compare(&self, op: BinaryOp, rhs: &Value, range: Range) -> Result<Value> {
		let ordering = match (&self.kind, &rhs.kind) {
			// NaN comparisons are false, not errors
			(ValueKind::Number(a), ValueKind::Number(b)) => a.partial_cmp(b),
			(ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
			_ => {
				return Err(Error::new(ErrorKind::BinaryTypeError {
					op: op.verb(),
					lhs: self.type_name(),
					rhs: rhs.type_name(),
				})
				.with_range(range))
			}
		};

		let result = match ordering {
			None => false,
			Some(ordering) => match op {
				BinaryOp::Lt => ordering == Ordering::Less,
				BinaryOp::Le => ordering != Ordering::Greater,
				BinaryOp::Gt => ordering == Ordering::Greater,
				BinaryOp::Ge => ordering != Ordering::Less,
				_ => unreachable!("compare called with non-comparison operator"),
			},
		};

		Ok(Value::from(result).with_origin(self.binary_origin(op, rhs, range)))
	}

	/// `and`/`or` with both operands already evaluated: picks `rhs` when
	/// `take_rhs`, else `self`, and re-tags the pick.
	fn select(&self, rhs: &Value, take_rhs: bool, op: BinaryOp, range: Range) -> Value {
		let picked = if take_rhs { rhs } else { self };
		picked.clone().with_origin(self.binary_origin(op, rhs, range))
	}

	fn bitwise(&self, op: BinaryOp, rhs: &Value, range: Range) -> Result<Value> {
		let lhs_int = self.bitwise_operand(op, rhs, range)?;
		let rhs_int = rhs.bitwise_operand(op, self, range)?;

		let result = match op {
			BinaryOp::BitAnd => lhs_int & rhs_int,
			BinaryOp::BitOr => lhs_int | rhs_int,
			BinaryOp::BitXor => lhs_int ^ rhs_int,
			BinaryOp::Shl => shift_left(lhs_int, rhs_int),
			BinaryOp::Shr => shift_left(lhs_int, rhs_int.wrapping_neg()),
			_ => unreachable!("bitwise called with non-bitwise operator"),
		};

		Ok(Value::from(result as f64).with_origin(self.binary_origin(op, rhs, range)))
	}

	fn bitwise_operand(&self, op: BinaryOp, other: &Value, range: Range) -> Result<i64> {
		let number = self.as_number().ok_or_else(|| {
			Error::new(ErrorKind::BinaryTypeError {
				op: op.verb(),
				lhs: self.type_name(),
				rhs: other.type_name(),
			})
			.with_range(range)
		})?;

		number
			.to_integer()
			.ok_or_else(|| Error::new(ErrorKind::NoIntegerRepresentation).with_range(range))
	}

	/// Unary `-`, with the same string coercion as the other arithmetic.
	pub fn negate(&self, range: Range) -> Result<Value> {
		let number = self.coerce_number().ok_or_else(|| {
			Error::new(ErrorKind::UnaryTypeError {
				op: UnaryOp::Neg.verb(),
				operand: self.type_name(),
			})
			.with_range(range)
		})?;

		Ok(Value::from(-number.value()).with_origin(self.unary_origin(UnaryOp::Neg, range)))
	}

	/// Unary `not`: true exactly for nil and false. Never errors.
	#[must_use]
	pub fn invert(&self, range: Range) -> Value {
		Value::from(!self.is_truthy()).with_origin(self.unary_origin(UnaryOp::Not, range))
	}

	/// Unary `#`: byte length of strings, border of tables.
	pub fn length(&self, range: Range) -> Result<Value> {
		let length = match &self.kind {
			ValueKind::String(s) => s.len() as f64,
			ValueKind::Table(t) => t.border() as f64,
			_ => {
				return Err(Error::new(ErrorKind::UnaryTypeError {
					op: UnaryOp::Len.verb(),
					operand: self.type_name(),
				})
				.with_range(range))
			}
		};

		Ok(Value::from(length).with_origin(self.unary_origin(UnaryOp::Len, range)))
	}

	/// Unary `~`.
	pub fn bit_not(&self, range: Range) -> Result<Value> {
		let number = self.as_number().ok_or_else(|| {
			Error::new(ErrorKind::UnaryTypeError {
				op: UnaryOp::BitNot.verb(),
				operand: self.type_name(),
			})
			.with_range(range)
		})?;

		let int = number
			.to_integer()
			.ok_or_else(|| Error::new(ErrorKind::NoIntegerRepresentation).with_range(range))?;

		Ok(Value::from(!int as f64).with_origin(self.unary_origin(UnaryOp::BitNot, range)))
	}

	fn binary_origin(&self, op: BinaryOp, rhs: &Value, range: Range) -> Origin {
		Origin::Binary {
			op,
			lhs: Box::new(self.clone()),
			rhs: Box::new(rhs.clone()),
			range,
		}
	}

	fn unary_origin(&self, op: UnaryOp, range: Range) -> Origin {
		Origin::Unary { op, operand: Box::new(self.clone()), range }
	}
}

/// The numeric core of the arithmetic operators, shared with force-back's
/// inverse verification.
pub(crate) fn arith_raw(op: BinaryOp, a: f64, b: f64) -> f64 {
	match op {
		BinaryOp::Add => a + b,
		BinaryOp::Sub => a - b,
		BinaryOp::Mul => a * b,
		BinaryOp::Div => a / b,
		BinaryOp::FloorDiv => (a / b).floor(),
		// sign follows the divisor
		BinaryOp::Mod => a - (a / b).floor() * b,
		BinaryOp::Pow => a.powf(b),
		_ => unreachable!("arith_raw called with non-arithmetic operator"),
	}
}

/// Lua shifts: logical, both directions, saturating to 0 past 64 bits.
fn shift_left(value: i64, amount: i64) -> i64 {
	if amount <= -64 || amount >= 64 {
		0
	} else if amount >= 0 {
		((value as u64) << amount) as i64
	} else {
		((value as u64) >> -amount) as i64
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::location::{Location, Point};
	use crate::value::Table;

	fn range() -> Range {
		let loc = |byte| Location { point: Point { row: 0, column: byte }, byte };
		Range { start: loc(0), end: loc(1) }
	}

	fn num(n: f64) -> Value {
		Value::from(n)
	}

	#[test]
	fn arithmetic() {
		assert_eq!(num(1.0).binary_op(BinaryOp::Add, &num(2.0), range()).unwrap(), num(3.0));
		assert_eq!(num(7.0).binary_op(BinaryOp::Sub, &num(2.5), range()).unwrap(), num(4.5));
		assert_eq!(num(3.0).binary_op(BinaryOp::Mul, &num(4.0), range()).unwrap(), num(12.0));
		assert_eq!(num(1.0).binary_op(BinaryOp::Div, &num(4.0), range()).unwrap(), num(0.25));
		assert_eq!(num(7.0).binary_op(BinaryOp::FloorDiv, &num(2.0), range()).unwrap(), num(3.0));
		assert_eq!(num(2.0).binary_op(BinaryOp::Pow, &num(10.0), range()).unwrap(), num(1024.0));
	}

	#[test]
	fn modulo_sign_follows_divisor() {
		assert_eq!(num(5.0).binary_op(BinaryOp::Mod, &num(3.0), range()).unwrap(), num(2.0));
		assert_eq!(num(-5.0).binary_op(BinaryOp::Mod, &num(3.0), range()).unwrap(), num(1.0));
		assert_eq!(num(5.0).binary_op(BinaryOp::Mod, &num(-3.0), range()).unwrap(), num(-1.0));
	}

	#[test]
	fn division_by_zero_is_not_an_error() {
		let res = num(1.0).binary_op(BinaryOp::Div, &num(0.0), range()).unwrap();
		assert_eq!(res.as_number().unwrap().value(), f64::INFINITY);

		let nan = num(0.0).binary_op(BinaryOp::Div, &num(0.0), range()).unwrap();
		assert!(nan.as_number().unwrap().is_nan());
	}

	#[test]
	fn arithmetic_coerces_numeric_strings() {
		let res = Value::from("4").binary_op(BinaryOp::Add, &num(2.0), range()).unwrap();
		assert_eq!(res, num(6.0));

		let err = Value::from("four").binary_op(BinaryOp::Add, &num(2.0), range()).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::NotANumber(_)));

		let err = Value::nil().binary_op(BinaryOp::Add, &num(2.0), range()).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BinaryTypeError { .. }));
	}

	#[test]
	fn results_carry_binary_origins() {
		let res = num(1.0).binary_op(BinaryOp::Add, &num(2.0), range()).unwrap();
		match res.origin() {
			Origin::Binary { op: BinaryOp::Add, lhs, rhs, .. } => {
				assert_eq!(**lhs, num(1.0));
				assert_eq!(**rhs, num(2.0));
			}
			other => panic!("expected binary origin, got {other:?}"),
		}
	}

	#[test]
	fn comparisons() {
		let truthy = |v: Value| v == Value::from(true);

		assert!(truthy(num(1.0).binary_op(BinaryOp::Lt, &num(2.0), range()).unwrap()));
		assert!(truthy(num(2.0).binary_op(BinaryOp::Le, &num(2.0), range()).unwrap()));
		assert!(truthy(Value::from("a").binary_op(BinaryOp::Lt, &Value::from("b"), range()).unwrap()));

		// NaN compares false
		let nan = num(f64::NAN);
		assert!(!truthy(nan.binary_op(BinaryOp::Lt, &num(1.0), range()).unwrap()));
		assert!(!truthy(nan.binary_op(BinaryOp::Ge, &num(1.0), range()).unwrap()));

		assert!(num(1.0).binary_op(BinaryOp::Lt, &Value::from("2"), range()).is_err());
	}

	#[test]
	fn equality_of_tables_is_identity() {
		let t = Table::new();
		let a = Value::from(t.clone());
		let b = Value::from(t);
		let c = Value::from(Table::new());

		assert_eq!(a.equals(&b, range()), Value::from(true));
		assert_eq!(a.equals(&c, range()), Value::from(false));
		assert_eq!(a.unequals(&c, range()), Value::from(true));
	}

	#[test]
	fn concat() {
		let res = Value::from("x = ").binary_op(BinaryOp::Concat, &num(4.0), range()).unwrap();
		assert_eq!(res, Value::from("x = 4"));

		assert!(Value::from(true).binary_op(BinaryOp::Concat, &num(4.0), range()).is_err());
	}

	#[test]
	fn bitwise() {
		assert_eq!(num(6.0).binary_op(BinaryOp::BitAnd, &num(3.0), range()).unwrap(), num(2.0));
		assert_eq!(num(6.0).binary_op(BinaryOp::BitOr, &num(3.0), range()).unwrap(), num(7.0));
		assert_eq!(num(6.0).binary_op(BinaryOp::BitXor, &num(3.0), range()).unwrap(), num(5.0));
		assert_eq!(num(1.0).binary_op(BinaryOp::Shl, &num(4.0), range()).unwrap(), num(16.0));
		assert_eq!(num(16.0).binary_op(BinaryOp::Shr, &num(4.0), range()).unwrap(), num(1.0));
		assert_eq!(num(1.0).binary_op(BinaryOp::Shl, &num(64.0), range()).unwrap(), num(0.0));

		let err = num(1.5).binary_op(BinaryOp::BitAnd, &num(1.0), range()).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::NoIntegerRepresentation));
	}

	#[test]
	fn unary_operators() {
		assert_eq!(num(5.0).unary_op(UnaryOp::Neg, range()).unwrap(), num(-5.0));
		assert_eq!(Value::from("5").unary_op(UnaryOp::Neg, range()).unwrap(), num(-5.0));

		assert_eq!(Value::nil().unary_op(UnaryOp::Not, range()).unwrap(), Value::from(true));
		assert_eq!(num(0.0).unary_op(UnaryOp::Not, range()).unwrap(), Value::from(false));

		assert_eq!(Value::from("hello").unary_op(UnaryOp::Len, range()).unwrap(), num(5.0));

		let table = Table::new();
		table.set(Value::from(1.0), Value::from("x")).unwrap();
		assert_eq!(Value::from(table).unary_op(UnaryOp::Len, range()).unwrap(), num(1.0));

		assert_eq!(num(0.0).unary_op(UnaryOp::BitNot, range()).unwrap(), num(-1.0));
		assert!(Value::nil().unary_op(UnaryOp::Neg, range()).is_err());
	}
}
