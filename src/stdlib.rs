//! The default standard library.
//!
//! The core never requires any of this: natives are plain values registered
//! in the [`Environment`], and embedders can register their own instead.
//! [`register`] installs the set the CLI uses.

use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::value::{CallContext, CallResult, Function, Number, Table, Value, Vallist};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

/// Installs the default stdlib: `print`, `type`, `tostring`, `tonumber`,
/// `assert`, `force` and the `math` table.
pub fn register(env: &mut Environment) {
	env.set("print", Value::from(Function::native("print", print)));
	env.set("type", Value::from(Function::native("type", type_of)));
	env.set("tostring", Value::from(Function::native("tostring", tostring)));
	env.set("tonumber", Value::from(Function::native("tonumber", tonumber)));
	env.set("assert", Value::from(Function::native("assert", assert_fn)));
	env.set("force", Value::from(Function::native("force", force)));
	env.set("math", Value::from(math_table()));
}

fn print(ctx: CallContext) -> Result<CallResult> {
	let line = ctx
		.arguments()
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("\t");
	println!("{line}");
	Ok(CallResult::empty())
}

fn type_of(ctx: CallContext) -> Result<CallResult> {
	Ok(CallResult::new(Value::from(ctx.arguments().first().type_name())))
}

fn tostring(ctx: CallContext) -> Result<CallResult> {
	Ok(CallResult::new(Value::from(ctx.arguments().first().to_string())))
}

fn tonumber(ctx: CallContext) -> Result<CallResult> {
	let converted = match ctx.arguments().first().coerce_number() {
		Some(number) => Value::from(number),
		None => Value::nil(),
	};
	Ok(CallResult::new(converted))
}

/// `assert(v, message?)`: raises unless `v` is truthy; passes the arguments
/// through otherwise, like Lua.
fn assert_fn(ctx: CallContext) -> Result<CallResult> {
	let checked = ctx.arguments().first();
	if checked.is_truthy() {
		return Ok(CallResult::new(ctx.arguments().clone()));
	}

	let message = match ctx.arguments().get(1) {
		message if message.is_nil() => "assertion failed!".to_string(),
		message => message.to_string(),
	};
	Err(Error::new(ErrorKind::AssertionFailed(message)))
}

/// `force(value, target)`: computes the source change that would make
/// `value` evaluate to `target` and attaches it to the call result. Returns
/// `target` either way; when the value's origin can't be inverted there is
/// simply no change attached.
fn force(ctx: CallContext) -> Result<CallResult> {
	let value = ctx.arguments().first();
	let target = ctx.arguments().get(1);

	let change = value.force(&target);
	Ok(CallResult::new(target).with_source_change(change))
}

fn math_table() -> Table {
	let math = Table::new();

	let set_fn = |name: &str, func: fn(CallContext) -> Result<CallResult>| {
		let value = Value::from(Function::native(format!("math.{name}"), func));
		math.set(Value::from(name), value).expect("string keys are always valid");
	};

	set_fn("floor", |ctx| math_unary(ctx, f64::floor));
	set_fn("ceil", |ctx| math_unary(ctx, f64::ceil));
	set_fn("abs", |ctx| math_unary(ctx, f64::abs));
	set_fn("sqrt", |ctx| math_unary(ctx, f64::sqrt));
	set_fn("max", |ctx| math_fold(ctx, f64::max));
	set_fn("min", |ctx| math_fold(ctx, f64::min));

	let rng = RefCell::new(StdRng::from_entropy());
	let random = Function::native("math.random", move |ctx| {
		let mut rng = rng.borrow_mut();
		random(&mut rng, ctx)
	});
	math.set(Value::from("random"), Value::from(random)).expect("string keys are always valid");

	math.set(Value::from("pi"), Value::from(std::f64::consts::PI))
		.expect("string keys are always valid");
	math.set(Value::from("huge"), Value::from(f64::INFINITY))
		.expect("string keys are always valid");

	math
}

fn math_arg(ctx: &CallContext, index: usize) -> Result<f64> {
	match ctx.arguments().get(index).coerce_number() {
		Some(number) => Ok(number.value()),
		None => Err(Error::new(ErrorKind::NativeFunction {
			name: "math".to_string(),
			message: format!(
				"argument #{} must be a number, got a {}",
				index + 1,
				ctx.arguments().get(index).type_name()
			),
		})),
	}
}

fn math_unary(ctx: CallContext, op: fn(f64) -> f64) -> Result<CallResult> {
	let arg = math_arg(&ctx, 0)?;
	Ok(CallResult::new(Value::from(op(arg))))
}

fn math_fold(ctx: CallContext, op: fn(f64, f64) -> f64) -> Result<CallResult> {
	let mut accumulated = math_arg(&ctx, 0)?;
	for index in 1..ctx.arguments().len() {
		accumulated = op(accumulated, math_arg(&ctx, index)?);
	}
	Ok(CallResult::new(Value::from(accumulated)))
}

/// `math.random()`: uniform in `[0, 1)`; `math.random(m)`: integer in
/// `[1, m]`; `math.random(m, n)`: integer in `[m, n]`.
fn random(rng: &mut StdRng, ctx: CallContext) -> Result<CallResult> {
	let value = match ctx.arguments().len() {
		0 => rng.gen::<f64>(),
		1 => {
			let upper = math_arg(&ctx, 0)? as i64;
			range_check(1, upper)?;
			rng.gen_range(1..=upper) as f64
		}
		_ => {
			let lower = math_arg(&ctx, 0)? as i64;
			let upper = math_arg(&ctx, 1)? as i64;
			range_check(lower, upper)?;
			rng.gen_range(lower..=upper) as f64
		}
	};

	Ok(CallResult::new(Value::from(value)))
}

fn range_check(lower: i64, upper: i64) -> Result<()> {
	if lower > upper {
		return Err(Error::new(ErrorKind::NativeFunction {
			name: "math.random".to_string(),
			message: "interval is empty".to_string(),
		}));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::env::Scope;

	fn call(function: &Value, args: Vec<Value>) -> Result<CallResult> {
		let scope = Scope::new();
		let ctx = CallContext::new(scope, None, Vallist::from(args));
		match function.as_function().expect("not callable").kind() {
			crate::value::FunctionKind::Native(native) => (native.func)(ctx),
			crate::value::FunctionKind::Lua(_) => unreachable!("stdlib is native"),
		}
	}

	fn registered(name: &str) -> Value {
		let mut env = Environment::new();
		register(&mut env);
		env.get(name)
	}

	#[test]
	fn type_names() {
		let type_fn = registered("type");
		let result = call(&type_fn, vec![Value::nil()]).unwrap();
		assert_eq!(result.values().first(), Value::from("nil"));

		let result = call(&type_fn, vec![Value::from(1.0)]).unwrap();
		assert_eq!(result.values().first(), Value::from("number"));
	}

	#[test]
	fn tostring_uses_canonical_forms() {
		let tostring = registered("tostring");
		assert_eq!(
			call(&tostring, vec![Value::from(1.5)]).unwrap().values().first(),
			Value::from("1.5")
		);
		assert_eq!(
			call(&tostring, vec![Value::from(true)]).unwrap().values().first(),
			Value::from("true")
		);
	}

	#[test]
	fn tonumber_parses_or_returns_nil() {
		let tonumber = registered("tonumber");
		assert_eq!(
			call(&tonumber, vec![Value::from(" 42 ")]).unwrap().values().first(),
			Value::from(42.0)
		);
		assert_eq!(
			call(&tonumber, vec![Value::from("nope")]).unwrap().values().first(),
			Value::nil()
		);
	}

	#[test]
	fn assert_passes_arguments_through() {
		let assert_fn = registered("assert");
		let result = call(&assert_fn, vec![Value::from(1.0), Value::from("msg")]).unwrap();
		assert_eq!(result.values().len(), 2);

		let error = call(&assert_fn, vec![Value::nil()]).unwrap_err();
		assert!(matches!(error.kind(), ErrorKind::AssertionFailed(_)));
	}

	#[test]
	fn math_functions() {
		let mut env = Environment::new();
		register(&mut env);
		let math = env.get("math");
		let math = math.as_table().expect("math is a table");

		let floor = math.get(&Value::from("floor")).unwrap();
		assert_eq!(
			call(&floor, vec![Value::from(1.9)]).unwrap().values().first(),
			Value::from(1.0)
		);

		let max = math.get(&Value::from("max")).unwrap();
		assert_eq!(
			call(&max, vec![Value::from(1.0), Value::from(3.0), Value::from(2.0)])
				.unwrap()
				.values()
				.first(),
			Value::from(3.0)
		);

		let pi = math.get(&Value::from("pi")).unwrap();
		assert_eq!(pi, Value::from(std::f64::consts::PI));
	}

	#[test]
	fn random_stays_in_range() {
		let mut env = Environment::new();
		register(&mut env);
		let math = env.get("math");
		let random = math.as_table().expect("math is a table").get(&Value::from("random")).unwrap();

		for _ in 0..32 {
			let value = call(&random, vec![Value::from(6.0)])
				.unwrap()
				.values()
				.first()
				.as_number()
				.expect("random returns a number")
				.value();
			assert!((1.0..=6.0).contains(&value));
			assert_eq!(value.fract(), 0.0);
		}
	}

	#[test]
	fn force_attaches_a_change_when_possible() {
		use crate::location::{Location, Point, Range};
		use crate::origin::Origin;

		let force_fn = registered("force");

		// no origin: target returned, no change
		let result = call(&force_fn, vec![Value::from(1.0), Value::from(2.0)]).unwrap();
		assert_eq!(result.values().first(), Value::from(2.0));
		assert!(result.source_change().is_none());

		// a literal origin produces an edit
		let loc = |byte| Location { point: Point { row: 0, column: byte }, byte };
		let origin = Origin::Literal { range: Range { start: loc(0), end: loc(2) } };
		let value = Value::from(42.0).with_origin(origin);

		let result = call(&force_fn, vec![value, Value::from(7.0)]).unwrap();
		assert!(result.source_change().is_some());
	}
}
