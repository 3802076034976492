//! The boundary to the parser collaborator.
//!
//! Parsing is delegated to tree-sitter with the Lua grammar. This module
//! drives the parser, reports syntax errors as a [`ParseResult`] (returned,
//! never raised), and lowers the concrete tree into the owned [`crate::ast`]
//! tree the evaluator walks.

use crate::ast::{
	Assignment, BinaryOp, Block, Expression, FunctionBody, FunctionCall, IfArm, IfStatement,
	NumericFor, Statement, TableField, Target, UnaryOp,
};
use crate::container::RefCount;
use crate::location::{Location, Point, Range};
use crate::value::Number;
use std::fmt::{self, Display, Formatter};
use tree_sitter::Node;

/// Node kinds that carry no meaning for evaluation.
const IGNORED_NODES: [&str; 2] = [";", "comment"];

/// A single parse diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
	pub message: String,
	pub range: Option<Range>,
}

impl Display for ParseError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self.range {
			Some(range) => write!(f, "{}: {}", range.start, self.message),
			None => f.write_str(&self.message),
		}
	}
}

/// The outcome of [`Interpreter::parse`](crate::Interpreter::parse).
///
/// Converts to a boolean: empty error list means the parse succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
	pub errors: Vec<ParseError>,
}

impl ParseResult {
	#[must_use]
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty()
	}
}

impl From<&ParseResult> for bool {
	fn from(result: &ParseResult) -> bool {
		result.is_ok()
	}
}

impl Display for ParseResult {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		if self.is_ok() {
			return f.write_str("ok");
		}
		for (index, error) in self.errors.iter().enumerate() {
			if index > 0 {
				writeln!(f)?;
			}
			Display::fmt(error, f)?;
		}
		Ok(())
	}
}

/// The tree-sitter parser plus the lowering pass.
pub(crate) struct LuaParser {
	inner: tree_sitter::Parser,
}

impl LuaParser {
	pub fn new() -> Self {
		let mut inner = tree_sitter::Parser::new();
		inner
			.set_language(&tree_sitter_lua::LANGUAGE.into())
			.expect("the bundled Lua grammar is compatible with the linked tree-sitter");
		Self { inner }
	}

	/// Parses `source` and lowers it. Any syntax error fails the whole parse.
	pub fn parse(&mut self, source: &str) -> Result<Block, Vec<ParseError>> {
		let tree = self.inner.parse(source, None).ok_or_else(|| {
			vec![ParseError { message: "parser produced no tree".to_string(), range: None }]
		})?;

		let root = tree.root_node();
		let errors = collect_syntax_errors(root, source);
		if !errors.is_empty() {
			return Err(errors);
		}

		lower_program(root, source).map_err(|error| vec![error])
	}
}

fn collect_syntax_errors(root: Node, source: &str) -> Vec<ParseError> {
	let mut errors = Vec::new();
	let mut stack = vec![root];

	while let Some(node) = stack.pop() {
		if node.is_error() {
			let snippet: String = text(node, source).chars().take(20).collect();
			errors.push(ParseError {
				message: format!("syntax error near `{snippet}`"),
				range: Some(convert_range(node.range())),
			});
			continue;
		}
		if node.is_missing() {
			errors.push(ParseError {
				message: format!("missing `{}`", node.kind()),
				range: Some(convert_range(node.range())),
			});
			continue;
		}

		if node.has_error() {
			for index in 0..node.child_count() {
				if let Some(child) = node.child(index) {
					stack.push(child);
				}
			}
		}
	}

	errors.sort_by_key(|error| error.range.map(|range| range.start.byte));
	errors
}

pub(crate) fn convert_range(range: tree_sitter::Range) -> Range {
	let convert = |point: tree_sitter::Point, byte| Location {
		point: Point { row: point.row, column: point.column },
		byte,
	};
	Range {
		start: convert(range.start_point, range.start_byte),
		end: convert(range.end_point, range.end_byte),
	}
}

type Lower<T> = Result<T, ParseError>;

fn text<'s>(node: Node, source: &'s str) -> &'s str {
	source.get(node.byte_range()).unwrap_or_default()
}

fn children_of<'t>(node: Node<'t>) -> Vec<Node<'t>> {
	let mut cursor = node.walk();
	let children = node.children(&mut cursor).collect();
	children
}

fn unsupported<T>(node: Node) -> Lower<T> {
	Err(ParseError {
		message: format!("unsupported construct `{}`", node.kind()),
		range: Some(convert_range(node.range())),
	})
}

fn malformed<T>(node: Node, what: &str) -> Lower<T> {
	Err(ParseError {
		message: format!("malformed `{}`: {what}", node.kind()),
		range: Some(convert_range(node.range())),
	})
}

fn lower_program(node: Node, source: &str) -> Lower<Block> {
	if node.kind() != "chunk" {
		return malformed(node, "expected a program root");
	}
	lower_statement_nodes(&children_of(node), source)
}

fn lower_statement_nodes(nodes: &[Node], source: &str) -> Lower<Block> {
	let mut statements = Vec::new();
	for node in nodes {
		if IGNORED_NODES.contains(&node.kind()) {
			continue;
		}
		statements.push(lower_statement(*node, source)?);
	}
	Ok(Block { statements })
}

fn lower_statement(node: Node, source: &str) -> Lower<Statement> {
	match node.kind() {
		"variable_declaration" => lower_assignment(node, source, false).map(Statement::Assign),
		"local_variable_declaration" => {
			lower_assignment(node, source, true).map(Statement::Assign)
		}
		"do_statement" => {
			let children = children_of(node);
			let body = slice_body(&children, 1, &["end"], source)?;
			Ok(Statement::Do { body, range: convert_range(node.range()) })
		}
		"if_statement" => lower_if(node, source).map(Statement::If),
		"while_statement" => lower_while(node, source),
		"repeat_statement" => lower_repeat(node, source),
		"for_statement" => lower_numeric_for(node, source).map(Statement::NumericFor),
		"break_statement" => Ok(Statement::Break(convert_range(node.range()))),
		"return_statement" => {
			let children = children_of(node);
			let exprs = lower_expression_list(&children[1..], source)?;
			Ok(Statement::Return { exprs, range: convert_range(node.range()) })
		}
		"function_call" => lower_call(node, source).map(Statement::Call),
		"function" | "function_definition" => lower_named_function(node, source, false),
		"local_function" => lower_named_function(node, source, true),
		_ => unsupported(node),
	}
}

/// Lowers the statement nodes of `children[from..]` up to (exclusive) the
/// first child whose kind is in `stops`.
fn slice_body(children: &[Node], from: usize, stops: &[&str], source: &str) -> Lower<Block> {
	let body_end = children[from..]
		.iter()
		.position(|child| stops.contains(&child.kind()))
		.map_or(children.len(), |offset| from + offset);
	lower_statement_nodes(&children[from..body_end], source)
}

fn lower_assignment(node: Node, source: &str, local: bool) -> Lower<Assignment> {
	let children = children_of(node);
	let eq_index = children.iter().position(|child| child.kind() == "=");

	let target_end = eq_index.unwrap_or(children.len());
	let mut targets = Vec::new();
	for child in &children[..target_end] {
		match child.kind() {
			"local" | "," => continue,
			_ => targets.push(lower_target(*child, source)?),
		}
	}
	if targets.is_empty() {
		return malformed(node, "no assignment targets");
	}

	let exprs = match eq_index {
		Some(eq_index) => lower_expression_list(&children[eq_index + 1..], source)?,
		None if local => Vec::new(),
		None => return malformed(node, "missing `=`"),
	};

	if local {
		// a local declaration can only introduce plain names
		for target in &targets {
			if !matches!(target, Target::Name(..)) {
				return malformed(node, "local declarations can only bind names");
			}
		}
	}

	Ok(Assignment { targets, exprs, local, range: convert_range(node.range()) })
}

fn lower_target(node: Node, source: &str) -> Lower<Target> {
	match node.kind() {
		// the declarator is a thin wrapper around the actual target
		"variable_declarator" => {
			let inner = children_of(node);
			match inner.as_slice() {
				[single] => lower_target(*single, source),
				_ => lower_target_parts(node, &inner, source),
			}
		}
		"identifier" => Ok(Target::Name(text(node, source).to_string(), convert_range(node.range()))),
		"field_expression" | "table_index" => {
			lower_target_parts(node, &children_of(node), source)
		}
		_ => unsupported(node),
	}
}

/// Recognizes `obj.name` and `obj[key]` target shapes from a child list.
fn lower_target_parts(node: Node, children: &[Node], source: &str) -> Lower<Target> {
	let range = convert_range(node.range());

	if let Some(bracket) = children.iter().position(|child| child.kind() == "[") {
		let parts = bracket
			.checked_sub(1)
			.and_then(|before| children.get(before).zip(children.get(bracket + 1)));
		return match parts {
			Some((object, key)) => Ok(Target::Index {
				object: lower_expression(*object, source)?,
				key: lower_expression(*key, source)?,
				range,
			}),
			None => malformed(node, "index target without an object"),
		};
	}

	if children.iter().any(|child| child.kind() == ".") {
		let object = lower_expression(children[0], source)?;
		let name = children
			.last()
			.filter(|child| child.kind() == "identifier" || child.kind() == "property_identifier");
		return match name {
			Some(name) => {
				Ok(Target::Field { object, name: text(*name, source).to_string(), range })
			}
			None => malformed(node, "field assignment without a field name"),
		};
	}

	malformed(node, "unrecognized assignment target")
}

fn lower_if(node: Node, source: &str) -> Lower<IfStatement> {
	let children = children_of(node);
	let range = convert_range(node.range());

	let condition = match children.iter().find(|child| child.kind() == "condition_expression") {
		Some(condition) => lower_condition(*condition, source)?,
		None => return malformed(node, "if without a condition"),
	};

	let then_index = match children.iter().position(|child| child.kind() == "then") {
		Some(index) => index,
		None => return malformed(node, "if without `then`"),
	};

	let body = slice_body(&children[then_index + 1..], 0, &["elseif", "else", "end"], source)?;
	let mut arms = vec![IfArm { condition, body }];
	let mut else_body = None;

	for child in &children[then_index + 1..] {
		match child.kind() {
			"elseif" => arms.push(lower_elseif(*child, source)?),
			"else" => {
				let else_children = children_of(*child);
				else_body = Some(slice_body(&else_children, 1, &["end"], source)?);
			}
			_ => {}
		}
	}

	Ok(IfStatement { arms, else_body, range })
}

fn lower_elseif(node: Node, source: &str) -> Lower<IfArm> {
	let children = children_of(node);

	let condition = match children.iter().find(|child| child.kind() == "condition_expression") {
		Some(condition) => lower_condition(*condition, source)?,
		None => return malformed(node, "elseif without a condition"),
	};

	let then_index = match children.iter().position(|child| child.kind() == "then") {
		Some(index) => index,
		None => return malformed(node, "elseif without `then`"),
	};

	let body = lower_statement_nodes(&children[then_index + 1..], source)?;
	Ok(IfArm { condition, body })
}

fn lower_while(node: Node, source: &str) -> Lower<Statement> {
	let children = children_of(node);

	let condition = match children.iter().find(|child| child.kind() == "condition_expression") {
		Some(condition) => lower_condition(*condition, source)?,
		None => return malformed(node, "while without a condition"),
	};

	let do_index = match children.iter().position(|child| child.kind() == "do") {
		Some(index) => index,
		None => return malformed(node, "while without `do`"),
	};

	let body = slice_body(&children, do_index + 1, &["end"], source)?;
	Ok(Statement::While { condition, body, range: convert_range(node.range()) })
}

fn lower_repeat(node: Node, source: &str) -> Lower<Statement> {
	let children = children_of(node);

	let until_index = match children.iter().position(|child| child.kind() == "until") {
		Some(index) => index,
		None => return malformed(node, "repeat without `until`"),
	};

	let body = lower_statement_nodes(&children[1..until_index], source)?;
	let condition = match children.get(until_index + 1) {
		Some(condition) => lower_condition(*condition, source)?,
		None => return malformed(node, "repeat without a condition"),
	};

	Ok(Statement::Repeat { body, condition, range: convert_range(node.range()) })
}

fn lower_numeric_for(node: Node, source: &str) -> Lower<NumericFor> {
	let children = children_of(node);

	// generic `for ... in` is out of this subset
	if children.iter().any(|child| child.kind() == "in") {
		return unsupported(node);
	}

	let loop_expr = match children.iter().find(|child| child.kind() == "loop_expression") {
		Some(loop_expr) => *loop_expr,
		None => return malformed(node, "for without a loop expression"),
	};

	let mut named = Vec::new();
	for index in 0..loop_expr.named_child_count() {
		if let Some(child) = loop_expr.named_child(index) {
			named.push(child);
		}
	}

	let (variable_node, bounds) = match named.split_first() {
		Some((variable, bounds)) if variable.kind() == "identifier" => (*variable, bounds),
		_ => return malformed(node, "loop variable is not a name"),
	};

	let (start, stop, step) = match bounds {
		[start, stop] => (start, stop, None),
		[start, stop, step] => (start, stop, Some(lower_expression(*step, source)?)),
		_ => return malformed(node, "expected start, stop and optional step"),
	};

	let do_index = match children.iter().position(|child| child.kind() == "do") {
		Some(index) => index,
		None => return malformed(node, "for without `do`"),
	};
	let body = slice_body(&children, do_index + 1, &["end"], source)?;

	Ok(NumericFor {
		variable: text(variable_node, source).to_string(),
		start: lower_expression(*start, source)?,
		stop: lower_expression(*stop, source)?,
		step,
		body,
		range: convert_range(node.range()),
	})
}

/// Lowers a `function f(...) ... end` / `local function f(...) ... end`
/// statement into an assignment of a function literal.
fn lower_named_function(node: Node, source: &str, local: bool) -> Lower<Statement> {
	let children = children_of(node);
	let range = convert_range(node.range());

	let name_node = children
		.iter()
		.find(|child| child.kind() == "function_name" || child.kind() == "identifier");
	let name_node = match name_node {
		Some(name_node) => *name_node,
		None => return malformed(node, "function statement without a name"),
	};

	let target = lower_function_name(name_node, source)?;
	if local && !matches!(target, Target::Name(..)) {
		return malformed(node, "local functions can only bind names");
	}

	let body = lower_function_body(node, &children, source)?;
	Ok(Statement::Assign(Assignment {
		targets: vec![target],
		exprs: vec![Expression::Function(body)],
		local,
		range,
	}))
}

fn lower_function_name(node: Node, source: &str) -> Lower<Target> {
	let range = convert_range(node.range());

	if node.kind() == "identifier" {
		return Ok(Target::Name(text(node, source).to_string(), range));
	}

	let parts = children_of(node);
	if parts.iter().any(|part| part.kind() == ":") {
		// method definitions need `self`, which this subset doesn't have
		return unsupported(node);
	}

	let names: Vec<_> =
		parts.iter().filter(|part| part.kind() == "identifier").copied().collect();
	match names.as_slice() {
		[single] => Ok(Target::Name(text(*single, source).to_string(), range)),
		[object, field] => Ok(Target::Field {
			object: Expression::Name(
				text(*object, source).to_string(),
				convert_range(object.range()),
			),
			name: text(*field, source).to_string(),
			range,
		}),
		_ => unsupported(node),
	}
}

fn lower_function_body(
	node: Node,
	children: &[Node],
	source: &str,
) -> Lower<RefCount<FunctionBody>> {
	let parameters = match children.iter().find(|child| child.kind() == "parameters") {
		Some(parameters) => *parameters,
		None => return malformed(node, "function without a parameter list"),
	};

	let mut params = Vec::new();
	for param in children_of(parameters) {
		match param.kind() {
			"(" | ")" | "," => {}
			"identifier" => params.push(text(param, source).to_string()),
			_ => return unsupported(param),
		}
	}

	let params_index = children
		.iter()
		.position(|child| child.kind() == "parameters")
		.expect("parameters located above");
	let body = slice_body(children, params_index + 1, &["end"], source)?;

	Ok(RefCount::new(FunctionBody { params, body, range: convert_range(node.range()) }))
}

/// Unwraps the `condition_expression` node around if/while/until conditions.
fn lower_condition(node: Node, source: &str) -> Lower<Expression> {
	if node.kind() != "condition_expression" {
		return lower_expression(node, source);
	}
	match node.named_child(0) {
		Some(inner) => lower_expression(inner, source),
		None => malformed(node, "empty condition"),
	}
}

/// Lowers a comma-separated run of expression nodes.
fn lower_expression_list(nodes: &[Node], source: &str) -> Lower<Vec<Expression>> {
	let mut exprs = Vec::new();
	for node in nodes {
		match node.kind() {
			"," => continue,
			kind if IGNORED_NODES.contains(&kind) => continue,
			_ => exprs.push(lower_expression(*node, source)?),
		}
	}
	Ok(exprs)
}

fn lower_expression(node: Node, source: &str) -> Lower<Expression> {
	let range = convert_range(node.range());

	match node.kind() {
		"nil" => Ok(Expression::Nil(range)),
		"true" => Ok(Expression::True(range)),
		"false" => Ok(Expression::False(range)),
		"number" => match Number::parse(text(node, source)) {
			Some(number) => Ok(Expression::Number(number.value(), range)),
			None => malformed(node, "not a Lua numeral"),
		},
		"string" => {
			let content = parse_string_literal(node, text(node, source))?;
			Ok(Expression::String(content, range))
		}
		"identifier" => Ok(Expression::Name(text(node, source).to_string(), range)),
		"condition_expression" | "parenthesized_expression" => match node.named_child(0) {
			Some(inner) => lower_expression(inner, source),
			None => malformed(node, "empty grouping"),
		},
		"unary_operation" => {
			let children = children_of(node);
			let (op_node, operand) = match children.as_slice() {
				[op_node, operand] => (*op_node, *operand),
				_ => return malformed(node, "expected operator and operand"),
			};
			let op = match UnaryOp::from_token(op_node.kind()) {
				Some(op) => op,
				None => return malformed(node, "unknown unary operator"),
			};
			Ok(Expression::Unary {
				op,
				operand: Box::new(lower_expression(operand, source)?),
				range,
			})
		}
		"binary_operation" => {
			let children = children_of(node);
			let (lhs, op_node, rhs) = match children.as_slice() {
				[lhs, op_node, rhs] => (*lhs, *op_node, *rhs),
				_ => return malformed(node, "expected two operands and an operator"),
			};
			let op = match BinaryOp::from_token(op_node.kind()) {
				Some(op) => op,
				None => return malformed(node, "unknown binary operator"),
			};
			Ok(Expression::Binary {
				op,
				lhs: Box::new(lower_expression(lhs, source)?),
				rhs: Box::new(lower_expression(rhs, source)?),
				range,
			})
		}
		"function_call" => lower_call(node, source).map(Expression::Call),
		"function" | "function_definition" => {
			let children = children_of(node);
			lower_function_body(node, &children, source).map(Expression::Function)
		}
		"table" => lower_table(node, source),
		"field_expression" => {
			let children = children_of(node);
			let object = lower_expression(children[0], source)?;
			let name = children
				.last()
				.filter(|c| c.kind() == "identifier" || c.kind() == "property_identifier");
			match name {
				Some(name) => Ok(Expression::Field {
					object: Box::new(object),
					name: text(*name, source).to_string(),
					range,
				}),
				None => malformed(node, "field access without a field name"),
			}
		}
		"table_index" => {
			let children = children_of(node);
			let bracket = match children.iter().position(|child| child.kind() == "[") {
				Some(index) if index > 0 => index,
				_ => return malformed(node, "index without an object"),
			};
			let key = match children.get(bracket + 1) {
				Some(key) => *key,
				None => return malformed(node, "index without a key"),
			};
			Ok(Expression::Index {
				object: Box::new(lower_expression(children[bracket - 1], source)?),
				key: Box::new(lower_expression(key, source)?),
				range,
			})
		}
		_ => unsupported(node),
	}
}

fn lower_call(node: Node, source: &str) -> Lower<FunctionCall> {
	let children = children_of(node);
	let range = convert_range(node.range());

	if children.iter().any(|child| child.kind() == ":") {
		return unsupported(node);
	}

	let callee = match children.first() {
		Some(callee) => lower_expression(*callee, source)?,
		None => return malformed(node, "call without a callee"),
	};

	let args = match children.iter().find(|child| child.kind() == "arguments") {
		Some(arguments) => {
			let mut args = Vec::new();
			for arg in children_of(*arguments) {
				match arg.kind() {
					"(" | ")" | "," => {}
					_ => args.push(lower_expression(arg, source)?),
				}
			}
			args
		}
		// `f "str"` / `f {t}` sugar passes a single argument
		None => match children.get(1) {
			Some(arg) if arg.kind() == "string" || arg.kind() == "table" => {
				vec![lower_expression(*arg, source)?]
			}
			_ => return malformed(node, "call without arguments"),
		},
	};

	Ok(FunctionCall { callee: Box::new(callee), args, range })
}

fn lower_table(node: Node, source: &str) -> Lower<Expression> {
	let children = children_of(node);
	let range = convert_range(node.range());
	let mut fields = Vec::new();

	let mut index = 0;
	while index < children.len() {
		let child = children[index];
		match child.kind() {
			"{" | "}" | "," | ";" | "comment" => index += 1,

			// `[k] = v`
			"[" => {
				let key = children.get(index + 1).copied();
				let eq = children.get(index + 3).map(Node::kind);
				let value = children.get(index + 4).copied();
				match (key, eq, value) {
					(Some(key), Some("="), Some(value)) => {
						fields.push(TableField::Keyed {
							key: lower_expression(key, source)?,
							value: lower_expression(value, source)?,
						});
						index += 5;
					}
					_ => return malformed(node, "expected `[key] = value`"),
				}
			}

			// `name = v` (an identifier directly followed by `=`)
			"identifier" if children.get(index + 1).map(Node::kind) == Some("=") => {
				let value = match children.get(index + 2) {
					Some(value) => lower_expression(*value, source)?,
					None => return malformed(node, "expected a value after `=`"),
				};
				fields.push(TableField::Named {
					name: text(child, source).to_string(),
					value,
				});
				index += 3;
			}

			// `field` wrapper nodes delegate to the same shapes
			"field" => {
				let inner = children_of(child);
				let mut wrapped = lower_table_field(child, &inner, source)?;
				fields.append(&mut wrapped);
				index += 1;
			}

			_ => {
				fields.push(TableField::Positional(lower_expression(child, source)?));
				index += 1;
			}
		}
	}

	Ok(Expression::Table { fields, range })
}

fn lower_table_field(node: Node, children: &[Node], source: &str) -> Lower<Vec<TableField>> {
	if children.iter().any(|child| child.kind() == "[") {
		let bracket = children.iter().position(|child| child.kind() == "[").expect("just found");
		let key = lower_expression(children[bracket + 1], source)?;
		let value = match children.last() {
			Some(value) => lower_expression(*value, source)?,
			None => return malformed(node, "field without a value"),
		};
		return Ok(vec![TableField::Keyed { key, value }]);
	}

	if children.len() >= 3 && children[1].kind() == "=" && children[0].kind() == "identifier" {
		return Ok(vec![TableField::Named {
			name: text(children[0], source).to_string(),
			value: lower_expression(children[2], source)?,
		}]);
	}

	match children {
		[value] => Ok(vec![TableField::Positional(lower_expression(*value, source)?)]),
		_ => malformed(node, "unrecognized table field"),
	}
}

/// Strips the quotes from a string literal and processes the escape set:
/// the C-style control escapes, `\\`, `\"`, `\'`, decimal `\ddd` and hex
/// `\xXX`.
fn parse_string_literal(node: Node, raw: &str) -> Lower<String> {
	let mut chars = raw.chars();
	let quote = match chars.next() {
		Some(quote @ ('"' | '\'')) => quote,
		// long bracket strings are not part of this subset
		_ => return unsupported(node),
	};
	if !raw.ends_with(quote) || raw.len() < 2 {
		return malformed(node, "unterminated string");
	}

	let inner = &raw[1..raw.len() - 1];
	let mut content = String::with_capacity(inner.len());
	let mut chars = inner.chars();

	while let Some(chr) = chars.next() {
		if chr != '\\' {
			content.push(chr);
			continue;
		}

		match chars.next() {
			Some('a') => content.push('\x07'),
			Some('b') => content.push('\x08'),
			Some('f') => content.push('\x0c'),
			Some('n') => content.push('\n'),
			Some('r') => content.push('\r'),
			Some('t') => content.push('\t'),
			Some('v') => content.push('\x0b'),
			Some('\\') => content.push('\\'),
			Some('"') => content.push('"'),
			Some('\'') => content.push('\''),
			Some('\n') => content.push('\n'),
			Some('x') => {
				let hex: String = chars.clone().take(2).collect();
				match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
					Some(decoded) if hex.len() == 2 => {
						content.push(decoded);
						chars.nth(1);
					}
					_ => return malformed(node, "bad hex escape"),
				}
			}
			Some(digit) if digit.is_ascii_digit() => {
				let mut code = digit.to_digit(10).unwrap_or(0);
				for _ in 0..2 {
					let mut peek = chars.clone();
					match peek.next().and_then(|c| c.to_digit(10)) {
						Some(next) => {
							code = code * 10 + next;
							chars = peek;
						}
						None => break,
					}
				}
				match char::from_u32(code) {
					Some(decoded) if code <= 255 => content.push(decoded),
					_ => return malformed(node, "decimal escape too large"),
				}
			}
			_ => return malformed(node, "unknown escape"),
		}
	}

	Ok(content)
}
