use clap::Parser;
use minilua::{Interpreter, InterpreterConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run MiniLua programs and optionally apply the source changes they propose.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
	/// Program file to run.
	file: Option<PathBuf>,

	/// Evaluate SOURCE instead of reading a file.
	#[arg(short, long, value_name = "SOURCE", conflicts_with = "file")]
	expression: Option<String>,

	/// Apply the proposed source changes, re-evaluate, and print the final
	/// program text.
	#[arg(short, long)]
	apply_changes: bool,

	/// Trace every visited syntax node and every function call to stderr.
	#[arg(long)]
	trace: bool,
}

impl Cli {
	pub fn run(self) -> ExitCode {
		if self.trace {
			tracing_subscriber::fmt()
				.with_writer(std::io::stderr)
				.with_max_level(tracing::Level::TRACE)
				.init();
		}

		let source = match self.read_source() {
			Ok(source) => source,
			Err(message) => {
				eprintln!("minilua: {message}");
				return ExitCode::FAILURE;
			}
		};

		let (mut interpreter, parsed) = Interpreter::with_source(&source);
		if !parsed.is_ok() {
			eprintln!("minilua: parse failed:\n{parsed}");
			return ExitCode::FAILURE;
		}

		interpreter.set_config(InterpreterConfig {
			trace_nodes: self.trace,
			trace_calls: self.trace,
		});
		minilua::stdlib::register(interpreter.environment());

		let result = match interpreter.evaluate() {
			Ok(result) => result,
			Err(error) => {
				eprintln!("minilua: {error}");
				return ExitCode::FAILURE;
			}
		};

		if let Some(change) = result.source_change {
			if self.apply_changes {
				if let Err(error) = interpreter.apply_source_change(&change) {
					eprintln!("minilua: {error}");
					return ExitCode::FAILURE;
				}
				if let Err(error) = interpreter.evaluate() {
					eprintln!("minilua: {error}");
					return ExitCode::FAILURE;
				}
				println!("{}", interpreter.source_code());
			} else {
				eprintln!("proposed source change: {change:?}");
			}
		}

		ExitCode::SUCCESS
	}

	fn read_source(&self) -> Result<String, String> {
		match (&self.file, &self.expression) {
			(_, Some(expression)) => Ok(expression.clone()),
			(Some(path), None) => std::fs::read_to_string(path)
				.map_err(|error| format!("cannot read {}: {error}", path.display())),
			(None, None) => Err("no program given; pass a file or use -e".to_string()),
		}
	}
}
