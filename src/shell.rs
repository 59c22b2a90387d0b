//! The interactive command shell: a line-oriented REPL with
//! `help`, `getconfig`, `setconfig <option> [value]`, `run [-r|-d|-m]
//! <scenario>`, `rweg2gexf <in> [out]`, `exit`.
//!
//! The tokeniser preserves embedded whitespace inside `"..."` quotes
//! and splits everything else on whitespace; each command dispatches
//! straight into the library core rather than re-implementing any
//! logic inline.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use wanders_cli::error::CoreError;
use wanders_cli::metric_graph::MetricGraph;

use wanders_cli::scenario;

use crate::config::Config;
use crate::report::{header, render_row, ReportRow, Verbosity};

const BANNER: &str = "Wanders Emulator v0.1 -- continuous-time random walks on metric graphs\nType 'help' to list the available commands.\n";

const HELP_TEXT: &str = "\
Available commands:\n\
  help                          show this message\n\
  getconfig                     print the persisted CLI defaults\n\
  setconfig <opt> [value]       set (or, with no value, reset) a default: ewsv, ewe, ewtd, ewsf, or *\n\
  run [-r|-d|-m] <scenario>     run every epsilon-saturation block in a scenario file\n\
  rweg2gexf <in> [out]          convert a binary .rweg dump to GEXF\n\
  gexf2rweg <in> [out]          convert a GEXF file to the binary .rweg dump\n\
  exit                          quit the shell\n";

/// Splits a shell line into tokens, honouring `\"..\"` quoting exactly
/// as the reference tokeniser does: quotes toggle a mode where
/// whitespace is kept verbatim, and are themselves dropped from the
/// resulting token.
fn tokenize(line: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut current = String::new();
	let mut quoted = false;
	let mut has_token = false;
	for c in line.chars() {
		if c == '"' {
			quoted = !quoted;
			has_token = true;
			continue;
		}
		if c.is_whitespace() && !quoted {
			if has_token {
				tokens.push(std::mem::take(&mut current));
				has_token = false;
			}
			continue;
		}
		current.push(c);
		has_token = true;
	}
	if has_token {
		tokens.push(current);
	}
	tokens
}

fn config_path() -> PathBuf {
	PathBuf::from("wanders.config")
}

/// Runs the interactive shell until `exit` or EOF on stdin.
pub fn run() -> io::Result<()> {
	print!("{}", BANNER);
	io::stdout().flush()?;

	let path = config_path();
	let mut config = Config::load_or_create(&path).unwrap_or_default();

	let stdin = io::stdin();
	loop {
		print!(">>> ");
		io::stdout().flush()?;
		let mut line = String::new();
		if stdin.read_line(&mut line)? == 0 {
			break;
		}
		let tokens = tokenize(&line);
		if tokens.is_empty() {
			continue;
		}
		match tokens[0].as_str() {
			"exit" => break,
			"help" => print!("{}", HELP_TEXT),
			"getconfig" => print!("{}", config.render()),
			"setconfig" => {
				if let Err(e) = cmd_setconfig(&mut config, &path, &tokens[1..]) {
					eprintln!("COMMAND LINE ERROR. {}", e);
				}
			}
			"run" => {
				if let Err(e) = cmd_run(&tokens[1..]) {
					eprintln!("ERROR. {}", e);
				}
			}
			"rweg2gexf" => {
				if let Err(e) = cmd_convert(&tokens[1..], Direction::BinaryToGexf) {
					eprintln!("FILE ERROR. {}", e);
				}
			}
			"gexf2rweg" => {
				if let Err(e) = cmd_convert(&tokens[1..], Direction::GexfToBinary) {
					eprintln!("FILE ERROR. {}", e);
				}
			}
			other => eprintln!("COMMAND LINE ERROR. Unknown command '{}'.", other),
		}
		io::stdout().flush()?;
	}
	Ok(())
}

fn cmd_setconfig(config: &mut Config, path: &Path, params: &[String]) -> Result<(), CoreError> {
	if params.is_empty() {
		return Err(CoreError::InvalidArgument("expected an option name".into()));
	}
	config.set_option(&params[0], params.get(1).map(|s| s.as_str()))?;
	config.save(path)
}

pub fn cmd_run(params: &[String]) -> Result<(), CoreError> {
	let mut verbosity = Verbosity::default();
	let mut scenario_path: Option<&str> = None;
	for p in params {
		match p.as_str() {
			"-r" => verbosity = Verbosity::Raw,
			"-d" => verbosity = Verbosity::Plain,
			"-m" => verbosity = Verbosity::Markdown,
			other => scenario_path = Some(other),
		}
	}
	let scenario_path = scenario_path.ok_or_else(|| CoreError::InvalidArgument("expected a scenario file name".into()))?;
	run_scenario_file(scenario_path, verbosity)
}

pub fn run_scenario_file(scenario_path: &str, verbosity: Verbosity) -> Result<(), CoreError> {
	let text = std::fs::read_to_string(scenario_path).map_err(|_| CoreError::FileDoesNotExist(PathBuf::from(scenario_path)))?;
	let blocks = scenario::parse(&text)?;

	if let Some(h) = header(verbosity) {
		println!("{}", h);
	}
	for block in blocks {
		let mut graph = load_graph_by_extension(&block.graph_path)?;
		for run in block.runs {
			let mut emulator = graph.new_emulator();
			let outcome = emulator.run_saturation(run.start_vertex, run.epsilon, run.time_delta, run.use_skip_forward, wanders_cli::Concurrency::Sequential);
			let outcome_ref = match &outcome {
				Ok(t) => Ok(*t),
				Err(e) => Err(e),
			};
			let row = ReportRow { graph_path: &block.graph_path, run, outcome: outcome_ref };
			println!("{}", render_row(verbosity, &row));
		}
	}
	Ok(())
}

fn load_graph_by_extension(path: &str) -> Result<MetricGraph, CoreError> {
	if path.ends_with(".gexf") {
		MetricGraph::load_from_gexf(path)
	} else {
		MetricGraph::load_from_binary(path)
	}
}

#[derive(Clone, Copy)]
pub enum Direction {
	BinaryToGexf,
	GexfToBinary,
}

/// Loads `input` per `direction`'s source format and saves it back out
/// in the other format at `output` (or, with none given, `input` with
/// its extension swapped), returning the path actually written.
/// Shared by the shell's `rweg2gexf`/`gexf2rweg` commands and the
/// matching top-level subcommands in `main.rs`.
pub fn convert(input: &str, output: Option<&str>, direction: Direction) -> Result<PathBuf, CoreError> {
	let graph = match direction {
		Direction::BinaryToGexf => MetricGraph::load_from_binary(input)?,
		Direction::GexfToBinary => MetricGraph::load_from_gexf(input)?,
	};
	let default_output = match direction {
		Direction::BinaryToGexf => replace_extension(input, "gexf"),
		Direction::GexfToBinary => replace_extension(input, "rweg"),
	};
	let output = output.map(str::to_string).unwrap_or(default_output);
	match direction {
		Direction::BinaryToGexf => graph.save_to_gexf(&output, false),
		Direction::GexfToBinary => graph.save_to_binary(&output, false),
	}
}

fn cmd_convert(params: &[String], direction: Direction) -> Result<(), CoreError> {
	if params.is_empty() {
		return Err(CoreError::InvalidArgument("expected an input file name".into()));
	}
	let written = convert(&params[0], params.get(1).map(|s| s.as_str()), direction)?;
	println!("wrote {}", written.display());
	Ok(())
}

fn replace_extension(path: &str, ext: &str) -> String {
	let p = Path::new(path);
	let stem = p.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string());
	let parent = p.parent().filter(|p| !p.as_os_str().is_empty());
	match parent {
		Some(dir) => dir.join(format!("{}.{}", stem, ext)).to_string_lossy().into_owned(),
		None => format!("{}.{}", stem, ext),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn tokenize_splits_on_whitespace() {
		assert_eq!(tokenize("run -r scenario.rwes"), vec!["run", "-r", "scenario.rwes"]);
	}

	#[test]
	fn tokenize_keeps_quoted_whitespace() {
		assert_eq!(tokenize(r#"setconfig ewsv "not a number""#), vec!["setconfig", "ewsv", "not a number"]);
	}

	#[test]
	fn replace_extension_preserves_directory() {
		assert_eq!(replace_extension("data/g.rweg", "gexf"), "data/g.gexf");
		assert_eq!(replace_extension("g.rweg", "gexf"), "g.gexf");
	}
}
