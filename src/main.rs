//! Wanders: a CLI front-end for the continuous-time random-walk
//! ε-saturation emulator in `src/lib.rs`.
//!
//! `clap`'s builder API (`App`/`Arg`/`SubCommand`) exposes the
//! library's graph loading, conversion, and scenario-running
//! operations as real subcommands; invoking the binary with no
//! subcommand drops into the interactive shell instead.

use clap::{crate_version, App, AppSettings, Arg, SubCommand};

mod config;
mod report;
mod shell;

fn main() {
	env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));

	let matches = App::new("wanders")
		.version(crate_version!())
		.about("Emulator of continuous-time random walks on metric graphs")
		.setting(AppSettings::SubcommandsNegateReqs)
		.subcommand(
			SubCommand::with_name("run")
				.about("Runs every epsilon-saturation block in a scenario file")
				.arg(Arg::with_name("raw").short("r").help("raw, CSV-ish report layout").conflicts_with_all(&["plain", "markdown"]))
				.arg(Arg::with_name("plain").short("d").help("plain text report layout (default)").conflicts_with("markdown"))
				.arg(Arg::with_name("markdown").short("m").help("Markdown table report layout"))
				.arg(Arg::with_name("scenario").required(true).index(1).help("scenario file to run")),
		)
		.subcommand(
			SubCommand::with_name("rweg2gexf")
				.about("Converts a binary .rweg graph dump to GEXF")
				.arg(Arg::with_name("input").required(true).index(1))
				.arg(Arg::with_name("output").index(2)),
		)
		.subcommand(
			SubCommand::with_name("gexf2rweg")
				.about("Converts a GEXF graph file to the binary .rweg dump")
				.arg(Arg::with_name("input").required(true).index(1))
				.arg(Arg::with_name("output").index(2)),
		)
		.subcommand(SubCommand::with_name("getconfig").about("Prints the persisted CLI defaults"))
		.subcommand(
			SubCommand::with_name("setconfig")
				.about("Sets (or, with no value, resets) a persisted CLI default")
				.arg(Arg::with_name("option").required(true).index(1))
				.arg(Arg::with_name("value").index(2)),
		)
		.get_matches();

	let outcome = if let Some(m) = matches.subcommand_matches("run") {
		let verbosity = if m.is_present("raw") {
			report::Verbosity::Raw
		} else if m.is_present("markdown") {
			report::Verbosity::Markdown
		} else {
			report::Verbosity::Plain
		};
		shell::run_scenario_file(m.value_of("scenario").unwrap(), verbosity)
	} else if let Some(m) = matches.subcommand_matches("rweg2gexf") {
		shell::convert(m.value_of("input").unwrap(), m.value_of("output"), shell::Direction::BinaryToGexf).map(|p| log::info!("wrote {}", p.display()))
	} else if let Some(m) = matches.subcommand_matches("gexf2rweg") {
		shell::convert(m.value_of("input").unwrap(), m.value_of("output"), shell::Direction::GexfToBinary).map(|p| log::info!("wrote {}", p.display()))
	} else if matches.subcommand_matches("getconfig").is_some() {
		let cfg = config::Config::load_or_create(&std::path::PathBuf::from("wanders.config")).unwrap_or_default();
		print!("{}", cfg.render());
		Ok(())
	} else if let Some(m) = matches.subcommand_matches("setconfig") {
		let path = std::path::PathBuf::from("wanders.config");
		let mut cfg = config::Config::load_or_create(&path).unwrap_or_default();
		cfg.set_option(m.value_of("option").unwrap(), m.value_of("value")).and_then(|_| cfg.save(&path))
	} else {
		shell::run().unwrap_or_else(|e| log::error!("shell I/O error: {}", e));
		Ok(())
	};

	if let Err(e) = outcome {
		eprintln!("error: {}", e);
		std::process::exit(1);
	}
}
