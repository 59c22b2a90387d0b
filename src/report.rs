//! Tabular reporting for `run` results: the raw/plain/Markdown layouts
//! selected by the CLI's `-r`/`-d`/`-m` verbosity flags.
//!
//! This lives in the CLI layer, not the core library: it only ever
//! consumes `(scenario parameters, saturation time or error)` tuples
//! already produced by `run_saturation`.

use wanders_cli::error::CoreError;
use wanders_cli::scenario::SaturationRun;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
	/// `-r`: one CSV-ish line per run, machine-friendly.
	Raw,
	/// `-d` (default): short human-readable line per run.
	Plain,
	/// `-m`: a Markdown table row per run, for pasting into reports.
	Markdown,
}

impl Default for Verbosity {
	fn default() -> Self {
		Verbosity::Plain
	}
}

pub struct ReportRow<'a> {
	pub graph_path: &'a str,
	pub run: SaturationRun,
	pub outcome: Result<f64, &'a CoreError>,
}

/// Header line for the table formats (`Plain` has none, it reads
/// linearly instead).
pub fn header(verbosity: Verbosity) -> Option<&'static str> {
	match verbosity {
		Verbosity::Raw => Some("graph,start,epsilon,time_delta,skip_forward,saturation_time,error"),
		Verbosity::Markdown => Some("| graph | start | epsilon | time-delta | skip-forward | saturation time | error |\n|---|---|---|---|---|---|---|"),
		Verbosity::Plain => None,
	}
}

pub fn render_row(verbosity: Verbosity, row: &ReportRow<'_>) -> String {
	let (time_str, err_str) = match &row.outcome {
		Ok(t) => (format!("{}", t), String::new()),
		Err(e) => (String::new(), e.to_string()),
	};
	match verbosity {
		Verbosity::Raw => format!(
			"{},{},{},{},{},{},{}",
			row.graph_path, row.run.start_vertex, row.run.epsilon, row.run.time_delta, row.run.use_skip_forward, time_str, err_str
		),
		Verbosity::Markdown => format!(
			"| {} | {} | {} | {} | {} | {} | {} |",
			row.graph_path, row.run.start_vertex, row.run.epsilon, row.run.time_delta, row.run.use_skip_forward, time_str, err_str
		),
		Verbosity::Plain => match &row.outcome {
			Ok(t) => format!(
				"{} start={} eps={} dt={} skip_forward={} -> saturated at t={}",
				row.graph_path, row.run.start_vertex, row.run.epsilon, row.run.time_delta, row.run.use_skip_forward, t
			),
			Err(e) => format!(
				"{} start={} eps={} dt={} skip_forward={} -> error: {}",
				row.graph_path, row.run.start_vertex, row.run.epsilon, row.run.time_delta, row.run.use_skip_forward, e
			),
		},
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use wanders_cli::scenario::SaturationRun;

	fn sample_run() -> SaturationRun {
		SaturationRun { start_vertex: 0, epsilon: 0.5, time_delta: 1e-6, use_skip_forward: true }
	}

	#[test]
	fn raw_row_is_comma_joined() {
		let row = ReportRow { graph_path: "g.gexf", run: sample_run(), outcome: Ok(0.5) };
		let rendered = render_row(Verbosity::Raw, &row);
		assert_eq!(rendered, "g.gexf,0,0.5,0.000001,true,0.5,");
	}

	#[test]
	fn markdown_row_has_pipes() {
		let row = ReportRow { graph_path: "g.gexf", run: sample_run(), outcome: Ok(0.5) };
		let rendered = render_row(Verbosity::Markdown, &row);
		assert!(rendered.starts_with('|') && rendered.ends_with('|'));
	}

	#[test]
	fn plain_row_is_readable_sentence() {
		let row = ReportRow { graph_path: "g.gexf", run: sample_run(), outcome: Ok(0.5) };
		let rendered = render_row(Verbosity::Plain, &row);
		assert!(rendered.contains("saturated at t=0.5"));
	}
}
