//! Persisted CLI defaults: a small fixed-layout binary blob, opaque to
//! the core, read/written with the same raw little-endian record
//! approach `io::binary` uses for the `.rweg` graph dump.
//!
//! A single record of default `run_saturation` arguments that
//! `setconfig`/`getconfig` read and update.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use wanders_cli::error::{CoreError, CoreResult};

const RECORD_LEN: usize = 4 + 8 + 8 + 1;

/// Default `run_saturation` arguments used by the CLI when a scenario
/// or `run` invocation doesn't override them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
	pub default_start_vertex: u32,
	pub default_epsilon: f64,
	pub default_time_delta: f64,
	pub default_use_skip_forward: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config { default_start_vertex: 0, default_epsilon: 0.5, default_time_delta: 1e-6, default_use_skip_forward: true }
	}
}

impl Config {
	fn to_bytes(self) -> [u8; RECORD_LEN] {
		let mut buf = [0u8; RECORD_LEN];
		buf[0..4].copy_from_slice(&self.default_start_vertex.to_le_bytes());
		buf[4..12].copy_from_slice(&self.default_epsilon.to_le_bytes());
		buf[12..20].copy_from_slice(&self.default_time_delta.to_le_bytes());
		buf[20] = self.default_use_skip_forward as u8;
		buf
	}

	fn from_bytes(buf: &[u8; RECORD_LEN]) -> Self {
		Config {
			default_start_vertex: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
			default_epsilon: f64::from_le_bytes(buf[4..12].try_into().unwrap()),
			default_time_delta: f64::from_le_bytes(buf[12..20].try_into().unwrap()),
			default_use_skip_forward: buf[20] != 0,
		}
	}

	/// Loads the config stored at `path`, failing with
	/// `FileDoesNotExist` if it is absent. Use [`Config::load_or_create`]
	/// for the CLI's "create on first run" behaviour.
	pub fn load(path: &Path) -> CoreResult<Self> {
		let mut file = File::open(path).map_err(|_| CoreError::FileDoesNotExist(path.to_path_buf()))?;
		let mut buf = [0u8; RECORD_LEN];
		file.read_exact(&mut buf).map_err(|e| CoreError::WrongFileFormat(format!("config file '{}' is malformed: {}", path.display(), e)))?;
		Ok(Self::from_bytes(&buf))
	}

	/// Loads `path`, creating it with compiled-in defaults if it
	/// doesn't yet exist — the technical-files bootstrap the reference
	/// implementation's `init()` performs on first run.
	pub fn load_or_create(path: &Path) -> CoreResult<Self> {
		match Self::load(path) {
			Ok(cfg) => Ok(cfg),
			Err(CoreError::FileDoesNotExist(_)) => {
				let cfg = Config::default();
				cfg.save(path)?;
				Ok(cfg)
			}
			Err(e) => Err(e),
		}
	}

	pub fn save(self, path: &Path) -> CoreResult<()> {
		let mut file = File::create(path).map_err(|_| CoreError::FileDoesNotExist(path.to_path_buf()))?;
		file.write_all(&self.to_bytes()).map_err(|e| CoreError::WrongFileFormat(e.to_string()))?;
		Ok(())
	}

	/// Applies `setconfig <option> <value>` for one of the short option
	/// names the shell understands (`ewsv`, `ewe`, `ewtd`, `ewsf`),
	/// restoring that option's compiled-in default when `value` is
	/// `None`.
	pub fn set_option(&mut self, option: &str, value: Option<&str>) -> CoreResult<()> {
		let defaults = Config::default();
		match option {
			"ewsv" => {
				self.default_start_vertex = match value {
					Some(v) => v.parse().map_err(|_| CoreError::InvalidArgument(format!("'{}' is not a valid vertex id", v)))?,
					None => defaults.default_start_vertex,
				}
			}
			"ewe" => {
				self.default_epsilon = match value {
					Some(v) => v.parse().map_err(|_| CoreError::InvalidArgument(format!("'{}' is not a valid epsilon", v)))?,
					None => defaults.default_epsilon,
				}
			}
			"ewtd" => {
				self.default_time_delta = match value {
					Some(v) => v.parse().map_err(|_| CoreError::InvalidArgument(format!("'{}' is not a valid time-delta", v)))?,
					None => defaults.default_time_delta,
				}
			}
			"ewsf" => {
				self.default_use_skip_forward = match value {
					Some("true") => true,
					Some("false") => false,
					Some(v) => return Err(CoreError::InvalidArgument(format!("'{}' is not a valid boolean", v))),
					None => defaults.default_use_skip_forward,
				}
			}
			"*" => {
				if value.is_some() {
					return Err(CoreError::InvalidArgument("'*' takes no value: it resets every option to its default".into()));
				}
				*self = defaults;
			}
			other => return Err(CoreError::InvalidArgument(format!("unknown option name '{}'", other))),
		}
		Ok(())
	}

	/// Renders the `getconfig` report: one line per option, short name
	/// in brackets, matching the reference shell's layout.
	pub fn render(&self) -> String {
		format!(
			"=== WANDERS EMULATOR CONFIGURATION ===\n\n\
			 --- Default epsilon-saturation parameters ---\n\
			 \tStart vertex     [ewsv] :\t{}\n\
			 \tEpsilon          [ewe]  :\t{}\n\
			 \tTime delta       [ewtd] :\t{}\n\
			 \tUse skip forward [ewsf] :\t{}\n",
			self.default_start_vertex, self.default_epsilon, self.default_time_delta, self.default_use_skip_forward
		)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn round_trips_through_save_and_load() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("dc");
		let cfg = Config { default_start_vertex: 3, default_epsilon: 0.25, default_time_delta: 1e-4, default_use_skip_forward: false };
		cfg.save(&path).unwrap();
		assert_eq!(Config::load(&path).unwrap(), cfg);
	}

	#[test]
	fn load_or_create_bootstraps_defaults() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("gc");
		let cfg = Config::load_or_create(&path).unwrap();
		assert_eq!(cfg, Config::default());
		// second call reads back the now-persisted file
		assert_eq!(Config::load_or_create(&path).unwrap(), cfg);
	}

	#[test]
	fn set_option_updates_single_field() {
		let mut cfg = Config::default();
		cfg.set_option("ewe", Some("0.2")).unwrap();
		assert_eq!(cfg.default_epsilon, 0.2);
		assert_eq!(cfg.default_start_vertex, Config::default().default_start_vertex);
	}

	#[test]
	fn set_option_star_resets_everything() {
		let mut cfg = Config { default_start_vertex: 9, default_epsilon: 9.0, default_time_delta: 9.0, default_use_skip_forward: false };
		cfg.set_option("*", None).unwrap();
		assert_eq!(cfg, Config::default());
	}

	#[test]
	fn unknown_option_is_invalid_argument() {
		let mut cfg = Config::default();
		assert!(matches!(cfg.set_option("nope", None), Err(CoreError::InvalidArgument(_))));
	}
}
