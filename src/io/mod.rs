//! File-format import/export: GEXF (XML) and the raw binary dump,
//! both merging into the graph rather than replacing it, and sharing
//! the save-path collision-avoidance scheme below.

pub mod binary;
pub mod gexf;

use std::path::{Path, PathBuf};

/// When `rewrite` is false and `path` already exists, finds the first
/// free name obtained by appending ` (1)`, ` (2)`, … before the
/// extension. Returns `path` unchanged otherwise.
pub(crate) fn resolve_save_path(path: &Path, rewrite: bool) -> PathBuf {
	if rewrite || !path.exists() {
		return path.to_path_buf();
	}
	let stem = path.file_stem().unwrap_or_default().to_string_lossy().into_owned();
	let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
	let parent = path.parent().unwrap_or_else(|| Path::new(""));
	let mut n = 1u32;
	loop {
		let candidate_name = match &ext {
			Some(ext) => format!("{} ({}).{}", stem, n, ext),
			None => format!("{} ({})", stem, n),
		};
		let candidate = parent.join(candidate_name);
		if !candidate.exists() {
			return candidate;
		}
		n += 1;
	}
}
