//! The `.rweg`-style binary dump: a flat stream of fixed-width records
//! `(u32 source_le, u32 target_le, f64 length_le, u8 directed)`, no
//! header, no checksum, no version — a debug/development format only.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::metric_graph::MetricGraph;

const RECORD_LEN: usize = 4 + 4 + 8 + 1;

fn open_for_read(path: &Path) -> CoreResult<BufReader<File>> {
	File::open(path).map(BufReader::new).map_err(|_| CoreError::FileDoesNotExist(path.to_path_buf()))
}

/// Parses every record in `path` and merges each into a fresh graph
/// via `update_edge`.
pub(crate) fn load(path: &Path) -> CoreResult<MetricGraph> {
	let mut graph = MetricGraph::new();
	merge(&mut graph, path)?;
	Ok(graph)
}

/// Parses every record in `path` and merges each into `graph` via
/// `update_edge`, leaving any pre-existing content in place.
pub(crate) fn merge(graph: &mut MetricGraph, path: &Path) -> CoreResult<()> {
	let mut reader = open_for_read(path)?;
	let mut buf = [0u8; RECORD_LEN];
	loop {
		match reader.read_exact(&mut buf) {
			Ok(()) => {}
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
			Err(e) => return Err(CoreError::WrongFileFormat(format!("binary dump read error: {}", e))),
		}
		let source = u32::from_le_bytes(buf[0..4].try_into().unwrap());
		let target = u32::from_le_bytes(buf[4..8].try_into().unwrap());
		let length = f64::from_le_bytes(buf[8..16].try_into().unwrap());
		let directed = buf[16] != 0;
		graph.update_edge(source, target, length, directed)?;
	}
	Ok(())
}

pub(crate) fn save(graph: &MetricGraph, path: &Path, rewrite: bool) -> CoreResult<std::path::PathBuf> {
	let path = super::resolve_save_path(path, rewrite);
	let file = File::create(&path).map_err(|_| CoreError::FileDoesNotExist(path.clone()))?;
	let mut writer = BufWriter::new(file);
	for (_, source, target, length, directed) in graph.edges() {
		writer.write_all(&source.to_le_bytes()).map_err(|e| CoreError::WrongFileFormat(e.to_string()))?;
		writer.write_all(&target.to_le_bytes()).map_err(|e| CoreError::WrongFileFormat(e.to_string()))?;
		writer.write_all(&length.to_le_bytes()).map_err(|e| CoreError::WrongFileFormat(e.to_string()))?;
		writer.write_all(&[directed as u8]).map_err(|e| CoreError::WrongFileFormat(e.to_string()))?;
	}
	writer.flush().map_err(|e| CoreError::WrongFileFormat(e.to_string()))?;
	Ok(path)
}

#[cfg(test)]
mod test {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn round_trips_edges() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("g.rweg");

		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.5, true).unwrap();
		g.update_edge(1, 2, 2.0, false).unwrap();
		save(&g, &path, true).unwrap();

		let loaded = load(&path).unwrap();
		assert_eq!(loaded.edge_count(), 2);
		assert_eq!(loaded.edge_length(0, 1), 1.5);
		assert_eq!(loaded.edge_length(1, 2), 2.0);
	}

	#[test]
	fn missing_file_is_file_does_not_exist() {
		let err = load(Path::new("/nonexistent/path/to/nowhere.rweg")).unwrap_err();
		assert!(matches!(err, CoreError::FileDoesNotExist(_)));
	}

	#[test]
	fn save_path_collision_appends_counter() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("g.rweg");
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, false).unwrap();
		let first = save(&g, &path, true).unwrap();
		let second = save(&g, &path, false).unwrap();
		assert_ne!(first, second);
		assert!(second.file_name().unwrap().to_string_lossy().contains("(1)"));
	}
}
