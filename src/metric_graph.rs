//! The metric graph store: vertices, directed/undirected edges with
//! positive real length, and the lookup/mutation protocol the
//! emulator relies on.
//!
//! Internally this keeps a sorted list of "vertex views", one per
//! vertex that owns at least one adjacency entry, with edges addressed
//! by a stable arena `EdgeId` rather than a raw `(vertex, adjacency)`
//! position so indices stay valid across mutation elsewhere in the
//! graph.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use crate::error::{CoreError, CoreResult};
use crate::wander::Emulator;

/// Stable handle to a stored edge. Valid until the edge it names is
/// replaced or the graph underlying it is dropped; a structural
/// mutation elsewhere in the graph does not renumber existing ids.
pub type EdgeId = usize;

#[derive(Clone, Debug)]
pub(crate) struct EdgeRecord {
	pub source: u32,
	pub target: u32,
	pub length: f64,
	pub directed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AdjEntry {
	neighbor: u32,
	edge: EdgeId,
}

#[derive(Clone, Debug)]
struct VertexView {
	id: u32,
	/// Sorted ascending by `neighbor`.
	adjacency: Vec<AdjEntry>,
}

/// Lifecycle flag shared between a [`MetricGraph`] and the emulators it
/// has spawned, so invalidation is observable cross-thread without a
/// cyclic `Rc`/`Weak` back-reference.
pub(crate) const LIFECYCLE_READY: u8 = 0;
pub(crate) const LIFECYCLE_ACTIVE: u8 = 1;
pub(crate) const LIFECYCLE_INVALID: u8 = 2;
pub(crate) const LIFECYCLE_DEAD: u8 = 3;

/// A finite graph whose edges are identified with real intervals of
/// positive length.
#[derive(Default)]
pub struct MetricGraph {
	views: Vec<VertexView>,
	edges: Vec<EdgeRecord>,
	/// Locked rather than `&mut`-gated: the graph only needs to be
	/// immutable *while an emulator is active*, not while one merely
	/// exists, so attaching an emulator must not require an exclusive
	/// borrow of the whole graph — that would make it impossible to
	/// hold two emulators on the same graph at once.
	emulators: Mutex<Vec<Arc<AtomicU8>>>,
}

impl Drop for MetricGraph {
	fn drop(&mut self) {
		for flag in self.emulators.get_mut().unwrap_or_else(std::sync::PoisonError::into_inner) {
			flag.store(LIFECYCLE_DEAD, AtomicOrdering::SeqCst);
		}
	}
}

impl MetricGraph {
	pub fn new() -> Self {
		Self::default()
	}

	// ---- internal plumbing -------------------------------------------------

	fn find_view(&self, id: u32) -> Result<usize, usize> {
		self.views.binary_search_by(|v| v.id.cmp(&id))
	}

	fn view_adjacency_index(view: &VertexView, neighbor: u32) -> Result<usize, usize> {
		view.adjacency.binary_search_by(|a| a.neighbor.cmp(&neighbor))
	}

	/// Inserts a brand new adjacency entry `owner -> neighbor` backed by
	/// `edge`, creating the owner's view row if it doesn't yet exist.
	fn insert_adjacency(&mut self, owner: u32, neighbor: u32, edge: EdgeId) {
		match self.find_view(owner) {
			Ok(vi) => {
				let idx = Self::view_adjacency_index(&self.views[vi], neighbor)
					.expect_err("adjacency entry already present");
				self.views[vi].adjacency.insert(idx, AdjEntry { neighbor, edge });
			}
			Err(vi) => {
				self.views.insert(
					vi,
					VertexView { id: owner, adjacency: vec![AdjEntry { neighbor, edge }] },
				);
			}
		}
	}

	/// Removes the adjacency entry `owner -> neighbor`, pruning the
	/// owner's view row entirely if it becomes empty — empty-view
	/// vertices are never stored.
	fn remove_adjacency(&mut self, owner: u32, neighbor: u32) {
		if let Ok(vi) = self.find_view(owner) {
			if let Ok(ai) = Self::view_adjacency_index(&self.views[vi], neighbor) {
				self.views[vi].adjacency.remove(ai);
				if self.views[vi].adjacency.is_empty() {
					self.views.remove(vi);
				}
			}
		}
	}

	fn invalidate_emulators(&self) {
		let flags = self.emulators.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
		for flag in flags.iter() {
			flag.store(LIFECYCLE_INVALID, AtomicOrdering::SeqCst);
		}
	}

	pub(crate) fn register_emulator(&self, flag: Arc<AtomicU8>) {
		self.emulators.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(flag);
	}

	pub(crate) fn edge_record(&self, id: EdgeId) -> &EdgeRecord {
		&self.edges[id]
	}

	pub(crate) fn edge_count_arena(&self) -> usize {
		self.edges.len()
	}

	// ---- accessors ----------------------------------------------------------

	/// O(|V| log |V|): binary search over view ids, falling back to a
	/// scan of adjacency lists for vertices that only ever appear as a
	/// directed target or as the larger endpoint of an undirected edge.
	pub fn contains_vertex(&self, vertex: u32) -> bool {
		if self.find_view(vertex).is_ok() {
			return true;
		}
		self.views.iter().any(|v| Self::view_adjacency_index(v, vertex).is_ok())
	}

	/// Sorted union of view ids and all adjacent vertices.
	pub fn vertex_list(&self) -> Vec<u32> {
		let mut vertices: Vec<u32> = Vec::new();
		for view in &self.views {
			vertices.push(view.id);
			for adj in &view.adjacency {
				vertices.push(adj.neighbor);
			}
		}
		vertices.sort_unstable();
		vertices.dedup();
		vertices
	}

	/// Length of the edge connecting `u` and `v`, or `+inf` if absent.
	pub fn edge_length(&self, u: u32, v: u32) -> f64 {
		match self.get_edge(u, v, true, false) {
			Some(id) => self.edges[id].length,
			None => f64::INFINITY,
		}
	}

	/// Edge-lookup protocol:
	/// 1. if `directed`, search for `u -> v` literally; accept an
	///    undirected match too unless `strict`.
	/// 2. otherwise normalise `u < v` and search.
	/// 3. when not `strict` and the directed probe failed, also try the
	///    reverse bucket for an undirected match.
	pub fn get_edge(&self, u: u32, v: u32, directed: bool, strict: bool) -> Option<EdgeId> {
		let (probe_u, probe_v) = if directed { (u, v) } else { (u.min(v), u.max(v)) };
		if let Ok(vi) = self.find_view(probe_u) {
			if let Ok(ai) = Self::view_adjacency_index(&self.views[vi], probe_v) {
				let entry = self.views[vi].adjacency[ai];
				let rec = &self.edges[entry.edge];
				if strict {
					if rec.directed == directed {
						return Some(entry.edge);
					}
				} else {
					return Some(entry.edge);
				}
			}
		}
		if !strict && directed && probe_u > probe_v {
			if let Ok(vi) = self.find_view(probe_v) {
				if let Ok(ai) = Self::view_adjacency_index(&self.views[vi], probe_u) {
					let entry = self.views[vi].adjacency[ai];
					let rec = &self.edges[entry.edge];
					if !rec.directed {
						return Some(entry.edge);
					}
				}
			}
		}
		None
	}

	/// Every edge index `(i, j)` such that an agent at `v` could leave
	/// along that edge: any undirected edge incident to `v`, or any
	/// directed edge with `v` as source.
	pub fn departing_edges(&self, v: u32) -> Vec<EdgeId> {
		let mut out = Vec::new();
		if let Ok(vi) = self.find_view(v) {
			for adj in &self.views[vi].adjacency {
				out.push(adj.edge);
			}
		}
		for view in &self.views {
			if view.id == v {
				continue;
			}
			for adj in &view.adjacency {
				if adj.neighbor == v {
					let rec = &self.edges[adj.edge];
					if !rec.directed {
						out.push(adj.edge);
					}
				}
			}
		}
		out
	}

	/// Given `v` and a departing edge index, the vertex at its other end.
	pub fn edge_other_end(&self, id: EdgeId, v: u32) -> u32 {
		let rec = &self.edges[id];
		if rec.source == v {
			rec.target
		} else {
			rec.source
		}
	}

	pub fn edge_length_of(&self, id: EdgeId) -> f64 {
		self.edges[id].length
	}

	pub fn edge_is_directed(&self, id: EdgeId) -> bool {
		self.edges[id].directed
	}

	pub fn edge_source(&self, id: EdgeId) -> u32 {
		self.edges[id].source
	}

	pub fn edge_target(&self, id: EdgeId) -> u32 {
		self.edges[id].target
	}

	/// Iterate every stored edge as `(id, source, target, length, directed)`.
	pub fn edges(&self) -> impl Iterator<Item = (EdgeId, u32, u32, f64, bool)> + '_ {
		self.edges
			.iter()
			.enumerate()
			.map(|(id, e)| (id, e.source, e.target, e.length, e.directed))
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Human-readable edge list, one edge per line: `u ---> v\tlength` or
	/// `u ---- v\tlength`.
	pub fn output_edge_list(&self, sink: &mut impl std::io::Write) -> std::io::Result<()> {
		for view in &self.views {
			for adj in &view.adjacency {
				let rec = &self.edges[adj.edge];
				let arrow = if rec.directed { "--->" } else { "----" };
				writeln!(sink, "{} {} {}\t{}", view.id, arrow, adj.neighbor, rec.length)?;
			}
		}
		Ok(())
	}

	// ---- mutation -------------------------------------------------------------

	/// Creates or updates an edge per the directed/undirected rewrite
	/// table. Fails with `InvalidArgument` if `length <= 0`, or if
	/// merging two opposing directed edges of unequal length into one
	/// undirected edge is requested — rather than silently picking one
	/// of the two lengths, that case is surfaced as an error.
	pub fn update_edge(&mut self, u: u32, v: u32, length: f64, directed: bool) -> CoreResult<()> {
		if !(length > 0.0) {
			return Err(CoreError::InvalidArgument(format!(
				"edge length must be positive, got {}",
				length
			)));
		}

		let same_dir = self.get_edge(u, v, true, true);
		let opposite_dir = self.get_edge(v, u, true, true);
		let undirected = self.get_edge(u.min(v), u.max(v), false, true);

		match (same_dir, opposite_dir, undirected) {
			(None, None, None) => {
				if directed {
					self.insert_adjacency(u, v, self.edges.len());
					self.edges.push(EdgeRecord { source: u, target: v, length, directed: true });
				} else {
					let (a, b) = (u.min(v), u.max(v));
					self.insert_adjacency(a, b, self.edges.len());
					self.edges.push(EdgeRecord { source: a, target: b, length, directed: false });
				}
			}
			(Some(id), None, None) => {
				// existing u -> v
				self.edges[id].length = length;
				if !directed {
					self.edges[id].directed = false;
				}
			}
			(None, Some(id), None) => {
				// existing v -> u, requested anything at u,v: collapses to undirected
				if directed {
					let existing_len = self.edges[id].length;
					if existing_len != length {
						return Err(CoreError::InvalidArgument(format!(
							"cannot merge opposing directed edges {u}->{v} and {v}->{u} of different lengths ({length} vs {existing_len})"
						)));
					}
				}
				self.remove_adjacency(v, u);
				let (a, b) = (u.min(v), u.max(v));
				self.edges[id] = EdgeRecord { source: a, target: b, length, directed: false };
				self.insert_adjacency(a, b, id);
			}
			(None, None, Some(id)) => {
				// existing undirected edge: direction stays undirected regardless of request
				self.edges[id].length = length;
			}
			_ => unreachable!("an endpoint pair cannot simultaneously host more than one stored edge"),
		}

		self.invalidate_emulators();
		Ok(())
	}

	// ---- emulator lifecycle ----------------------------------------------------

	/// Attaches a fresh [`Emulator`] to this graph, in the `ready` state.
	/// Takes `&self`, not `&mut self`: nothing about attaching mutates
	/// graph topology, and any number of emulators may be attached to
	/// one graph concurrently — only a structural `update_edge` (which
	/// does take `&mut self`) needs exclusivity.
	pub fn new_emulator(&self) -> Emulator<'_> {
		Emulator::attach(self)
	}

	pub fn load_from_gexf(path: impl AsRef<std::path::Path>) -> CoreResult<Self> {
		crate::io::gexf::load(path.as_ref())
	}

	/// Loads `path` and merges every edge it describes into `self` via
	/// `update_edge`, leaving pre-existing content in place (add/update,
	/// not replace).
	pub fn merge_from_gexf(&mut self, path: impl AsRef<std::path::Path>) -> CoreResult<()> {
		crate::io::gexf::merge(self, path.as_ref())
	}

	pub fn save_to_gexf(&self, path: impl AsRef<std::path::Path>, rewrite: bool) -> CoreResult<std::path::PathBuf> {
		crate::io::gexf::save(self, path.as_ref(), rewrite)
	}

	pub fn load_from_binary(path: impl AsRef<std::path::Path>) -> CoreResult<Self> {
		crate::io::binary::load(path.as_ref())
	}

	/// As [`Self::merge_from_gexf`], for the binary dump format.
	pub fn merge_from_binary(&mut self, path: impl AsRef<std::path::Path>) -> CoreResult<()> {
		crate::io::binary::merge(self, path.as_ref())
	}

	pub fn save_to_binary(&self, path: impl AsRef<std::path::Path>, rewrite: bool) -> CoreResult<std::path::PathBuf> {
		crate::io::binary::save(self, path.as_ref(), rewrite)
	}
}

impl PartialEq for VertexView {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}
impl Eq for VertexView {}
impl PartialOrd for VertexView {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.id.cmp(&other.id))
	}
}
impl Ord for VertexView {
	fn cmp(&self, other: &Self) -> Ordering {
		self.id.cmp(&other.id)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn insert_directed_then_query() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, true).unwrap();
		assert!(g.contains_vertex(0));
		assert!(g.contains_vertex(1));
		assert_eq!(g.edge_length(0, 1), 1.0);
		assert_eq!(g.get_edge(1, 0, true, true), None);
		assert_eq!(g.departing_edges(1).len(), 0);
		assert_eq!(g.departing_edges(0).len(), 1);
	}

	#[test]
	fn undirected_canonical_form() {
		let mut g = MetricGraph::new();
		g.update_edge(5, 2, 3.0, false).unwrap();
		// canonical storage is under min(2,5) = 2
		assert!(g.contains_vertex(5));
		assert_eq!(g.edge_length(5, 2), 3.0);
		assert_eq!(g.edge_length(2, 5), 3.0);
		assert_eq!(g.departing_edges(2).len(), 1);
		assert_eq!(g.departing_edges(5).len(), 1);
	}

	#[test]
	fn opposing_directed_edges_collapse() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 2.0, true).unwrap();
		g.update_edge(1, 0, 2.0, true).unwrap();
		let id = g.get_edge(0, 1, false, true).expect("should be undirected now");
		assert!(!g.edge_is_directed(id));
		assert_eq!(g.edge_length_of(id), 2.0);
		assert_eq!(g.edge_count(), 1);
	}

	#[test]
	fn opposing_directed_edges_of_different_length_rejected() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 2.0, true).unwrap();
		let err = g.update_edge(1, 0, 3.0, true).unwrap_err();
		assert!(matches!(err, CoreError::InvalidArgument(_)));
	}

	#[test]
	fn non_positive_length_rejected() {
		let mut g = MetricGraph::new();
		assert!(matches!(g.update_edge(0, 1, 0.0, true), Err(CoreError::InvalidArgument(_))));
		assert!(matches!(g.update_edge(0, 1, -1.0, true), Err(CoreError::InvalidArgument(_))));
	}

	#[test]
	fn triangle_vertex_list_sorted() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, false).unwrap();
		g.update_edge(1, 2, 1.0, false).unwrap();
		g.update_edge(0, 2, 1.0, false).unwrap();
		assert_eq!(g.vertex_list(), vec![0, 1, 2]);
	}

	#[test]
	fn removing_adjacency_prunes_empty_view() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, true).unwrap();
		g.update_edge(1, 0, 1.0, true).unwrap();
		// both directions merged into a single undirected edge owned by view 0;
		// view 1 must have been pruned since it no longer has any adjacency of its own
		assert_eq!(g.vertex_list(), vec![0, 1]);
		assert_eq!(g.edge_count(), 1);
	}
}
