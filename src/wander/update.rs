//! The edge update rule: advances every agent on a single edge by one
//! time step, handling the two collision regimes.
//!
//! Undirected edges reflect a colliding agent back onto the same edge,
//! heading the other way. Directed edges absorb it: the agent is
//! deleted and a spawn request is raised on every edge departing the
//! vertex it struck, so the driver can seed a fresh agent there after
//! the barrier.

use crate::edge_state::EdgeState;
use crate::metric_graph::{EdgeId, MetricGraph};

/// A request to place a fresh agent at the head of another edge,
/// raised when a directed edge absorbs an agent at its target vertex.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnRequest {
	pub target_edge: EdgeId,
	pub init_position: f64,
	pub init_direction: bool,
}

#[derive(Debug, Default)]
pub(crate) struct UpdateResult {
	pub collision_occurred: bool,
	pub spawns: Vec<SpawnRequest>,
}

/// Advances every agent on `edge_id` by `dt`, reflecting or absorbing
/// those that cross an endpoint, and recomputes `state.is_saturated`.
///
/// Pure with respect to `graph`: reads its topology only, never
/// mutates it. Touches only `state`, the caller's edge-local slice —
/// this is what lets the driver fan `update_edge_state` out across a
/// worker pool, one call per edge, with no aliasing between calls.
pub(crate) fn update_edge_state(graph: &MetricGraph, edge_id: EdgeId, state: &mut EdgeState, epsilon: f64, dt: f64) -> UpdateResult {
	let length = graph.edge_length_of(edge_id);
	let directed = graph.edge_is_directed(edge_id);
	let source = graph.edge_source(edge_id);
	let target = graph.edge_target(edge_id);

	let mut result = UpdateResult::default();
	let mut i = 0usize;
	while i < state.agents.len() {
		state.agents[i].position += if state.agents[i].direction { dt } else { -dt };
		let position = state.agents[i].position;

		let mut removed = false;
		if position <= 0.0 || position >= length {
			let hit_is_source = position <= 0.0;
			let hit_vertex = if hit_is_source { source } else { target };
			// overshoot past the endpoint, folded back into [0, length) — a
			// single collision event even if dt overshot by more than length.
			let delta = if hit_is_source { (-position).rem_euclid(length) } else { (position - length).rem_euclid(length) };
			result.collision_occurred = true;

			for dep in graph.departing_edges(hit_vertex) {
				if dep == edge_id {
					continue;
				}
				let forward = graph.edge_source(dep) == hit_vertex;
				// `delta` is measured from the hit vertex; convert to the
				// departing edge's own [0, L] coordinate, which starts at
				// its source, not necessarily at the hit vertex.
				let init_position = if forward { delta } else { graph.edge_length_of(dep) - delta };
				result.spawns.push(SpawnRequest { target_edge: dep, init_position, init_direction: forward });
			}

			if directed {
				state.agents.remove(i);
				removed = true;
			} else {
				state.agents[i].position = if hit_is_source { delta } else { length - delta };
				state.agents[i].direction = !state.agents[i].direction;
			}
		}

		if !removed {
			// one step moves an agent past at most its immediate neighbour;
			// a single swap-down restores the sort invariant in O(1).
			let mut j = i;
			while j > 0 && state.agents[j].position < state.agents[j - 1].position {
				state.agents.swap(j, j - 1);
				j -= 1;
			}
			i += 1;
		}
	}

	state.is_saturated = !state.agents.is_empty()
		&& state.agents[0].position < epsilon
		&& (length - state.agents[state.agents.len() - 1].position) < epsilon
		&& state.agents.windows(2).all(|w| w[1].position - w[0].position < 2.0 * epsilon);

	result
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::metric_graph::MetricGraph;

	fn graph_with_edge(directed: bool) -> (MetricGraph, EdgeId) {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, directed).unwrap();
		let id = g.get_edge(0, 1, directed, true).unwrap();
		(g, id)
	}

	#[test]
	fn undirected_agent_reflects_at_target() {
		let (g, id) = graph_with_edge(false);
		let mut state = EdgeState::new();
		state.insert(0.95, true, 0.0);
		let r = update_edge_state(&g, id, &mut state, 0.1, 0.1);
		assert!(r.collision_occurred);
		assert_eq!(state.agents.len(), 1);
		assert!(!state.agents[0].direction);
		assert!(state.agents[0].position < 1.0);
	}

	#[test]
	fn directed_agent_absorbed_at_target_spawns_nothing_without_outgoing_edges() {
		let (g, id) = graph_with_edge(true);
		let mut state = EdgeState::new();
		state.insert(0.95, true, 0.0);
		let r = update_edge_state(&g, id, &mut state, 0.1, 0.1);
		assert!(r.collision_occurred);
		assert!(state.agents.is_empty());
		assert!(r.spawns.is_empty());
	}

	#[test]
	fn directed_agent_absorbed_spawns_on_outgoing_edges() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, true).unwrap();
		g.update_edge(1, 2, 1.0, true).unwrap();
		let in_edge = g.get_edge(0, 1, true, true).unwrap();
		let out_edge = g.get_edge(1, 2, true, true).unwrap();
		let mut state = EdgeState::new();
		state.insert(0.95, true, 0.0);
		let r = update_edge_state(&g, in_edge, &mut state, 0.1, 0.1);
		assert_eq!(r.spawns.len(), 1);
		assert_eq!(r.spawns[0].target_edge, out_edge);
		assert!(r.spawns[0].init_direction);
	}

	#[test]
	fn saturation_flag_requires_covering_both_endpoints_and_gaps() {
		let (g, id) = graph_with_edge(false);
		let mut state = EdgeState::new();
		state.insert(0.1, true, 0.0);
		state.insert(0.5, true, 0.0);
		state.insert(0.9, false, 0.0);
		let _ = update_edge_state(&g, id, &mut state, 0.3, 0.0);
		assert!(state.is_saturated);
	}

	#[test]
	fn saturation_flag_false_when_gap_too_wide() {
		let (g, id) = graph_with_edge(false);
		let mut state = EdgeState::new();
		state.insert(0.05, true, 0.0);
		state.insert(0.95, false, 0.0);
		let _ = update_edge_state(&g, id, &mut state, 0.1, 0.0);
		assert!(!state.is_saturated);
	}
}
