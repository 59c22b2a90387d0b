//! Two-phase ε-saturation search: an optional skip-forward phase that
//! jumps straight to predicted collision times, followed by fixed-step
//! refinement until every edge reports saturated.

use std::collections::BinaryHeap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use noisy_float::types::{n64, N64};
use rayon::prelude::*;

use crate::edge_state::EdgeState;
use crate::error::{CoreError, CoreResult};
use crate::metric_graph::{MetricGraph, LIFECYCLE_ACTIVE, LIFECYCLE_INVALID};

use super::update::{update_edge_state, UpdateResult};

/// How the per-step edge updates are dispatched.
///
/// `Sequential` always walks edges on the calling thread; `Pool` asks
/// for a bounded worker pool, but the driver only actually uses it once
/// the current agent population makes the dispatch overhead worth it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Concurrency {
	Sequential,
	Pool,
}

/// Below this total agent count across the graph, per-step dispatch
/// stays sequential even when a pool was requested and is available —
/// the fan-out/collect overhead would dominate.
const PARALLEL_AGENT_THRESHOLD: usize = 20;

/// A worker pool is only offered when the host can spare threads for
/// it beyond three reserved for orchestration and I/O.
const MIN_HARDWARE_THREADS_FOR_POOL: usize = 4;

fn build_pool() -> CoreResult<rayon::ThreadPool> {
	let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
	if hw < MIN_HARDWARE_THREADS_FOR_POOL {
		return Err(CoreError::RuntimeUnsupported(format!(
			"worker-pool concurrency requires at least {} hardware threads, host reports {}",
			MIN_HARDWARE_THREADS_FOR_POOL, hw
		)));
	}
	rayon::ThreadPoolBuilder::new()
		.num_threads(hw - 3)
		.build()
		.map_err(|e| CoreError::RuntimeUnsupported(e.to_string()))
}

/// Runs `update_edge_state` once per edge, in parallel over `pool` when
/// given, sequentially otherwise. Order-preserving: `results[i]`
/// corresponds to `graph_state[i]`.
fn advance_all(graph: &MetricGraph, graph_state: &mut [EdgeState], epsilon: f64, dt: f64, pool: Option<&rayon::ThreadPool>) -> Vec<UpdateResult> {
	let run = |graph_state: &mut [EdgeState]| -> Vec<UpdateResult> {
		graph_state.par_iter_mut().enumerate().map(|(id, state)| update_edge_state(graph, id, state, epsilon, dt)).collect()
	};
	match pool {
		Some(p) => p.install(|| run(graph_state)),
		None => graph_state.iter_mut().enumerate().map(|(id, state)| update_edge_state(graph, id, state, epsilon, dt)).collect(),
	}
}

fn total_agents(graph_state: &[EdgeState]) -> usize {
	graph_state.iter().map(|s| s.len()).sum()
}

fn necessary_saturation_floor_met(graph: &MetricGraph, graph_state: &[EdgeState], epsilon: f64) -> bool {
	graph_state.iter().enumerate().all(|(id, state)| {
		let length = graph.edge_length_of(id);
		let floor = (length / (2.0 * epsilon)).floor() as i64 + 1;
		state.len() as i64 >= floor
	})
}

fn is_cancelled(lifecycle: &Arc<AtomicU8>) -> bool {
	lifecycle.load(Ordering::Acquire) != LIFECYCLE_ACTIVE
}

/// Runs the search from scratch: seeds `graph_state` at `start`, then
/// drives Phase A (if `use_skip_forward`) and Phase B until saturation
/// or external invalidation, returning the runtime reached.
pub(crate) fn run(
	graph: &MetricGraph,
	graph_state: &mut Vec<EdgeState>,
	lifecycle: &Arc<AtomicU8>,
	start: u32,
	epsilon: f64,
	time_delta: f64,
	use_skip_forward: bool,
	concurrency: Concurrency,
) -> CoreResult<f64> {
	let pool = match concurrency {
		Concurrency::Sequential => None,
		Concurrency::Pool => Some(build_pool()?),
	};

	for state in graph_state.iter_mut() {
		*state = EdgeState::new();
	}
	let mut runtime = 0.0f64;
	let mut heap: BinaryHeap<Reverse<N64>> = BinaryHeap::new();
	for edge_id in graph.departing_edges(start) {
		let length = graph.edge_length_of(edge_id);
		let forward = graph.edge_source(edge_id) == start;
		let (position, direction) = if forward { (0.0, true) } else { (length, false) };
		graph_state[edge_id].insert(position, direction, time_delta / 10.0);
		heap.push(Reverse(n64(length)));
		log::trace!("seeded edge {} at position {} direction {}", edge_id, position, direction);
	}
	let mut max_agent_count = total_agents(graph_state);

	let active_pool = |max_agent_count: usize| -> Option<&rayon::ThreadPool> {
		match (&pool, concurrency) {
			(Some(p), Concurrency::Pool) if max_agent_count >= PARALLEL_AGENT_THRESHOLD => Some(p),
			_ => None,
		}
	};

	if use_skip_forward {
		'phase_a: loop {
			if is_cancelled(lifecycle) {
				return Ok(runtime);
			}
			if necessary_saturation_floor_met(graph, graph_state, epsilon) {
				break 'phase_a;
			}
			let t_next = match heap.peek() {
				Some(&Reverse(t)) => t.raw(),
				None => break 'phase_a,
			};
			let dt_step = t_next - runtime;
			let results = advance_all(graph, graph_state, epsilon, dt_step, active_pool(max_agent_count));

			for (edge_id, r) in results.iter().enumerate() {
				if r.collision_occurred {
					heap.push(Reverse(n64(t_next + graph.edge_length_of(edge_id))));
				}
			}
			for r in &results {
				for spawn in &r.spawns {
					let before = graph_state[spawn.target_edge].len();
					graph_state[spawn.target_edge].insert(spawn.init_position, spawn.init_direction, time_delta / 10.0);
					if graph_state[spawn.target_edge].len() > before {
						heap.push(Reverse(n64(t_next + graph.edge_length_of(spawn.target_edge))));
					}
				}
			}
			max_agent_count = max_agent_count.max(total_agents(graph_state));

			// collapse any entries clustered within one time-delta of the
			// event we just consumed, including that event's own entry.
			while let Some(&Reverse(top)) = heap.peek() {
				if (top.raw() - t_next).abs() < time_delta {
					heap.pop();
				} else {
					break;
				}
			}
			runtime = t_next;
		}
	}

	loop {
		if is_cancelled(lifecycle) {
			return Ok(runtime);
		}
		if graph_state.iter().all(|s| s.is_saturated) {
			return Ok(runtime);
		}
		let results = advance_all(graph, graph_state, epsilon, time_delta, active_pool(max_agent_count));
		for r in &results {
			for spawn in &r.spawns {
				graph_state[spawn.target_edge].insert(spawn.init_position, spawn.init_direction, time_delta / 10.0);
			}
		}
		max_agent_count = max_agent_count.max(total_agents(graph_state));
		runtime += time_delta;
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::metric_graph::MetricGraph;
	use std::sync::atomic::AtomicU8;

	fn active_flag() -> Arc<AtomicU8> {
		Arc::new(AtomicU8::new(LIFECYCLE_ACTIVE))
	}

	#[test]
	fn two_vertex_undirected_edge_saturates() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, false).unwrap();
		let mut state = vec![EdgeState::new(); g.edge_count()];
		let flag = active_flag();
		let t = run(&g, &mut state, &flag, 0, 0.1, 1e-3, true, Concurrency::Sequential).unwrap();
		assert!(t.is_finite());
		assert!(state.iter().all(|s| s.is_saturated));
	}

	#[test]
	fn directed_chain_with_no_outgoing_edge_never_saturates_but_is_cancellable() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, true).unwrap();
		let mut state = vec![EdgeState::new(); g.edge_count()];
		let flag = active_flag();
		// invalidate immediately; the driver must observe it and return
		// rather than loop forever chasing an edge that can never saturate.
		flag.store(LIFECYCLE_INVALID, Ordering::SeqCst);
		let t = run(&g, &mut state, &flag, 0, 0.1, 1e-3, true, Concurrency::Sequential).unwrap();
		assert_eq!(t, 0.0);
	}
}
