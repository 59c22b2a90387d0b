//! Emulator of continuous-time random walks on metric graphs.
//!
//! An [`Emulator`] borrows a [`MetricGraph`] and walks through the
//! lifecycle `ready -> active -> invalid -> dead` described in the
//! design, driving the two-phase saturation search in [`driver`].

mod driver;
mod update;

pub use driver::Concurrency;
pub(crate) use update::{update_edge_state, SpawnRequest, UpdateResult};

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::edge_state::EdgeState;
use crate::error::{CoreError, CoreResult};
use crate::metric_graph::{MetricGraph, LIFECYCLE_ACTIVE, LIFECYCLE_DEAD, LIFECYCLE_INVALID, LIFECYCLE_READY};

/// Emulator of random walks on a metric graph, computing the time of
/// the first ε-saturation moment.
pub struct Emulator<'g> {
	graph: &'g MetricGraph,
	lifecycle: Arc<AtomicU8>,
	graph_state: Vec<EdgeState>,
}

impl<'g> Emulator<'g> {
	pub(crate) fn attach(graph: &'g MetricGraph) -> Self {
		let lifecycle = Arc::new(AtomicU8::new(LIFECYCLE_READY));
		graph.register_emulator(lifecycle.clone());
		let state_len = graph.edge_count_arena();
		Emulator { graph, lifecycle, graph_state: vec![EdgeState::new(); state_len] }
	}

	fn state(&self) -> u8 {
		self.lifecycle.load(Ordering::Acquire)
	}

	/// Transfers the emulator back into the `ready` state. A no-op
	/// (never an error) if already `ready`; requires `invalid`
	/// otherwise.
	pub fn reset(&mut self) -> CoreResult<()> {
		match self.state() {
			LIFECYCLE_READY => Ok(()),
			LIFECYCLE_INVALID => {
				self.graph_state = vec![EdgeState::new(); self.graph.edge_count_arena()];
				self.lifecycle.store(LIFECYCLE_READY, Ordering::Release);
				Ok(())
			}
			LIFECYCLE_DEAD => Err(CoreError::LogicFailure("cannot reset a dead emulator".into())),
			_ => Err(CoreError::LogicFailure("cannot reset an active emulator".into())),
		}
	}

	/// Runs the emulation, starting at `start`, until the first
	/// ε-saturation moment or until invalidated.
	pub fn run_saturation(
		&mut self,
		start: u32,
		epsilon: f64,
		time_delta: f64,
		use_skip_forward: bool,
		concurrency: Concurrency,
	) -> CoreResult<f64> {
		match self.state() {
			LIFECYCLE_DEAD => return Err(CoreError::LogicFailure("emulator is dead".into())),
			LIFECYCLE_READY => {}
			_ => return Err(CoreError::LogicFailure("emulator must be in the ready state to run".into())),
		}
		if !self.graph.contains_vertex(start) {
			return Err(CoreError::InvalidArgument(format!("start vertex {} does not exist in the graph", start)));
		}

		self.lifecycle.store(LIFECYCLE_ACTIVE, Ordering::Release);
		log::info!("wander started at vertex {} (epsilon={}, dt={}, skip_forward={})", start, epsilon, time_delta, use_skip_forward);

		let result = driver::run(self.graph, &mut self.graph_state, &self.lifecycle, start, epsilon, time_delta, use_skip_forward, concurrency);

		// normal completion (not externally invalidated mid-run) still
		// transitions to invalid, per the lifecycle table.
		let _ = self.lifecycle.compare_exchange(LIFECYCLE_ACTIVE, LIFECYCLE_INVALID, Ordering::AcqRel, Ordering::Acquire);

		if let Ok(t) = result {
			log::info!("wander reached epsilon-saturation at t={}", t);
		}
		result
	}

	/// Transfers the emulator into the `invalid` state. No effect if
	/// already `dead`.
	pub fn invalidate(&self) {
		loop {
			let cur = self.lifecycle.load(Ordering::Acquire);
			if cur == LIFECYCLE_DEAD {
				return;
			}
			if self
				.lifecycle
				.compare_exchange_weak(cur, LIFECYCLE_INVALID, Ordering::AcqRel, Ordering::Acquire)
				.is_ok()
			{
				return;
			}
		}
	}

	/// Unconditionally transfers the emulator into the `dead` state.
	/// Called by the owning graph on its own destruction.
	pub fn kill(&self) {
		self.lifecycle.store(LIFECYCLE_DEAD, Ordering::Release);
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn reset_on_ready_is_idempotent_noop() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, false).unwrap();
		let mut e = g.new_emulator();
		assert!(e.reset().is_ok());
		assert!(e.reset().is_ok());
	}

	#[test]
	fn run_on_unknown_start_vertex_fails() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, false).unwrap();
		let mut e = g.new_emulator();
		let err = e.run_saturation(99, 0.1, 1e-3, true, Concurrency::Sequential).unwrap_err();
		assert!(matches!(err, CoreError::InvalidArgument(_)));
	}

	#[test]
	fn two_emulators_attach_to_the_same_graph_concurrently() {
		let mut g = MetricGraph::new();
		g.update_edge(0, 1, 1.0, false).unwrap();
		// `new_emulator` takes `&self`: both borrows below are shared and
		// coexist, matching the graph's "weak list of attached emulators".
		let mut first = g.new_emulator();
		let mut second = g.new_emulator();
		assert!(first.reset().is_ok());
		assert!(second.reset().is_ok());
	}
}
