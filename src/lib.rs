//! Emulator of continuous-time deterministic random walks ("wanders")
//! on metric graphs: library surface consumed by the CLI in
//! `src/main.rs` and by the scenario runner in `src/scenario.rs`.
//!
//! The core is four cooperating pieces: [`metric_graph`] (the graph
//! store), [`edge_state`] (per-edge agent bookkeeping), and
//! [`wander`] (the edge update rule plus the two-phase saturation
//! driver). Everything else in this crate — file-format I/O, the
//! scenario language, persisted CLI config, the shell — is an outer
//! layer that only ever calls through the handful of entry points
//! re-exported here.

pub mod edge_state;
pub mod error;
pub mod io;
pub mod metric_graph;
pub mod scenario;
pub mod wander;

pub use edge_state::{Agent, EdgeState};
pub use error::{CoreError, CoreResult};
pub use metric_graph::{EdgeId, MetricGraph};
pub use wander::{Concurrency, Emulator};
