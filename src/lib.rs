//! # Pipeworks
//!
//! The core of a visual pipe-assembly tool: an editing API over an acyclic
//! graph of byte-stream components, a compiler that turns a graph snapshot
//! into a channel-wired execution plan, and a runner that executes the plan
//! as concurrent tokio tasks with first-failure cancellation.
//!
//! ## Model
//!
//! - **Components** are typed nodes with fixed input/output arities and a
//!   transformation contract (read a file, filter lines, split lines, sum
//!   two streams, write a file).
//! - **Pipes** are directed edges from an output slot to an input slot,
//!   attached and detached under capacity constraints.
//! - The **[`PipelineGraph`]** owns both in arenas, enforces acyclicity, and
//!   serves the editor's mutation and query calls.
//! - **[`compile`]** walks a graph snapshot in dependency order and binds
//!   one bounded channel per pipe.
//! - **[`run`]** spawns one task per stage and surfaces the first failure
//!   after cancelling the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipeworks::{compile, run, ComponentKind, PipelineGraph};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = PipelineGraph::new();
//! let source = graph.add_component(ComponentKind::SourceFile);
//! let sink = graph.add_component(ComponentKind::SinkFile);
//! graph.set_parameter(source, "path", "input.txt")?;
//! graph.set_parameter(sink, "path", "output.txt")?;
//! graph.add_pipe(source, sink)?;
//!
//! let plan = compile(&graph)?;
//! let summary = run(plan).await?;
//! assert_eq!(summary.stages, 2);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Component kinds, catalog metadata, parameters, and port tables.
pub mod component;
/// Plan generation and channel wiring.
pub mod compile;
/// Error types for graph edits, compilation, and execution.
pub mod error;
/// The arena-owned pipeline graph and its mutation API.
pub mod graph;
/// Mermaid diagram export.
pub mod mermaid;
/// Pipe records and the attach/detach protocol.
pub mod pipe;
/// The concurrent runner and failure propagation.
pub mod run;
/// Serializable graph snapshots for the save/open collaborators.
pub mod snapshot;

mod stage;

pub use component::{Component, ComponentId, ComponentKind, Parameters, PortSide};
pub use compile::{CompileOptions, Plan, compile, compile_with};
pub use error::{CompileError, GraphError, ParamError, RunError, StageError};
pub use graph::PipelineGraph;
pub use pipe::{Pipe, PipeId};
pub use run::{RunSummary, run};
pub use snapshot::{ComponentSnapshot, GraphSnapshot, PipeSnapshot, SnapshotError};

#[cfg(test)]
mod mermaid_test;
#[cfg(test)]
mod snapshot_test;
