//! # Error Taxonomy
//!
//! Error types for every layer of the pipeline core, from graph edits through
//! compilation to stage execution.
//!
//! ## Overview
//!
//! The taxonomy splits along the lifecycle of a pipeline:
//!
//! - **[`GraphError`]**: structural errors raised by graph mutation (port
//!   capacity, duplicate registration, cycles). All of these are recoverable;
//!   the mutation is rejected and the graph is left exactly as it was.
//! - **[`ParamError`]**: a property edit was rejected (unknown field, invalid
//!   pattern). The previous value stays in place.
//! - **[`CompileError`]**: a graph snapshot could not be turned into an
//!   execution plan, typically because a required port is unconnected.
//! - **[`StageError`]**: a runtime failure inside one running stage (missing
//!   file, malformed input). Never handled by sibling stages.
//! - **[`RunError`]**: the aggregated outcome of a failed run, carrying the
//!   first stage failure observed by the runner.
//!
//! Structural errors are caught at the point of the mutating call. Runtime
//! stage errors propagate up through the runner only; the runner cancels every
//! peer stage before surfacing the failure.

use crate::component::{ComponentId, ComponentKind, PortSide};
use crate::pipe::PipeId;
use std::path::PathBuf;
use thiserror::Error;

/// Structural errors raised by graph mutation operations.
///
/// Every variant is recoverable: the offending edit is rejected and the graph
/// (including both endpoints' port tables) is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
  /// An attach was attempted on a port whose declared arity is already
  /// saturated.
  #[error("no free {side} slot on component {component} ({arity} declared)")]
  PortFull {
    /// The component whose port table is full.
    component: ComponentId,
    /// Which side of the component was attempted.
    side: PortSide,
    /// The declared arity of that side.
    arity: usize,
  },

  /// A detach was attempted for a pipe that is not present on that port.
  ///
  /// Disconnect paths tolerate this and treat it as a no-op; everywhere else
  /// it is surfaced to the caller.
  #[error("pipe {pipe} is not attached to the {side} ports of component {component}")]
  NotAttached {
    /// The component the detach was attempted on.
    component: ComponentId,
    /// Which side of the component was attempted.
    side: PortSide,
    /// The pipe that was not found.
    pipe: PipeId,
  },

  /// A component with this identifier is already registered in the graph.
  #[error("component {0} is already registered")]
  DuplicateComponent(ComponentId),

  /// A component cannot be removed while pipes are still attached to it.
  #[error("component {0} still has pipes attached")]
  ComponentHasPipes(ComponentId),

  /// The requested edge would close a cycle, or the graph already contains
  /// one.
  #[error("pipeline graph contains a cycle")]
  Cycle,

  /// No component with this identifier exists in the graph.
  #[error("unknown component {0}")]
  UnknownComponent(ComponentId),

  /// No pipe with this identifier exists in the graph.
  #[error("unknown pipe {0}")]
  UnknownPipe(PipeId),
}

/// Errors raised by the parameter get/set surface used by property editors.
///
/// A rejected edit leaves the previous parameter value in place.
#[derive(Debug, Error)]
pub enum ParamError {
  /// The component kind does not declare a parameter with this name.
  #[error("component kind {kind} has no parameter named {name:?}")]
  UnknownParameter {
    /// The kind whose schema was consulted.
    kind: ComponentKind,
    /// The unrecognized parameter name.
    name: String,
  },

  /// The supplied filter pattern does not compile.
  #[error("invalid pattern {pattern:?}: {source}")]
  InvalidPattern {
    /// The pattern as supplied by the caller.
    pattern: String,
    /// The underlying compilation error.
    #[source]
    source: regex::Error,
  },

  /// Splitter delimiters must be non-empty.
  #[error("delimiter must not be empty")]
  EmptyDelimiter,

  /// No component with this identifier exists in the graph.
  #[error("unknown component {0}")]
  UnknownComponent(ComponentId),
}

/// Errors raised while turning a graph snapshot into an execution plan.
///
/// Compilation is aborted before any stage starts, so a failed compile has no
/// side effects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
  /// A component is missing a connection on a declared port.
  ///
  /// All of the built-in kinds require every declared port to be wired
  /// before execution.
  #[error("component {component} ({kind}) has no pipe on {side} slot {slot}")]
  IncompletePipeline {
    /// The component with the unconnected port.
    component: ComponentId,
    /// The component's kind.
    kind: ComponentKind,
    /// Which side the unconnected slot is on.
    side: PortSide,
    /// The first unconnected 1-based slot.
    slot: usize,
  },

  /// A structural invariant did not hold when the snapshot was walked.
  ///
  /// The mutation API maintains acyclicity, so this is a defensive check.
  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// A runtime failure inside one running stage.
///
/// Stage errors are never recovered locally; the runner cancels all peer
/// stages and surfaces the first failure as the run's outcome.
#[derive(Debug, Error)]
pub enum StageError {
  /// An I/O operation on the stage's backing resource failed.
  #[error("{}: {}", .path.display(), .source)]
  Io {
    /// The resource the stage was operating on.
    path: PathBuf,
    /// The underlying I/O error.
    #[source]
    source: std::io::Error,
  },

  /// An input line could not be parsed as a number.
  #[error("not a number: {line:?}")]
  Malformed {
    /// The offending line, without its terminator.
    line: String,
  },
}

/// The aggregated outcome of a failed pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
  /// A stage failed; this carries the first failure the runner observed.
  #[error("stage {component} ({kind}) failed: {source}")]
  Stage {
    /// The component whose stage failed.
    component: ComponentId,
    /// The component's kind.
    kind: ComponentKind,
    /// The failure reported by the stage.
    #[source]
    source: StageError,
  },

  /// A stage task panicked instead of returning an error.
  #[error("stage {component} ({kind}) panicked")]
  Panic {
    /// The component whose stage panicked.
    component: ComponentId,
    /// The component's kind.
    kind: ComponentKind,
  },
}
