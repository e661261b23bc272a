//! # Pipes
//!
//! A pipe is a directed edge from one output slot of a source component to
//! one input slot of a sink component. It is a relationship record, not a
//! data carrier: at run time the compiler turns each pipe into a single
//! byte-stream channel with exactly one writer and one reader.
//!
//! The pipe owns the attach/detach protocol between its two endpoints.
//! [`Pipe::connect`] is all-or-nothing: if the sink attach fails after the
//! source attach succeeded, the source attach is rolled back before the
//! capacity error is re-raised. [`Pipe::disconnect`] is idempotent and
//! tolerates either endpoint already being detached.

use crate::component::{Component, ComponentId};
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a pipe within one [`PipelineGraph`].
///
/// [`PipelineGraph`]: crate::graph::PipelineGraph
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PipeId(pub(crate) u64);

impl fmt::Display for PipeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "p{}", self.0)
  }
}

/// A directed edge between an output slot and an input slot.
///
/// The pipe stores the identifiers of its endpoints rather than owning them;
/// the graph owns all components and pipes in arenas keyed by stable ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipe {
  /// This pipe's identity within its graph.
  id: PipeId,
  /// The component whose output side this pipe leaves from.
  source: ComponentId,
  /// The 1-based output slot occupied on the source.
  source_slot: usize,
  /// The component whose input side this pipe arrives at.
  sink: ComponentId,
  /// The 1-based input slot occupied on the sink.
  sink_slot: usize,
}

impl Pipe {
  /// Attaches a new pipe to both endpoints and records the assigned slots.
  ///
  /// The source's output side is attached first. If the sink's input side is
  /// saturated, the source attach is rolled back so a failed connect leaves
  /// both port tables exactly as they were.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::PortFull`] from whichever endpoint lacked
  /// capacity.
  pub(crate) fn connect(
    id: PipeId,
    source: &mut Component,
    sink: &mut Component,
  ) -> Result<Self, GraphError> {
    let source_slot = source.attach_output(id)?;
    let sink_slot = match sink.attach_input(id) {
      Ok(slot) => slot,
      Err(err) => {
        // roll back so the caller sees an untouched source port table
        let _ = source.detach_output(id);
        return Err(err);
      }
    };
    Ok(Self {
      id,
      source: source.id(),
      source_slot,
      sink: sink.id(),
      sink_slot,
    })
  }

  /// Detaches this pipe from both endpoints.
  ///
  /// Either side already being absent is tolerated, so rollback paths can
  /// disconnect defensively without tracking which attaches succeeded.
  pub(crate) fn disconnect(&self, source: &mut Component, sink: &mut Component) {
    let _ = source.detach_output(self.id);
    let _ = sink.detach_input(self.id);
  }

  /// Returns this pipe's identifier.
  pub fn id(&self) -> PipeId {
    self.id
  }

  /// The component this pipe leaves from.
  pub fn source(&self) -> ComponentId {
    self.source
  }

  /// The 1-based output slot occupied on the source component.
  pub fn source_slot(&self) -> usize {
    self.source_slot
  }

  /// The component this pipe arrives at.
  pub fn sink(&self) -> ComponentId {
    self.sink
  }

  /// The 1-based input slot occupied on the sink component.
  pub fn sink_slot(&self) -> usize {
    self.sink_slot
  }

  /// Re-records the source slot after a sibling pipe was detached.
  pub(crate) fn set_source_slot(&mut self, slot: usize) {
    self.source_slot = slot;
  }

  /// Re-records the sink slot after a sibling pipe was detached.
  pub(crate) fn set_sink_slot(&mut self, slot: usize) {
    self.sink_slot = slot;
  }
}
