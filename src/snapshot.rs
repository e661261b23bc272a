//! # Graph Snapshots
//!
//! A serializable capture of a graph's structure: components with their kinds
//! and parameter values, and pipes with their endpoints and slots. The
//! save/open collaborators serialize a [`GraphSnapshot`] in whatever format
//! they choose; the core only defines the value and the restore validation.
//!
//! Restoring replays the snapshot through the same connect path the editor
//! uses, so every structural invariant is re-checked: id uniqueness, port
//! capacity, acyclicity, endpoint existence, and slot agreement. A snapshot
//! that was produced by [`PipelineGraph::snapshot`] and not tampered with
//! always restores cleanly.

use crate::component::{Component, ComponentId, ComponentKind, PortSide};
use crate::error::{GraphError, ParamError};
use crate::graph::PipelineGraph;
use crate::pipe::PipeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised while restoring a graph from a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
  /// A structural invariant failed while replaying the snapshot.
  ///
  /// [`GraphError::DuplicateComponent`] surfaces here on a component id
  /// collision.
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// A recorded parameter value was rejected by its kind's validation.
  #[error(transparent)]
  Param(#[from] ParamError),

  /// The same pipe id appears more than once.
  #[error("pipe id {0} appears more than once")]
  DuplicatePipe(u64),

  /// A pipe's recorded slot does not match the slot replay assigned.
  #[error("pipe {pipe} recorded at {side} slot {recorded}, restored at slot {assigned}")]
  SlotMismatch {
    /// The pipe whose slots disagree.
    pipe: u64,
    /// Which side disagrees.
    side: PortSide,
    /// The slot the snapshot records.
    recorded: usize,
    /// The slot replay assigned.
    assigned: usize,
  },
}

/// One component as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
  /// The component's id within the captured graph.
  pub id: u64,
  /// The component's kind.
  pub kind: ComponentKind,
  /// Parameter values by name, in their string forms.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub parameters: BTreeMap<String, String>,
}

/// One pipe as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeSnapshot {
  /// The pipe's id within the captured graph.
  pub id: u64,
  /// The source component's id.
  pub source: u64,
  /// The 1-based output slot on the source.
  pub source_slot: usize,
  /// The sink component's id.
  pub sink: u64,
  /// The 1-based input slot on the sink.
  pub sink_slot: usize,
}

/// A serializable capture of a graph's structure.
///
/// Components and pipes are recorded in insertion order, so restore
/// reproduces the original iteration order and slot assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
  /// Components in insertion order.
  pub components: Vec<ComponentSnapshot>,
  /// Pipes in insertion order.
  pub pipes: Vec<PipeSnapshot>,
}

impl PipelineGraph {
  /// Captures the graph's structure as a serializable snapshot.
  pub fn snapshot(&self) -> GraphSnapshot {
    let components = self
      .components()
      .map(|component| {
        let parameters = component
          .kind()
          .parameter_names()
          .iter()
          .filter_map(|name| {
            component
              .parameter(name)
              .map(|value| (name.to_string(), value))
          })
          .collect();
        ComponentSnapshot {
          id: component.id().0,
          kind: component.kind(),
          parameters,
        }
      })
      .collect();
    let pipes = self
      .pipes()
      .map(|pipe| PipeSnapshot {
        id: pipe.id().0,
        source: pipe.source().0,
        source_slot: pipe.source_slot(),
        sink: pipe.sink().0,
        sink_slot: pipe.sink_slot(),
      })
      .collect();
    GraphSnapshot { components, pipes }
  }

  /// Rebuilds a graph from a snapshot, re-validating every structural
  /// invariant.
  ///
  /// # Errors
  ///
  /// Returns [`SnapshotError`] if the snapshot repeats an id, names a
  /// missing endpoint, overflows a port, closes a cycle, records a slot
  /// replay does not reproduce, or carries a parameter value its kind
  /// rejects.
  pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<PipelineGraph, SnapshotError> {
    let mut graph = PipelineGraph::new();
    for component in &snapshot.components {
      let id = ComponentId(component.id);
      graph.insert_component(Component::new(id, component.kind))?;
      for (name, value) in &component.parameters {
        graph.set_parameter(id, name, value)?;
      }
    }
    for pipe in &snapshot.pipes {
      let id = PipeId(pipe.id);
      if graph.has_pipe(id) {
        return Err(SnapshotError::DuplicatePipe(pipe.id));
      }
      let (source_slot, sink_slot) =
        graph.connect_pipe(id, ComponentId(pipe.source), ComponentId(pipe.sink))?;
      graph.reserve_pipe_id(id);
      if source_slot != pipe.source_slot {
        return Err(SnapshotError::SlotMismatch {
          pipe: pipe.id,
          side: PortSide::Output,
          recorded: pipe.source_slot,
          assigned: source_slot,
        });
      }
      if sink_slot != pipe.sink_slot {
        return Err(SnapshotError::SlotMismatch {
          pipe: pipe.id,
          side: PortSide::Input,
          recorded: pipe.sink_slot,
          assigned: sink_slot,
        });
      }
    }
    debug!(
      components = snapshot.components.len(),
      pipes = snapshot.pipes.len(),
      "graph restored from snapshot"
    );
    Ok(graph)
  }
}
