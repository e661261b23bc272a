//! # Compiler
//!
//! Turns a graph snapshot into an execution plan: an ordered list of stage
//! descriptors with their channel ends already bound.
//!
//! ## Wiring
//!
//! Each pipe becomes a single bounded byte-stream channel with exactly one
//! writer (the source stage, at the pipe's output slot) and exactly one
//! reader (the sink stage, at the pipe's input slot). A fan-out component
//! writes distinct, independently consumable streams per slot; a fan-in
//! component holds one receiver per input slot and consumes them in
//! lock-step. Channel depth bounds how far any stage can run ahead of its
//! downstream ([`CompileOptions::channel_capacity`]).
//!
//! ## Snapshot semantics
//!
//! Compilation borrows the graph immutably and moves the allocated channels
//! into the [`Plan`], which the runner consumes. Topology is therefore fixed
//! for the lifetime of one compiled run; mutating the graph afterwards
//! requires a fresh compile before the next run.

use crate::component::{ComponentId, ComponentKind, Parameters, PortSide};
use crate::error::{CompileError, GraphError};
use crate::graph::PipelineGraph;
use crate::pipe::PipeId;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Options controlling plan generation.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
  /// Bounded depth of each inter-stage channel, in line chunks.
  ///
  /// Depth controls backpressure: a stage writing to a full channel suspends
  /// until its downstream catches up. Clamped to at least 1.
  pub channel_capacity: usize,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      channel_capacity: 64,
    }
  }
}

/// One compiled stage: a component plus its bound channel ends.
///
/// `inputs` holds one receiver per declared input slot and `outputs` one
/// sender per declared output slot, both in slot order.
#[derive(Debug)]
pub(crate) struct StageSpec {
  /// The component this stage executes.
  pub(crate) component: ComponentId,
  /// The component's kind.
  pub(crate) kind: ComponentKind,
  /// The component's parameters, captured at compile time.
  pub(crate) params: Parameters,
  /// Bound inbound channel ends, in input slot order.
  pub(crate) inputs: Vec<mpsc::Receiver<Bytes>>,
  /// Bound outbound channel ends, in output slot order.
  pub(crate) outputs: Vec<mpsc::Sender<Bytes>>,
}

/// A compiled, ready-to-run representation of a graph snapshot.
///
/// Stages are ordered topologically. The plan owns every channel end, so it
/// can only be run once; compile again for the next run.
#[derive(Debug)]
pub struct Plan {
  stages: Vec<StageSpec>,
}

impl Plan {
  /// The number of stages in the plan.
  pub fn stage_count(&self) -> usize {
    self.stages.len()
  }

  /// Iterates the planned stages as `(component, kind)`, in execution
  /// order.
  pub fn stages(&self) -> impl Iterator<Item = (ComponentId, ComponentKind)> + '_ {
    self.stages.iter().map(|s| (s.component, s.kind))
  }

  /// Hands the stage descriptors to the runner.
  pub(crate) fn into_stages(self) -> Vec<StageSpec> {
    self.stages
  }
}

/// Compiles a graph with default options.
///
/// See [`compile_with`].
pub fn compile(graph: &PipelineGraph) -> Result<Plan, CompileError> {
  compile_with(graph, CompileOptions::default())
}

/// Turns a graph snapshot into an execution plan.
///
/// Walks the graph in topological order, allocates one bounded channel per
/// pipe, and binds each channel's ends to the two stages at the pipe's
/// endpoints. Compilation has no side effects; a failed compile starts no
/// stage.
///
/// # Errors
///
/// Returns [`CompileError::IncompletePipeline`] if any component lacks a
/// connected pipe on a declared port; all built-in kinds require every
/// declared port to be wired. A cycle in the graph surfaces as
/// [`CompileError::Graph`], though the mutation API makes that unreachable.
pub fn compile_with(
  graph: &PipelineGraph,
  options: CompileOptions,
) -> Result<Plan, CompileError> {
  let order = graph.topological_order()?;

  // Reject unconnected required ports before allocating anything.
  for id in &order {
    let component = graph
      .component(*id)
      .ok_or(CompileError::Graph(GraphError::UnknownComponent(*id)))?;
    let kind = component.kind();
    if component.input_pipes().len() < kind.input_arity() {
      return Err(CompileError::IncompletePipeline {
        component: *id,
        kind,
        side: PortSide::Input,
        slot: component.input_pipes().len() + 1,
      });
    }
    if component.output_pipes().len() < kind.output_arity() {
      return Err(CompileError::IncompletePipeline {
        component: *id,
        kind,
        side: PortSide::Output,
        slot: component.output_pipes().len() + 1,
      });
    }
  }

  let capacity = options.channel_capacity.max(1);
  let mut senders: HashMap<PipeId, mpsc::Sender<Bytes>> = HashMap::new();
  let mut receivers: HashMap<PipeId, mpsc::Receiver<Bytes>> = HashMap::new();
  for pipe in graph.pipes() {
    let (tx, rx) = mpsc::channel(capacity);
    senders.insert(pipe.id(), tx);
    receivers.insert(pipe.id(), rx);
  }

  let mut stages = Vec::with_capacity(order.len());
  for id in order {
    let component = graph
      .component(id)
      .ok_or(CompileError::Graph(GraphError::UnknownComponent(id)))?;
    let mut inputs = Vec::with_capacity(component.input_pipes().len());
    for pipe_id in component.input_pipes() {
      let rx = receivers
        .remove(pipe_id)
        .ok_or(CompileError::Graph(GraphError::UnknownPipe(*pipe_id)))?;
      inputs.push(rx);
    }
    let mut outputs = Vec::with_capacity(component.output_pipes().len());
    for pipe_id in component.output_pipes() {
      let tx = senders
        .remove(pipe_id)
        .ok_or(CompileError::Graph(GraphError::UnknownPipe(*pipe_id)))?;
      outputs.push(tx);
    }
    stages.push(StageSpec {
      component: id,
      kind: component.kind(),
      params: component.params().clone(),
      inputs,
      outputs,
    });
  }

  debug!(
    stages = stages.len(),
    channel_capacity = capacity,
    "compiled execution plan"
  );
  Ok(Plan { stages })
}
