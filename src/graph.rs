//! # Pipeline Graph
//!
//! The [`PipelineGraph`] is the acyclic set of components and pipes being
//! edited. It owns all components and pipes in arenas keyed by stable
//! identifiers, enforces the structural invariants, and offers the mutation
//! and query operations consumed by the editor.
//!
//! ## Invariants
//!
//! - The directed graph formed by pipes over components contains no cycle.
//!   [`PipelineGraph::add_pipe`] checks reachability from the sink back to
//!   the source before committing, so a rejected edge leaves the graph
//!   unchanged.
//! - A pipe may only be added between an output slot with remaining capacity
//!   and an input slot with remaining capacity; a failed attach rolls back
//!   whichever side already succeeded.
//! - Removing a component requires first removing every pipe touching it.
//!
//! ## Determinism
//!
//! Components iterate in insertion order, and [`topological_order`] breaks
//! ties among unordered components by insertion order. Two edits of the same
//! graph therefore compile to the same stage order.
//!
//! [`topological_order`]: PipelineGraph::topological_order

use crate::component::{Component, ComponentId, ComponentKind};
use crate::error::{GraphError, ParamError};
use crate::pipe::{Pipe, PipeId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The acyclic set of components and pipes being edited.
///
/// The graph is owned by the editing session; it is created empty and
/// mutated by the add/remove operations below. Components and pipes are
/// addressed by the stable ids handed out at creation. Mutation never leaves
/// the graph in an inconsistent state: a rejected operation is a no-op.
///
/// # Example
///
/// ```rust
/// use pipeworks::{ComponentKind, PipelineGraph};
///
/// # fn main() -> Result<(), pipeworks::GraphError> {
/// let mut graph = PipelineGraph::new();
/// let source = graph.add_component(ComponentKind::SourceFile);
/// let sink = graph.add_component(ComponentKind::SinkFile);
/// let pipe = graph.add_pipe(source, sink)?;
///
/// assert_eq!(graph.pipe(pipe).map(|p| p.source_slot()), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PipelineGraph {
  /// Component arena keyed by id.
  components: HashMap<ComponentId, Component>,
  /// Component ids in insertion order.
  component_order: Vec<ComponentId>,
  /// Pipe arena keyed by id.
  pipes: HashMap<PipeId, Pipe>,
  /// Pipe ids in insertion order.
  pipe_order: Vec<PipeId>,
  /// Next component id to hand out. Never reused.
  next_component_id: u64,
  /// Next pipe id to hand out. Never reused.
  next_pipe_id: u64,
}

impl PipelineGraph {
  /// Creates an empty graph.
  pub fn new() -> Self {
    Self::default()
  }

  /// Places a new component of `kind` on the graph.
  ///
  /// The component starts with default parameters and empty port tables.
  /// Returns the id the editor uses to address it from then on.
  pub fn add_component(&mut self, kind: ComponentKind) -> ComponentId {
    let id = ComponentId(self.next_component_id);
    self.next_component_id += 1;
    self.component_order.push(id);
    self.components.insert(id, Component::new(id, kind));
    debug!(component = %id, kind = %kind, "component added");
    id
  }

  /// Registers a component carrying its own id, as when restoring a
  /// snapshot.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::DuplicateComponent`] if a component with the same
  /// id is already registered.
  pub(crate) fn insert_component(&mut self, component: Component) -> Result<(), GraphError> {
    let id = component.id();
    if self.components.contains_key(&id) {
      return Err(GraphError::DuplicateComponent(id));
    }
    self.next_component_id = self.next_component_id.max(id.0 + 1);
    self.component_order.push(id);
    self.components.insert(id, component);
    Ok(())
  }

  /// Removes a component from the graph.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::UnknownComponent`] if `id` is not registered, and
  /// [`GraphError::ComponentHasPipes`] while any pipe is still attached; the
  /// caller must disconnect pipes first.
  pub fn remove_component(&mut self, id: ComponentId) -> Result<(), GraphError> {
    let component = self
      .components
      .get(&id)
      .ok_or(GraphError::UnknownComponent(id))?;
    if !component.input_pipes().is_empty() || !component.output_pipes().is_empty() {
      return Err(GraphError::ComponentHasPipes(id));
    }
    self.components.remove(&id);
    self.component_order.retain(|c| *c != id);
    debug!(component = %id, "component removed");
    Ok(())
  }

  /// Connects an output slot of `source` to an input slot of `sink`.
  ///
  /// Slots are assigned by append order: the pipe lands in the first free
  /// slot on each side, and the assigned slots are readable from the
  /// returned pipe for rendering.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::UnknownComponent`] for an unregistered endpoint,
  /// [`GraphError::PortFull`] when either side lacks capacity (with the
  /// other side rolled back), and [`GraphError::Cycle`] if the edge would
  /// close a cycle; in every case the graph is left unchanged.
  pub fn add_pipe(
    &mut self,
    source: ComponentId,
    sink: ComponentId,
  ) -> Result<PipeId, GraphError> {
    self.add_pipe_hinted(source, None, sink, None)
  }

  /// Connects `source` to `sink`, carrying the editor's slot intent.
  ///
  /// The hints are advisory: slots are still assigned by append order, and a
  /// hint that does not match the assignment is logged and otherwise
  /// ignored. Editors that let the user aim at a specific port pass the
  /// aimed-at slots here.
  ///
  /// # Errors
  ///
  /// Same as [`PipelineGraph::add_pipe`].
  pub fn add_pipe_hinted(
    &mut self,
    source: ComponentId,
    source_slot_hint: Option<usize>,
    sink: ComponentId,
    sink_slot_hint: Option<usize>,
  ) -> Result<PipeId, GraphError> {
    let id = PipeId(self.next_pipe_id);
    let (source_slot, sink_slot) = self.connect_pipe(id, source, sink)?;
    self.next_pipe_id += 1;
    if source_slot_hint.is_some_and(|hint| hint != source_slot) {
      debug!(pipe = %id, hint = source_slot_hint, assigned = source_slot, "source slot hint ignored");
    }
    if sink_slot_hint.is_some_and(|hint| hint != sink_slot) {
      debug!(pipe = %id, hint = sink_slot_hint, assigned = sink_slot, "sink slot hint ignored");
    }
    debug!(
      pipe = %id,
      source = %source,
      source_slot,
      sink = %sink,
      sink_slot,
      "pipe added"
    );
    Ok(id)
  }

  /// Validates and connects a pipe with a caller-chosen id.
  ///
  /// Shared by [`add_pipe_hinted`] and snapshot restore. Returns the
  /// assigned `(source_slot, sink_slot)`.
  ///
  /// [`add_pipe_hinted`]: PipelineGraph::add_pipe_hinted
  pub(crate) fn connect_pipe(
    &mut self,
    id: PipeId,
    source: ComponentId,
    sink: ComponentId,
  ) -> Result<(usize, usize), GraphError> {
    if !self.components.contains_key(&source) {
      return Err(GraphError::UnknownComponent(source));
    }
    if !self.components.contains_key(&sink) {
      return Err(GraphError::UnknownComponent(sink));
    }
    // Reject before touching either port table; a cycle check after a failed
    // attach would have to unwind it.
    if self.reaches(sink, source) {
      debug!(source = %source, sink = %sink, "pipe rejected: would create a cycle");
      return Err(GraphError::Cycle);
    }
    let [Some(source_component), Some(sink_component)] =
      self.components.get_disjoint_mut([&source, &sink])
    else {
      return Err(GraphError::UnknownComponent(source));
    };
    let pipe = Pipe::connect(id, source_component, sink_component)?;
    let slots = (pipe.source_slot(), pipe.sink_slot());
    self.pipes.insert(id, pipe);
    self.pipe_order.push(id);
    Ok(slots)
  }

  /// Disconnects a pipe from both endpoints and removes it from the graph.
  ///
  /// Remaining pipes on either endpoint shift down to keep the port tables
  /// dense; their recorded slots are refreshed to match.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::UnknownPipe`] if `id` is not registered.
  pub fn remove_pipe(&mut self, id: PipeId) -> Result<(), GraphError> {
    let pipe = self
      .pipes
      .get(&id)
      .ok_or(GraphError::UnknownPipe(id))?
      .clone();
    if let [Some(source_component), Some(sink_component)] = self
      .components
      .get_disjoint_mut([&pipe.source(), &pipe.sink()])
    {
      pipe.disconnect(source_component, sink_component);
    }
    self.pipes.remove(&id);
    self.pipe_order.retain(|p| *p != id);
    self.refresh_slots(pipe.source());
    self.refresh_slots(pipe.sink());
    debug!(pipe = %id, "pipe removed");
    Ok(())
  }

  /// Re-records the slots of every pipe attached to `id` from its current
  /// position in the port tables.
  fn refresh_slots(&mut self, id: ComponentId) {
    let Some(component) = self.components.get(&id) else {
      return;
    };
    let inputs: Vec<PipeId> = component.input_pipes().to_vec();
    let outputs: Vec<PipeId> = component.output_pipes().to_vec();
    for (index, pipe_id) in inputs.iter().enumerate() {
      if let Some(pipe) = self.pipes.get_mut(pipe_id) {
        pipe.set_sink_slot(index + 1);
      }
    }
    for (index, pipe_id) in outputs.iter().enumerate() {
      if let Some(pipe) = self.pipes.get_mut(pipe_id) {
        pipe.set_source_slot(index + 1);
      }
    }
  }

  /// True if `to` is reachable from `from` by following pipes forward.
  ///
  /// A component trivially reaches itself.
  fn reaches(&self, from: ComponentId, to: ComponentId) -> bool {
    if from == to {
      return true;
    }
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
      if !visited.insert(id) {
        continue;
      }
      if let Some(component) = self.components.get(&id) {
        for pipe_id in component.output_pipes() {
          if let Some(pipe) = self.pipes.get(pipe_id) {
            if pipe.sink() == to {
              return true;
            }
            stack.push(pipe.sink());
          }
        }
      }
    }
    false
  }

  /// Produces an order in which every component appears after all components
  /// feeding any of its input ports.
  ///
  /// Ties among components with no ordering constraint between them are
  /// broken by insertion order, for determinism.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::Cycle`] if the graph is not acyclic. The
  /// [`add_pipe`] guard makes this unreachable for graphs built through the
  /// mutation API; the check is defensive.
  ///
  /// [`add_pipe`]: PipelineGraph::add_pipe
  pub fn topological_order(&self) -> Result<Vec<ComponentId>, GraphError> {
    let mut indegree: HashMap<ComponentId, usize> = self
      .components
      .iter()
      .map(|(id, component)| (*id, component.input_pipes().len()))
      .collect();
    let mut order = Vec::with_capacity(self.components.len());
    while order.len() < self.components.len() {
      // Scan from the front each round so the earliest-inserted ready
      // component wins ties.
      let ready = self
        .component_order
        .iter()
        .copied()
        .find(|id| indegree.get(id).is_some_and(|degree| *degree == 0));
      let Some(id) = ready else {
        return Err(GraphError::Cycle);
      };
      indegree.remove(&id);
      order.push(id);
      if let Some(component) = self.components.get(&id) {
        for pipe_id in component.output_pipes() {
          if let Some(pipe) = self.pipes.get(pipe_id) {
            if let Some(degree) = indegree.get_mut(&pipe.sink()) {
              *degree -= 1;
            }
          }
        }
      }
    }
    Ok(order)
  }

  /// Looks up a component by id.
  pub fn component(&self, id: ComponentId) -> Option<&Component> {
    self.components.get(&id)
  }

  /// Looks up a pipe by id.
  pub fn pipe(&self, id: PipeId) -> Option<&Pipe> {
    self.pipes.get(&id)
  }

  /// Iterates components in insertion order.
  pub fn components(&self) -> impl Iterator<Item = &Component> {
    self
      .component_order
      .iter()
      .filter_map(|id| self.components.get(id))
  }

  /// Iterates pipes in insertion order.
  pub fn pipes(&self) -> impl Iterator<Item = &Pipe> {
    self.pipe_order.iter().filter_map(|id| self.pipes.get(id))
  }

  /// The number of components on the graph.
  pub fn component_count(&self) -> usize {
    self.components.len()
  }

  /// The number of pipes on the graph.
  pub fn pipe_count(&self) -> usize {
    self.pipes.len()
  }

  /// Reads a component parameter by name, rendered as a string.
  ///
  /// Returns `None` for an unknown component or a name its kind does not
  /// declare.
  pub fn parameter(&self, id: ComponentId, name: &str) -> Option<String> {
    self.components.get(&id).and_then(|c| c.parameter(name))
  }

  /// Sets a component parameter by name from its string form.
  ///
  /// # Errors
  ///
  /// Returns [`ParamError::UnknownComponent`] if `id` is not registered,
  /// otherwise whatever [`Component::set_parameter`] rejects. A rejected
  /// edit leaves the previous value in place.
  pub fn set_parameter(
    &mut self,
    id: ComponentId,
    name: &str,
    value: &str,
  ) -> Result<(), ParamError> {
    let component = self
      .components
      .get_mut(&id)
      .ok_or(ParamError::UnknownComponent(id))?;
    component.set_parameter(name, value)?;
    debug!(component = %id, name, "parameter set");
    Ok(())
  }

  /// Bumps the pipe id counter past `id`, as when restoring a snapshot.
  pub(crate) fn reserve_pipe_id(&mut self, id: PipeId) {
    self.next_pipe_id = self.next_pipe_id.max(id.0 + 1);
  }

  /// True if a pipe with this id is registered.
  pub(crate) fn has_pipe(&self, id: PipeId) -> bool {
    self.pipes.contains_key(&id)
  }
}
