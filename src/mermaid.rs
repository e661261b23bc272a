//! Export a pipeline graph to a Mermaid flowchart string.
//!
//! Rendering collaborators (documentation, debugging views) call
//! [`render`] and feed the result to any Mermaid renderer. Components become
//! labelled nodes, pipes become edges annotated `source_slot:sink_slot`.

use crate::graph::PipelineGraph;
use std::fmt::Write;

/// Converts a graph to a Mermaid `flowchart LR` diagram.
///
/// Nodes are identified by component id and labelled with the kind's palette
/// label. Edge labels carry the occupied slots, so fan-out and fan-in wiring
/// stays readable in the diagram.
///
/// # Example
///
/// ```rust
/// use pipeworks::{mermaid, ComponentKind, PipelineGraph};
///
/// # fn main() -> Result<(), pipeworks::GraphError> {
/// let mut graph = PipelineGraph::new();
/// let source = graph.add_component(ComponentKind::SourceFile);
/// let sink = graph.add_component(ComponentKind::SinkFile);
/// graph.add_pipe(source, sink)?;
///
/// let diagram = mermaid::render(&graph);
/// assert!(diagram.starts_with("flowchart LR"));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn render(graph: &PipelineGraph) -> String {
  let mut out = String::from("flowchart LR\n");
  for component in graph.components() {
    let _ = writeln!(
      out,
      "  {}[\"{}\"]",
      component.id(),
      component.kind().label()
    );
  }
  for pipe in graph.pipes() {
    let _ = writeln!(
      out,
      "  {} -->|{}:{}| {}",
      pipe.source(),
      pipe.source_slot(),
      pipe.sink_slot(),
      pipe.sink()
    );
  }
  out
}
