//! # Mermaid Export Test Suite

use crate::component::ComponentKind;
use crate::graph::PipelineGraph;
use crate::mermaid;

#[test]
fn test_render_empty_graph() {
  let graph = PipelineGraph::new();
  assert_eq!(mermaid::render(&graph), "flowchart LR\n");
}

#[test]
fn test_render_labels_nodes_and_annotates_slots() {
  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let splitter = graph.add_component(ComponentKind::Splitter);
  let first_sink = graph.add_component(ComponentKind::SinkFile);
  let second_sink = graph.add_component(ComponentKind::SinkFile);
  graph.add_pipe(source, splitter).unwrap();
  graph.add_pipe(splitter, first_sink).unwrap();
  graph.add_pipe(splitter, second_sink).unwrap();

  let diagram = mermaid::render(&graph);
  assert!(diagram.starts_with("flowchart LR\n"));
  assert!(diagram.contains("c0[\"File Input\"]"));
  assert!(diagram.contains("c1[\"Split\"]"));
  assert!(diagram.contains("c0 -->|1:1| c1"));
  // the splitter's two outputs keep their distinct slots
  assert!(diagram.contains("c1 -->|1:1| c2"));
  assert!(diagram.contains("c1 -->|2:1| c3"));
}

#[test]
fn test_render_lists_components_before_pipes() {
  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph.add_pipe(source, sink).unwrap();

  let diagram = mermaid::render(&graph);
  let node_line = diagram.find("c1[\"File Output\"]").unwrap();
  let edge_line = diagram.find("c0 -->").unwrap();
  assert!(node_line < edge_line);
}
