//! End-to-end pipeline scenarios: build a graph through the public API,
//! compile it, run it against real files, and check the bytes that come out.

use pipeworks::{
  compile, compile_with, run, CompileOptions, ComponentKind, PipelineGraph, RunError, StageError,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn write_input(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
  let path = dir.path().join(name);
  std::fs::write(&path, contents).unwrap();
  path
}

fn read_lines(path: &Path) -> Vec<String> {
  String::from_utf8(std::fs::read(path).unwrap())
    .unwrap()
    .lines()
    .map(str::to_string)
    .collect()
}

#[tokio::test]
async fn copies_exact_bytes_from_source_to_sink() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let contents: &[u8] = b"alpha\r\nbeta\ngamma";
  let input = write_input(&dir, "in.txt", contents);
  let output = dir.path().join("out.txt");

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  graph
    .set_parameter(sink, "path", &output.display().to_string())
    .unwrap();
  graph.add_pipe(source, sink).unwrap();

  let summary = run(compile(&graph).unwrap()).await.unwrap();
  assert_eq!(summary.stages, 2);
  assert!(summary.started_at <= summary.finished_at);
  assert_eq!(std::fs::read(&output).unwrap(), contents);
}

#[tokio::test]
async fn filter_keeps_matching_lines_in_order() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let input = write_input(&dir, "in.txt", b"apple\nbanana\navocado\n");
  let output = dir.path().join("out.txt");

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let filter = graph.add_component(ComponentKind::Filter);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  graph.set_parameter(filter, "pattern", "^a").unwrap();
  graph
    .set_parameter(sink, "path", &output.display().to_string())
    .unwrap();
  graph.add_pipe(source, filter).unwrap();
  graph.add_pipe(filter, sink).unwrap();

  run(compile(&graph).unwrap()).await.unwrap();
  assert_eq!(read_lines(&output), vec!["apple", "avocado"]);
}

#[tokio::test]
async fn splitter_routes_halves_to_separate_sinks() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let input = write_input(&dir, "in.txt", b"3,4\n");
  let left_output = dir.path().join("left.txt");
  let right_output = dir.path().join("right.txt");

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let splitter = graph.add_component(ComponentKind::Splitter);
  let left_sink = graph.add_component(ComponentKind::SinkFile);
  let right_sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  graph.set_parameter(splitter, "delimiter", ",").unwrap();
  graph
    .set_parameter(left_sink, "path", &left_output.display().to_string())
    .unwrap();
  graph
    .set_parameter(right_sink, "path", &right_output.display().to_string())
    .unwrap();
  graph.add_pipe(source, splitter).unwrap();
  // the first pipe out of the splitter takes slot 1, the second slot 2
  graph.add_pipe(splitter, left_sink).unwrap();
  graph.add_pipe(splitter, right_sink).unwrap();

  run(compile(&graph).unwrap()).await.unwrap();
  assert_eq!(read_lines(&left_output), vec!["3"]);
  assert_eq!(read_lines(&right_output), vec!["4"]);
}

#[tokio::test]
async fn combiner_sums_paired_lines_in_order() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let first = write_input(&dir, "first.txt", b"1\n2\n3\n");
  let second = write_input(&dir, "second.txt", b"10\n20\n30\n");
  let output = dir.path().join("out.txt");

  let mut graph = PipelineGraph::new();
  let first_source = graph.add_component(ComponentKind::SourceFile);
  let second_source = graph.add_component(ComponentKind::SourceFile);
  let combiner = graph.add_component(ComponentKind::Combiner);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(first_source, "path", &first.display().to_string())
    .unwrap();
  graph
    .set_parameter(second_source, "path", &second.display().to_string())
    .unwrap();
  graph
    .set_parameter(sink, "path", &output.display().to_string())
    .unwrap();
  graph.add_pipe(first_source, combiner).unwrap();
  graph.add_pipe(second_source, combiner).unwrap();
  graph.add_pipe(combiner, sink).unwrap();

  run(compile(&graph).unwrap()).await.unwrap();
  assert_eq!(read_lines(&output), vec!["11", "22", "33"]);
}

#[tokio::test]
async fn splitter_feeding_combiner_rebuilds_sums() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let input = write_input(&dir, "in.txt", b"3,4\n10,20\n100,200\n");
  let output = dir.path().join("out.txt");

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let splitter = graph.add_component(ComponentKind::Splitter);
  let combiner = graph.add_component(ComponentKind::Combiner);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  graph.set_parameter(splitter, "delimiter", ",").unwrap();
  graph
    .set_parameter(sink, "path", &output.display().to_string())
    .unwrap();
  graph.add_pipe(source, splitter).unwrap();
  graph.add_pipe(splitter, combiner).unwrap();
  graph.add_pipe(splitter, combiner).unwrap();
  graph.add_pipe(combiner, sink).unwrap();

  run(compile(&graph).unwrap()).await.unwrap();
  assert_eq!(read_lines(&output), vec!["7", "30", "300"]);
}

#[tokio::test]
async fn backpressure_does_not_deadlock_a_long_stream() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  // far more lines than the channel depth, so every stage has to suspend
  let contents: String = (0..1000).map(|n| format!("{n},{n}\n")).collect();
  let input = write_input(&dir, "in.txt", contents.as_bytes());
  let output = dir.path().join("out.txt");

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let splitter = graph.add_component(ComponentKind::Splitter);
  let combiner = graph.add_component(ComponentKind::Combiner);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  graph
    .set_parameter(sink, "path", &output.display().to_string())
    .unwrap();
  graph.add_pipe(source, splitter).unwrap();
  graph.add_pipe(splitter, combiner).unwrap();
  graph.add_pipe(splitter, combiner).unwrap();
  graph.add_pipe(combiner, sink).unwrap();

  let plan = compile_with(&graph, CompileOptions { channel_capacity: 2 }).unwrap();
  let summary = tokio::time::timeout(Duration::from_secs(30), run(plan))
    .await
    .expect("run must not deadlock")
    .unwrap();
  assert_eq!(summary.stages, 4);
  assert_eq!(read_lines(&output).len(), 1000);
  assert_eq!(read_lines(&output)[2], "4");
}

#[tokio::test]
async fn failing_sink_cancels_the_whole_run() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let contents: String = "line\n".repeat(10_000);
  let input = write_input(&dir, "in.txt", contents.as_bytes());

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let filter = graph.add_component(ComponentKind::Filter);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  // a directory that does not exist, so File::create fails
  graph
    .set_parameter(sink, "path", "/nonexistent/dir/out.txt")
    .unwrap();
  graph.add_pipe(source, filter).unwrap();
  graph.add_pipe(filter, sink).unwrap();

  let plan = compile(&graph).unwrap();
  // every sibling stage must terminate within a bounded time
  let err = tokio::time::timeout(Duration::from_secs(10), run(plan))
    .await
    .expect("run must not hang on a failed stage")
    .unwrap_err();
  match err {
    RunError::Stage {
      component,
      kind,
      source,
    } => {
      assert_eq!(component, sink);
      assert_eq!(kind, ComponentKind::SinkFile);
      assert!(matches!(source, StageError::Io { .. }));
    }
    other => panic!("unexpected run outcome: {other}"),
  }
}

#[tokio::test]
async fn each_run_needs_a_fresh_compile() {
  init_tracing();
  let dir = TempDir::new().unwrap();
  let input = write_input(&dir, "in.txt", b"one\n");
  let output = dir.path().join("out.txt");

  let mut graph = PipelineGraph::new();
  let source = graph.add_component(ComponentKind::SourceFile);
  let sink = graph.add_component(ComponentKind::SinkFile);
  graph
    .set_parameter(source, "path", &input.display().to_string())
    .unwrap();
  graph
    .set_parameter(sink, "path", &output.display().to_string())
    .unwrap();
  graph.add_pipe(source, sink).unwrap();

  run(compile(&graph).unwrap()).await.unwrap();
  // the first plan was consumed; a second run recompiles the same graph
  run(compile(&graph).unwrap()).await.unwrap();
  assert_eq!(read_lines(&output), vec!["one"]);
}
