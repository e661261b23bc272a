//! Per-kind stage bodies.
//!
//! A stage is the running task for one compiled component. It reads line
//! chunks from its bound input channels and writes to its bound output
//! channels according to its kind's transformation. Stages share no state;
//! channels are the only connection between them.
//!
//! A line chunk is the raw bytes of one line including its terminator, so a
//! source wired straight to a sink copies a file byte for byte. Transform
//! stages that rebuild a line reuse the incoming line's terminator, and a
//! final unterminated line stays unterminated.
//!
//! Every blocking point selects on the run's cancellation token, and a send
//! whose receiver is gone ends the stage quietly: teardown is driven by the
//! runner, not by the stage noticing its neighbors.

use crate::compile::StageSpec;
use crate::component::Parameters;
use crate::error::StageError;
use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use regex::Regex;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executes one stage to completion.
///
/// The channel ends in `spec` are dropped when the stage returns, which
/// closes them and lets neighboring stages observe end-of-stream.
pub(crate) async fn run_stage(
  spec: StageSpec,
  cancel: CancellationToken,
) -> Result<(), StageError> {
  let StageSpec {
    component,
    kind,
    params,
    mut inputs,
    outputs,
  } = spec;
  debug!(component = %component, kind = %kind, "stage started");
  let result = match &params {
    Parameters::SourceFile { path } => source_file(path, &outputs[0], &cancel).await,
    Parameters::SinkFile { path } => sink_file(path, &mut inputs[0], &cancel).await,
    Parameters::Filter { pattern } => {
      filter(pattern, &mut inputs[0], &outputs[0], &cancel).await
    }
    Parameters::Splitter { delimiter } => {
      splitter(delimiter, &mut inputs[0], &outputs[0], &outputs[1], &cancel).await
    }
    Parameters::Combiner => {
      let (first, second) = inputs.split_at_mut(1);
      combiner(&mut first[0], &mut second[0], &outputs[0], &cancel).await
    }
  };
  match &result {
    Ok(()) => debug!(component = %component, kind = %kind, "stage finished"),
    Err(error) => warn!(component = %component, kind = %kind, %error, "stage failed"),
  }
  result
}

/// Splits a line chunk into its content and terminator.
pub(crate) fn split_line(chunk: &[u8]) -> (&[u8], &'static [u8]) {
  if let Some(content) = chunk.strip_suffix(b"\r\n") {
    (content, b"\r\n")
  } else if let Some(content) = chunk.strip_suffix(b"\n") {
    (content, b"\n")
  } else {
    (chunk, b"")
  }
}

/// Rebuilds a line chunk from content and terminator.
pub(crate) fn line_with_terminator(content: &[u8], terminator: &[u8]) -> Bytes {
  let mut buf = BytesMut::with_capacity(content.len() + terminator.len());
  buf.extend_from_slice(content);
  buf.extend_from_slice(terminator);
  buf.freeze()
}

/// Parses a line as a signed integer, tolerating surrounding whitespace.
pub(crate) fn parse_number(line: &[u8]) -> Result<i64, StageError> {
  std::str::from_utf8(line)
    .ok()
    .and_then(|text| text.trim().parse().ok())
    .ok_or_else(|| StageError::Malformed {
      line: String::from_utf8_lossy(line).into_owned(),
    })
}

/// Reads line chunks from a buffered reader, terminators included.
fn line_chunks<R>(mut reader: R) -> impl Stream<Item = std::io::Result<Bytes>>
where
  R: tokio::io::AsyncBufRead + Unpin,
{
  try_stream! {
    let mut buf = Vec::new();
    loop {
      buf.clear();
      let read = reader.read_until(b'\n', &mut buf).await?;
      if read == 0 {
        break;
      }
      yield Bytes::copy_from_slice(&buf);
    }
  }
}

/// Receives the next chunk, or `None` on end-of-stream or cancellation.
async fn next_chunk(input: &mut Receiver<Bytes>, cancel: &CancellationToken) -> Option<Bytes> {
  tokio::select! {
    _ = cancel.cancelled() => None,
    chunk = input.recv() => chunk,
  }
}

/// Sends a chunk downstream.
///
/// Returns `false` when the stage should stop: the run was cancelled, or the
/// receiver is gone because the runner is tearing the plan down.
async fn forward(output: &Sender<Bytes>, chunk: Bytes, cancel: &CancellationToken) -> bool {
  tokio::select! {
    _ = cancel.cancelled() => false,
    sent = output.send(chunk) => sent.is_ok(),
  }
}

/// `source-file`: emit the bytes of the named file, one line chunk at a
/// time.
async fn source_file(
  path: &Path,
  output: &Sender<Bytes>,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  let file = File::open(path).await.map_err(|source| StageError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let lines = line_chunks(BufReader::new(file));
  tokio::pin!(lines);
  loop {
    let next = tokio::select! {
      _ = cancel.cancelled() => return Ok(()),
      next = lines.next() => next,
    };
    let Some(chunk) = next else {
      return Ok(());
    };
    let chunk = chunk.map_err(|source| StageError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    if !forward(output, chunk, cancel).await {
      return Ok(());
    }
  }
}

/// `sink-file`: persist incoming chunks to the named file.
async fn sink_file(
  path: &Path,
  input: &mut Receiver<Bytes>,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  let file = File::create(path).await.map_err(|source| StageError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let mut writer = BufWriter::new(file);
  while let Some(chunk) = next_chunk(input, cancel).await {
    writer
      .write_all(&chunk)
      .await
      .map_err(|source| StageError::Io {
        path: path.to_path_buf(),
        source,
      })?;
  }
  writer.flush().await.map_err(|source| StageError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(())
}

/// `filter`: pass through only the lines matching the pattern.
///
/// Matching is done against the line content without its terminator; the
/// chunk itself is forwarded unchanged.
async fn filter(
  pattern: &Regex,
  input: &mut Receiver<Bytes>,
  output: &Sender<Bytes>,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  while let Some(chunk) = next_chunk(input, cancel).await {
    let (line, _) = split_line(&chunk);
    if pattern.is_match(&String::from_utf8_lossy(line)) {
      if !forward(output, chunk, cancel).await {
        break;
      }
    }
  }
  Ok(())
}

/// `splitter`: split each line on the delimiter's first occurrence.
///
/// The left part goes to output slot 1, the right part to output slot 2;
/// both streams have independent backpressure. A line without the delimiter
/// goes whole to slot 1 with an empty line on slot 2.
async fn splitter(
  delimiter: &str,
  input: &mut Receiver<Bytes>,
  left: &Sender<Bytes>,
  right: &Sender<Bytes>,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  while let Some(chunk) = next_chunk(input, cancel).await {
    let (line, terminator) = split_line(&chunk);
    let text = String::from_utf8_lossy(line);
    let (first, second) = match text.split_once(delimiter) {
      Some(parts) => parts,
      None => (text.as_ref(), ""),
    };
    let first = line_with_terminator(first.as_bytes(), terminator);
    let second = line_with_terminator(second.as_bytes(), terminator);
    if !forward(left, first, cancel).await || !forward(right, second, cancel).await {
      break;
    }
  }
  Ok(())
}

/// `combiner`: pairwise sum one line from each input.
///
/// Inputs are consumed in lock-step, one line at a time, and the stage
/// stops at the shorter input. The output line reuses the first input's
/// terminator.
async fn combiner(
  first: &mut Receiver<Bytes>,
  second: &mut Receiver<Bytes>,
  output: &Sender<Bytes>,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  loop {
    let Some(a) = next_chunk(first, cancel).await else {
      return Ok(());
    };
    let Some(b) = next_chunk(second, cancel).await else {
      return Ok(());
    };
    let (line_a, terminator) = split_line(&a);
    let (line_b, _) = split_line(&b);
    let sum = parse_number(line_a)? + parse_number(line_b)?;
    let chunk = line_with_terminator(sum.to_string().as_bytes(), terminator);
    if !forward(output, chunk, cancel).await {
      return Ok(());
    }
  }
}
