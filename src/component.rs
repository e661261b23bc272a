//! # Components
//!
//! This module defines the component model: the closed set of component kinds,
//! their catalog metadata, their typed parameters, and the per-component port
//! tables that record which pipe occupies which slot.
//!
//! ## Kinds
//!
//! Components form a closed set of kinds, each with a fixed input and output
//! arity:
//!
//! | kind | inputs | outputs | transformation |
//! |---|---|---|---|
//! | `source-file` | 0 | 1 | emit the bytes of a named file |
//! | `sink-file` | 1 | 0 | persist incoming bytes to a named file |
//! | `filter` | 1 | 1 | pass through only the lines matching a pattern |
//! | `splitter` | 1 | 2 | split each line on a delimiter into two parts |
//! | `combiner` | 2 | 1 | pairwise sum one line from each input |
//!
//! A kind with zero inputs is a *source*; zero outputs is a *sink*; more than
//! one input or output makes a *fan-in* or *fan-out* node.
//!
//! ## Ports and slots
//!
//! Each component keeps an ordered list of attached pipes per side. A pipe's
//! *slot index* is its 1-based position in that list. The lists never grow
//! beyond the declared arity; an attach against a saturated side fails with
//! [`GraphError::PortFull`] and leaves the list unchanged.

use crate::error::{GraphError, ParamError};
use crate::pipe::PipeId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable identifier of a component within one [`PipelineGraph`].
///
/// Identifiers are allocated by the graph and are never reused, so a stale id
/// held by an editor after a removal cannot silently alias a newer component.
///
/// [`PipelineGraph`]: crate::graph::PipelineGraph
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ComponentId(pub(crate) u64);

impl fmt::Display for ComponentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "c{}", self.0)
  }
}

/// Which side of a component a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSide {
  /// An inbound port.
  Input,
  /// An outbound port.
  Output,
}

impl fmt::Display for PortSide {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PortSide::Input => write!(f, "input"),
      PortSide::Output => write!(f, "output"),
    }
  }
}

/// The closed set of component kinds.
///
/// Each kind carries its arities, its palette metadata, and its parameter
/// schema. Keeping the set closed lets the compiler and the stage bodies
/// match exhaustively instead of dispatching through a trait object.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
  /// Emit the bytes of a named input file, one line chunk at a time.
  SourceFile,
  /// Persist incoming bytes to a named output file.
  SinkFile,
  /// Pass through only the lines matching a pattern.
  Filter,
  /// Split each line on a delimiter; the left part goes to output slot 1,
  /// the right part to output slot 2.
  Splitter,
  /// Pairwise sum one line from input slot 1 with one line from input slot 2.
  Combiner,
}

impl ComponentKind {
  /// Every kind, in palette order.
  ///
  /// This is the catalog consumed by the editor's component palette.
  pub const ALL: [ComponentKind; 5] = [
    ComponentKind::SourceFile,
    ComponentKind::SinkFile,
    ComponentKind::Filter,
    ComponentKind::Splitter,
    ComponentKind::Combiner,
  ];

  /// The number of input ports this kind declares.
  pub fn input_arity(&self) -> usize {
    match self {
      ComponentKind::SourceFile => 0,
      ComponentKind::SinkFile => 1,
      ComponentKind::Filter => 1,
      ComponentKind::Splitter => 1,
      ComponentKind::Combiner => 2,
    }
  }

  /// The number of output ports this kind declares.
  pub fn output_arity(&self) -> usize {
    match self {
      ComponentKind::SourceFile => 1,
      ComponentKind::SinkFile => 0,
      ComponentKind::Filter => 1,
      ComponentKind::Splitter => 2,
      ComponentKind::Combiner => 1,
    }
  }

  /// The display label shown on the editor canvas and in the palette.
  pub fn label(&self) -> &'static str {
    match self {
      ComponentKind::SourceFile => "File Input",
      ComponentKind::SinkFile => "File Output",
      ComponentKind::Filter => "Filter",
      ComponentKind::Splitter => "Split",
      ComponentKind::Combiner => "Add",
    }
  }

  /// The palette category this kind is grouped under.
  pub fn category(&self) -> &'static str {
    match self {
      ComponentKind::SourceFile | ComponentKind::SinkFile => "I/O",
      ComponentKind::Filter => "Searching",
      ComponentKind::Splitter => "Editing",
      ComponentKind::Combiner => "Calculations",
    }
  }

  /// The names of the parameters this kind exposes to property editors.
  pub fn parameter_names(&self) -> &'static [&'static str] {
    match self {
      ComponentKind::SourceFile | ComponentKind::SinkFile => &["path"],
      ComponentKind::Filter => &["pattern"],
      ComponentKind::Splitter => &["delimiter"],
      ComponentKind::Combiner => &[],
    }
  }

  /// True for kinds with no input ports.
  pub fn is_source(&self) -> bool {
    self.input_arity() == 0
  }

  /// True for kinds with no output ports.
  pub fn is_sink(&self) -> bool {
    self.output_arity() == 0
  }
}

impl fmt::Display for ComponentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ComponentKind::SourceFile => write!(f, "source-file"),
      ComponentKind::SinkFile => write!(f, "sink-file"),
      ComponentKind::Filter => write!(f, "filter"),
      ComponentKind::Splitter => write!(f, "splitter"),
      ComponentKind::Combiner => write!(f, "combiner"),
    }
  }
}

/// Kind-specific typed parameters of one component instance.
///
/// Property editors read and write these through the string-based surface on
/// [`Component::parameter`] and [`Component::set_parameter`]; the compiler and
/// the stage bodies consume the typed values directly.
#[derive(Debug, Clone)]
pub enum Parameters {
  /// Parameters of a `source-file` component.
  SourceFile {
    /// The file to read.
    path: PathBuf,
  },
  /// Parameters of a `sink-file` component.
  SinkFile {
    /// The file to write.
    path: PathBuf,
  },
  /// Parameters of a `filter` component.
  Filter {
    /// The compiled pattern lines must match to pass through.
    pattern: Regex,
  },
  /// Parameters of a `splitter` component.
  Splitter {
    /// The delimiter each line is split on, at its first occurrence.
    delimiter: String,
  },
  /// A `combiner` has no parameters.
  Combiner,
}

impl Parameters {
  /// The default parameters a freshly placed component of `kind` starts with.
  pub(crate) fn default_for(kind: ComponentKind) -> Parameters {
    match kind {
      ComponentKind::SourceFile => Parameters::SourceFile {
        path: PathBuf::new(),
      },
      ComponentKind::SinkFile => Parameters::SinkFile {
        path: PathBuf::new(),
      },
      ComponentKind::Filter => Parameters::Filter {
        pattern: Regex::new("").expect("empty pattern compiles"),
      },
      ComponentKind::Splitter => Parameters::Splitter {
        delimiter: ",".to_string(),
      },
      ComponentKind::Combiner => Parameters::Combiner,
    }
  }
}

/// A typed node in the pipeline graph.
///
/// A component couples a [`ComponentKind`] with its parameter values and two
/// ordered port tables recording which pipe occupies which slot. Components
/// are owned by the graph; editors hold [`ComponentId`]s and read state
/// through shared references.
#[derive(Debug, Clone)]
pub struct Component {
  /// This component's identity within its graph.
  id: ComponentId,
  /// The transformation this component performs.
  kind: ComponentKind,
  /// Kind-specific parameter values.
  params: Parameters,
  /// Pipes attached to the input side, in slot order.
  input_pipes: Vec<PipeId>,
  /// Pipes attached to the output side, in slot order.
  output_pipes: Vec<PipeId>,
}

impl Component {
  /// Creates a component of `kind` with default parameters and empty port
  /// tables.
  pub(crate) fn new(id: ComponentId, kind: ComponentKind) -> Self {
    Self {
      id,
      kind,
      params: Parameters::default_for(kind),
      input_pipes: Vec::with_capacity(kind.input_arity()),
      output_pipes: Vec::with_capacity(kind.output_arity()),
    }
  }

  /// Returns this component's identifier.
  pub fn id(&self) -> ComponentId {
    self.id
  }

  /// Returns this component's kind.
  pub fn kind(&self) -> ComponentKind {
    self.kind
  }

  /// Returns this component's typed parameters.
  pub fn params(&self) -> &Parameters {
    &self.params
  }

  /// The pipes attached to the input side, in slot order.
  ///
  /// Slot `n` (1-based) is occupied by the pipe at index `n - 1`.
  pub fn input_pipes(&self) -> &[PipeId] {
    &self.input_pipes
  }

  /// The pipes attached to the output side, in slot order.
  pub fn output_pipes(&self) -> &[PipeId] {
    &self.output_pipes
  }

  /// The 1-based input slot `pipe` occupies, if it is attached.
  pub fn input_slot(&self, pipe: PipeId) -> Option<usize> {
    self.input_pipes.iter().position(|p| *p == pipe).map(|i| i + 1)
  }

  /// The 1-based output slot `pipe` occupies, if it is attached.
  pub fn output_slot(&self, pipe: PipeId) -> Option<usize> {
    self.output_pipes.iter().position(|p| *p == pipe).map(|i| i + 1)
  }

  /// The number of input slots still free.
  pub fn free_input_slots(&self) -> usize {
    self.kind.input_arity() - self.input_pipes.len()
  }

  /// The number of output slots still free.
  pub fn free_output_slots(&self) -> usize {
    self.kind.output_arity() - self.output_pipes.len()
  }

  /// Appends `pipe` to the input port table and returns its 1-based slot.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::PortFull`] if every declared input slot is already
  /// occupied. The port table is left unchanged.
  pub(crate) fn attach_input(&mut self, pipe: PipeId) -> Result<usize, GraphError> {
    if self.input_pipes.len() >= self.kind.input_arity() {
      return Err(GraphError::PortFull {
        component: self.id,
        side: PortSide::Input,
        arity: self.kind.input_arity(),
      });
    }
    self.input_pipes.push(pipe);
    Ok(self.input_pipes.len())
  }

  /// Appends `pipe` to the output port table and returns its 1-based slot.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::PortFull`] if every declared output slot is
  /// already occupied. The port table is left unchanged.
  pub(crate) fn attach_output(&mut self, pipe: PipeId) -> Result<usize, GraphError> {
    if self.output_pipes.len() >= self.kind.output_arity() {
      return Err(GraphError::PortFull {
        component: self.id,
        side: PortSide::Output,
        arity: self.kind.output_arity(),
      });
    }
    self.output_pipes.push(pipe);
    Ok(self.output_pipes.len())
  }

  /// Removes `pipe` from the input port table.
  ///
  /// Later pipes shift down one slot, keeping the table dense.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::NotAttached`] if `pipe` is not present. Disconnect
  /// paths treat that as a no-op; see [`Pipe::disconnect`].
  ///
  /// [`Pipe::disconnect`]: crate::pipe::Pipe
  pub(crate) fn detach_input(&mut self, pipe: PipeId) -> Result<(), GraphError> {
    match self.input_pipes.iter().position(|p| *p == pipe) {
      Some(index) => {
        self.input_pipes.remove(index);
        Ok(())
      }
      None => Err(GraphError::NotAttached {
        component: self.id,
        side: PortSide::Input,
        pipe,
      }),
    }
  }

  /// Removes `pipe` from the output port table.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::NotAttached`] if `pipe` is not present.
  pub(crate) fn detach_output(&mut self, pipe: PipeId) -> Result<(), GraphError> {
    match self.output_pipes.iter().position(|p| *p == pipe) {
      Some(index) => {
        self.output_pipes.remove(index);
        Ok(())
      }
      None => Err(GraphError::NotAttached {
        component: self.id,
        side: PortSide::Output,
        pipe,
      }),
    }
  }

  /// Reads a parameter value by name, rendered as a string.
  ///
  /// Returns `None` if this kind does not declare the parameter.
  pub fn parameter(&self, name: &str) -> Option<String> {
    match (&self.params, name) {
      (Parameters::SourceFile { path }, "path") | (Parameters::SinkFile { path }, "path") => {
        Some(path.display().to_string())
      }
      (Parameters::Filter { pattern }, "pattern") => Some(pattern.as_str().to_string()),
      (Parameters::Splitter { delimiter }, "delimiter") => Some(delimiter.clone()),
      _ => None,
    }
  }

  /// Sets a parameter by name from its string form.
  ///
  /// Validation is kind-specific: an invalid filter pattern or an empty
  /// splitter delimiter is rejected and the previous value stays in place.
  ///
  /// # Errors
  ///
  /// Returns [`ParamError::UnknownParameter`] for a name this kind does not
  /// declare, [`ParamError::InvalidPattern`] for a pattern that does not
  /// compile, and [`ParamError::EmptyDelimiter`] for an empty delimiter.
  pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), ParamError> {
    match (&mut self.params, name) {
      (Parameters::SourceFile { path }, "path") | (Parameters::SinkFile { path }, "path") => {
        *path = PathBuf::from(value);
        Ok(())
      }
      (Parameters::Filter { pattern }, "pattern") => {
        let compiled = Regex::new(value).map_err(|source| ParamError::InvalidPattern {
          pattern: value.to_string(),
          source,
        })?;
        *pattern = compiled;
        Ok(())
      }
      (Parameters::Splitter { delimiter }, "delimiter") => {
        if value.is_empty() {
          return Err(ParamError::EmptyDelimiter);
        }
        *delimiter = value.to_string();
        Ok(())
      }
      _ => Err(ParamError::UnknownParameter {
        kind: self.kind,
        name: name.to_string(),
      }),
    }
  }
}
