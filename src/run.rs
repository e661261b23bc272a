//! # Runner
//!
//! Executes a compiled [`Plan`]: one tokio task per stage, connected only by
//! the channels the compiler bound. The runner waits for every task, and on
//! the first failure cancels the shared token so blocked stages observe
//! cancellation (or end-of-stream, as a failed stage's channels close when
//! its task drops them) instead of hanging. The first failure is surfaced as
//! the run's outcome; a run either completes all stages or fails as a whole.

use crate::compile::Plan;
use crate::error::RunError;
use crate::stage;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
  /// How many stages the plan contained.
  pub stages: usize,
  /// When the runner started spawning stages.
  pub started_at: DateTime<Utc>,
  /// When the last stage finished.
  pub finished_at: DateTime<Utc>,
}

/// Executes a plan to completion.
///
/// Consumes the plan: every channel end moves into its stage task, so a
/// second run requires a fresh compile. Stage order in the plan does not
/// constrain scheduling; all stages run concurrently and coordinate through
/// their channels alone.
///
/// # Errors
///
/// Returns [`RunError::Stage`] carrying the first stage failure the runner
/// observed, after cancelling every other stage. No partial output is
/// considered valid once a run fails.
pub async fn run(plan: Plan) -> Result<RunSummary, RunError> {
  let started_at = Utc::now();
  let specs = plan.into_stages();
  let stages = specs.len();
  info!(stages, "starting pipeline run");

  let cancel = CancellationToken::new();
  let mut handles = Vec::with_capacity(stages);
  for spec in specs {
    let component = spec.component;
    let kind = spec.kind;
    let handle = tokio::spawn(stage::run_stage(spec, cancel.clone()));
    handles.push((component, kind, handle));
  }

  let mut first_failure: Option<RunError> = None;
  for (component, kind, handle) in handles {
    let outcome = match handle.await {
      Ok(result) => result.map_err(|source| RunError::Stage {
        component,
        kind,
        source,
      }),
      Err(_) => Err(RunError::Panic { component, kind }),
    };
    if let Err(failure) = outcome {
      // Unblock every peer; their channels also close as failed stages drop
      // their ends.
      cancel.cancel();
      if first_failure.is_none() {
        error!(component = %component, kind = %kind, %failure, "stage failed, cancelling run");
        first_failure = Some(failure);
      }
    }
  }

  match first_failure {
    Some(failure) => Err(failure),
    None => {
      let finished_at = Utc::now();
      info!(stages, "pipeline run complete");
      Ok(RunSummary {
        stages,
        started_at,
        finished_at,
      })
    }
  }
}
