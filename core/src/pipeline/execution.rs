// kab-orders/src/pipeline/execution.rs

//! `ConfirmationPipeline::run`.

use tracing::{event, info_span, instrument, Instrument, Level};

use super::context::ConfirmCtx;
use super::control::{PipelineOutcome, StepControl};
use super::definition::ConfirmationPipeline;
use crate::error::EngineResult;

impl ConfirmationPipeline {
  /// Runs every step in order against `ctx`.
  ///
  /// Leaves the unit of work open either way: on `Err` or `Stopped` the caller decides
  /// whether anything gets committed.
  #[instrument(
    name = "ConfirmationPipeline::run",
    skip_all,
    fields(user_id = %ctx.user_id, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<PipelineOutcome> {
    event!(Level::DEBUG, "Confirmation pipeline starting.");

    for (step_idx, step) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "confirm_step",
        step_name = step.name(),
        step_index = step_idx,
        stage = %step.stage()
      );
      ctx.transition(step.stage());

      let control = async {
        event!(Level::DEBUG, "Processing step.");
        step.run(ctx).await
      }
      .instrument(step_span)
      .await;

      match control {
        Ok(StepControl::Continue) => {}
        Ok(StepControl::Stop) => {
          event!(Level::INFO, step = step.name(), "Pipeline stopped by step.");
          return Ok(PipelineOutcome::Stopped {
            at: step.name().to_string(),
          });
        }
        Err(e) => {
          if e.is_business() {
            event!(Level::INFO, step = step.name(), error = %e, "Step refused the confirmation.");
          } else {
            event!(Level::ERROR, step = step.name(), error = %e, "Step failed.");
          }
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Confirmation pipeline completed.");
    Ok(PipelineOutcome::Completed)
  }
}
