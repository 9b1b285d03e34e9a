// kab-orders/src/pipeline/step.rs

use async_trait::async_trait;

use super::context::{ConfirmCtx, ConfirmStage};
use super::control::StepControl;
use crate::error::EngineResult;

/// One named unit of the confirmation.
#[async_trait]
pub trait ConfirmStep: Send + Sync {
  /// Unique within a pipeline; used to address the step when editing the pipeline.
  fn name(&self) -> &str;

  /// The stage the confirmation is in while this step runs.
  fn stage(&self) -> ConfirmStage;

  async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<StepControl>;
}
