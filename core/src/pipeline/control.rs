// kab-orders/src/pipeline/control.rs

/// Signal from a step indicating whether the pipeline should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// Halt the pipeline. No further steps run.
  Stop,
}

/// Outcome of a pipeline run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
  /// Every step ran and returned `Continue`.
  Completed,
  /// The named step returned `Stop`.
  Stopped { at: String },
}
