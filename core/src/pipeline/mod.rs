// kab-orders/src/pipeline/mod.rs

//! The confirmation transaction as an ordered pipeline of named steps.
//!
//! Each step runs inside its own tracing span against a shared [`ConfirmCtx`] holding the
//! open unit of work. The first error aborts the run; a step may also stop it early with
//! [`StepControl::Stop`]. Committing or rolling back is left to the caller.

pub mod context;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;
pub mod steps;

pub use context::{ConfirmCtx, ConfirmStage};
pub use control::{PipelineOutcome, StepControl};
pub use definition::ConfirmationPipeline;
pub use step::ConfirmStep;
