// kab-orders/src/pipeline/definition.rs

//! `ConfirmationPipeline` construction and structural edits.

use std::sync::Arc;

use super::step::ConfirmStep;
use super::steps::{EmitOrder, LoadPendingCart, ReopenCart, ReserveStock, SealCart};
use crate::error::{EngineError, EngineResult};
use crate::orders::OrderFactory;

/// Ordered steps of a confirmation.
#[derive(Clone, Default)]
pub struct ConfirmationPipeline {
  pub(crate) steps: Vec<Arc<dyn ConfirmStep>>,
}

impl ConfirmationPipeline {
  /// An empty pipeline. See [`ConfirmationPipeline::standard`] for the real one.
  pub fn new() -> Self {
    Self::default()
  }

  /// `load_pending_cart → reserve_stock → seal_cart → emit_order → reopen_cart`.
  pub fn standard(factory: OrderFactory) -> Self {
    Self {
      steps: vec![
        Arc::new(LoadPendingCart),
        Arc::new(ReserveStock),
        Arc::new(SealCart),
        Arc::new(EmitOrder::new(factory)),
        Arc::new(ReopenCart),
      ],
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name()).collect()
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn push_step(&mut self, step: Arc<dyn ConfirmStep>) -> EngineResult<()> {
    self.ensure_step_not_exists(step.name())?;
    self.steps.push(step);
    Ok(())
  }

  pub fn insert_before_step(&mut self, existing_step_name: &str, step: Arc<dyn ConfirmStep>) -> EngineResult<()> {
    let idx = self.position(existing_step_name)?;
    self.ensure_step_not_exists(step.name())?;
    self.steps.insert(idx, step);
    Ok(())
  }

  pub fn insert_after_step(&mut self, existing_step_name: &str, step: Arc<dyn ConfirmStep>) -> EngineResult<()> {
    let idx = self.position(existing_step_name)?;
    self.ensure_step_not_exists(step.name())?;
    self.steps.insert(idx + 1, step);
    Ok(())
  }

  /// Removes the named step. Removing an unknown step is a no-op; returns whether one was removed.
  pub fn remove_step(&mut self, step_name: &str) -> bool {
    match self.steps.iter().position(|s| s.name() == step_name) {
      Some(idx) => {
        self.steps.remove(idx);
        true
      }
      None => false,
    }
  }

  fn position(&self, step_name: &str) -> EngineResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name() == step_name)
      .ok_or_else(|| EngineError::Internal(format!("step '{step_name}' not found in confirmation pipeline")))
  }

  fn ensure_step_not_exists(&self, step_name: &str) -> EngineResult<()> {
    if self.steps.iter().any(|s| s.name() == step_name) {
      return Err(EngineError::Internal(format!(
        "step '{step_name}' already exists in confirmation pipeline"
      )));
    }
    Ok(())
  }
}

impl std::fmt::Debug for ConfirmationPipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConfirmationPipeline")
      .field("steps", &self.step_names())
      .finish()
  }
}
