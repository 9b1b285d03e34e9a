// kab-orders/src/config.rs

//! Engine tuning knobs. The service layer fills these from its own environment.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Prepended to every tracking code, e.g. `TH-0123456789`.
  pub tracking_code_prefix: String,
  /// Number of random digits after the prefix.
  pub tracking_code_digits: usize,
  /// Attempts at inserting an order before giving up on tracking-code collisions.
  pub max_tracking_attempts: u32,
  /// Upper bound for a whole confirmation unit of work, in milliseconds.
  pub confirm_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      tracking_code_prefix: "TH-".to_string(),
      tracking_code_digits: 10,
      max_tracking_attempts: 5,
      confirm_timeout_ms: None,
    }
  }
}

impl EngineConfig {
  pub fn confirm_timeout(&self) -> Option<Duration> {
    self.confirm_timeout_ms.map(Duration::from_millis)
  }

  pub fn validate(&self) -> EngineResult<()> {
    if self.tracking_code_digits == 0 {
      return Err(EngineError::Validation(
        "tracking_code_digits must be at least 1".to_string(),
      ));
    }
    if self.max_tracking_attempts == 0 {
      return Err(EngineError::Validation(
        "max_tracking_attempts must be at least 1".to_string(),
      ));
    }
    Ok(())
  }
}
