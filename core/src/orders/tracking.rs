// kab-orders/src/orders/tracking.rs

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;

/// Produces candidate tracking codes. Uniqueness is enforced by the store, not here.
pub trait TrackingCodeSource: Send + Sync {
  fn next_code(&self) -> String;
}

/// `prefix` followed by `digits` uniformly random decimal digits.
#[derive(Debug)]
pub struct RandomTrackingCodes {
  prefix: String,
  digits: usize,
  rng: Mutex<StdRng>,
}

impl RandomTrackingCodes {
  pub fn new(prefix: impl Into<String>, digits: usize) -> Self {
    Self::with_rng(prefix, digits, StdRng::from_entropy())
  }

  /// Deterministic sequence, for tests and benchmarks.
  pub fn seeded(prefix: impl Into<String>, digits: usize, seed: u64) -> Self {
    Self::with_rng(prefix, digits, StdRng::seed_from_u64(seed))
  }

  pub fn from_config(config: &EngineConfig) -> Self {
    Self::new(config.tracking_code_prefix.clone(), config.tracking_code_digits)
  }

  fn with_rng(prefix: impl Into<String>, digits: usize, rng: StdRng) -> Self {
    Self {
      prefix: prefix.into(),
      digits,
      rng: Mutex::new(rng),
    }
  }
}

impl TrackingCodeSource for RandomTrackingCodes {
  fn next_code(&self) -> String {
    let mut rng = self.rng.lock();
    let mut code = String::with_capacity(self.prefix.len() + self.digits);
    code.push_str(&self.prefix);
    for _ in 0..self.digits {
      code.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    code
  }
}
