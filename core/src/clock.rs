// kab-orders/src/clock.rs

//! Source of "now" for order timestamps and analytics windows.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock that only moves when told to. Used to place orders at chosen instants.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    ManualClock(Mutex::new(start))
  }

  pub fn set(&self, instant: DateTime<Utc>) {
    *self.0.lock() = instant;
  }

  pub fn advance(&self, by: chrono::Duration) {
    let mut guard = self.0.lock();
    *guard += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.0.lock()
  }
}
