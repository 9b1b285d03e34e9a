// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper.

pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kab_orders::model::{NewProduct, NewUser, Product, User, UserRole};
use kab_orders::{
  ConfirmCtx, ConfirmStage, ConfirmStep, Engine, EngineBuilder, EngineError, EngineResult, ManualClock, MemoryStore,
  StepControl, TrackingCodeSource,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

// --- Fixture ---

pub fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

pub struct Fixture {
  pub store: MemoryStore,
  pub clock: Arc<ManualClock>,
  pub engine: Engine,
}

impl Fixture {
  pub fn new() -> Self {
    Self::with(|builder| builder)
  }

  /// Lets a test adjust the builder (tracking codes, config) before the engine is built.
  pub fn with(customize: impl FnOnce(EngineBuilder) -> EngineBuilder) -> Self {
    setup_tracing();
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(t0()));
    let builder = Engine::builder(Arc::new(store.clone())).clock(clock.clone());
    let engine = customize(builder).build().expect("engine builds");
    Self { store, clock, engine }
  }

  pub async fn user(&self, username: &str) -> User {
    self.engine.register_user(new_user(username)).await.expect("registration succeeds")
  }

  pub async fn phone(&self, model: &str, price: i64, stock: i32) -> Product {
    self
      .engine
      .create_product(new_phone("Kab", model, price, stock))
      .await
      .expect("product created")
  }

  pub async fn stock_of(&self, product_id: Uuid) -> i32 {
    self.engine.product(product_id).await.expect("product exists").stock
  }
}

pub fn new_user(username: &str) -> NewUser {
  NewUser {
    username: username.to_string(),
    password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
    first_name: "Test".to_string(),
    last_name: username.to_string(),
    phone_number: "0800000000".to_string(),
    line_id: None,
    address: Some("Bangkok".to_string()),
    age: Some(30),
    birth_date: None,
    role: UserRole::Guest,
  }
}

pub fn new_phone(brand: &str, model: &str, price: i64, stock: i32) -> NewProduct {
  NewProduct {
    brand_name: brand.to_string(),
    model_name: model.to_string(),
    os: "Android".to_string(),
    price: Decimal::from(price),
    stock,
    image: None,
  }
}

// --- Tracking codes ---

/// Hands out the queued codes in order, then repeats the last one forever.
#[derive(Debug)]
pub struct ScriptedTrackingCodes {
  queue: Mutex<VecDeque<String>>,
  last: Mutex<String>,
}

impl ScriptedTrackingCodes {
  pub fn new(codes: &[&str]) -> Self {
    Self {
      queue: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
      last: Mutex::new(codes.last().map(|c| c.to_string()).unwrap_or_default()),
    }
  }

  pub fn push(&self, code: &str) {
    self.queue.lock().push_back(code.to_string());
  }
}

impl TrackingCodeSource for ScriptedTrackingCodes {
  fn next_code(&self) -> String {
    match self.queue.lock().pop_front() {
      Some(code) => {
        *self.last.lock() = code.clone();
        code
      }
      None => self.last.lock().clone(),
    }
  }
}

// --- Injected steps ---

/// Fails with an internal error, like a persistence fault mid-confirmation.
pub struct FailingStep {
  pub name: &'static str,
}

#[async_trait]
impl ConfirmStep for FailingStep {
  fn name(&self) -> &str {
    self.name
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::EmittingOrder
  }

  async fn run(&self, _ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    Err(EngineError::Internal(format!("injected failure in {}", self.name)))
  }
}

pub struct StoppingStep {
  pub name: &'static str,
}

#[async_trait]
impl ConfirmStep for StoppingStep {
  fn name(&self) -> &str {
    self.name
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::ReopeningCart
  }

  async fn run(&self, _ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    Ok(StepControl::Stop)
  }
}

/// Sleeps while the unit of work is open.
pub struct SlowStep {
  pub delay: Duration,
}

#[async_trait]
impl ConfirmStep for SlowStep {
  fn name(&self) -> &str {
    "slow_step"
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::EmittingOrder
  }

  async fn run(&self, _ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    tokio::time::sleep(self.delay).await;
    Ok(StepControl::Continue)
  }
}

// --- Helper for Tracing Setup ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
