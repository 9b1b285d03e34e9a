// tests/common/pg.rs

//! PostgreSQL fixtures. Each test gets its own freshly migrated database on the server named
//! by `DATABASE_URL`; without that variable the PostgreSQL tests return early.

use chrono::Duration;
use kab_orders::model::{Product, User};
use kab_orders::{Engine, EngineBuilder, ManualClock, PgStore};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use super::{new_phone, new_user, setup_tracing, t0};

/// Database names are interpolated into DDL, so only the generated shape is accepted.
fn validate_database_name(name: &str) -> Result<(), String> {
  if name.is_empty() || name.len() > 63 {
    return Err(format!("database name '{name}' must be 1-63 characters long"));
  }
  if !name.starts_with("kab_test_") || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(format!("database name '{name}' is not a generated test name"));
  }
  Ok(())
}

/// A uniquely named database with the schema applied.
///
/// `cleanup().await` drops it. A test that panics first leaves its `kab_test_*` database
/// behind on the server.
pub struct TestDb {
  pub pool: PgPool,
  pub name: String,
  admin_url: String,
}

impl TestDb {
  pub async fn create() -> Option<Self> {
    let Ok(admin_url) = std::env::var("DATABASE_URL") else {
      eprintln!("DATABASE_URL is not set; skipping PostgreSQL test.");
      return None;
    };
    let name = format!("kab_test_{}", Uuid::new_v4().simple());
    validate_database_name(&name).expect("generated name is valid");

    let mut admin = PgConnection::connect(&admin_url).await.expect("connect to DATABASE_URL");
    sqlx::query(&format!("CREATE DATABASE \"{name}\""))
      .execute(&mut admin)
      .await
      .expect("create test database");
    admin.close().await.ok();

    let options: PgConnectOptions = admin_url.parse().expect("DATABASE_URL parses");
    let pool = PgPoolOptions::new()
      .max_connections(20)
      .acquire_timeout(std::time::Duration::from_secs(10))
      .connect_with(options.database(&name))
      .await
      .expect("connect to test database");
    PgStore::from_pool(pool.clone()).migrate().await.expect("migrations apply");

    Some(Self { pool, name, admin_url })
  }

  pub async fn cleanup(self) {
    self.pool.close().await;
    if validate_database_name(&self.name).is_err() {
      return;
    }
    if let Ok(mut admin) = PgConnection::connect(&self.admin_url).await {
      let drop_query = format!("DROP DATABASE IF EXISTS \"{}\"", self.name);
      if let Err(err) = sqlx::query(&drop_query).execute(&mut admin).await {
        eprintln!("Failed to drop test database '{}': {err}", self.name);
      }
      admin.close().await.ok();
    }
  }
}

/// [`super::Fixture`] over a real PostgreSQL database.
pub struct PgFixture {
  pub db: TestDb,
  pub clock: Arc<ManualClock>,
  pub engine: Engine,
}

impl PgFixture {
  pub async fn new() -> Option<Self> {
    Self::with(|builder| builder).await
  }

  pub async fn with(customize: impl FnOnce(EngineBuilder) -> EngineBuilder) -> Option<Self> {
    setup_tracing();
    let db = TestDb::create().await?;
    let clock = Arc::new(ManualClock::new(t0()));
    let store = PgStore::from_pool(db.pool.clone());
    let builder = Engine::builder(Arc::new(store)).clock(clock.clone());
    let engine = customize(builder).build().expect("engine builds");
    Some(Self { db, clock, engine })
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

  pub async fn order_count(&self) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
      .fetch_one(&self.db.pool)
      .await
      .expect("count orders")
  }

  /// Quantity stored on a line item, whatever its cart's status.
  pub async fn line_quantity(&self, item_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT quantity FROM cart_items WHERE id = $1")
      .bind(item_id)
      .fetch_one(&self.db.pool)
      .await
      .expect("line item exists")
  }

  /// Moves the clock so orders land `ago` before the frozen reference instant.
  pub fn rewind_to(&self, ago: Duration) {
    self.clock.set(t0() - ago);
  }
}
