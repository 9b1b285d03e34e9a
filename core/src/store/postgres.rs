// kab-orders/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{event, instrument, Level};
use uuid::Uuid;

use super::{InsertOutcome, LinePrice, ReserveOutcome, Store, UnitOfWork};
use crate::analytics::TimeRange;
use crate::error::{EngineError, EngineResult};
use crate::model::{
  Cart, CartLine, LineItem, Order, OrderDetails, OrderFilter, OrderLine, Page, Product, ProductSales, User,
};

const PRODUCT_COLUMNS: &str =
  "id, brand_name, model_name, os, price, stock, image, created_at, updated_at, deleted_at";
const CART_COLUMNS: &str = "id, user_id, status, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, unit_price, created_at";
const ORDER_COLUMNS: &str = "id, tracking_code, cart_id, user_id, total_price, created_at";
const USER_COLUMNS: &str = "id, username, first_name, last_name, phone_number, line_id, address, age, \
   birth_date, role, password_hash, created_at";

/// Confirmed line items joined to the order that confirmed them, bounded to `($1, $2]`.
const SOLD_ITEMS: &str = "FROM orders o \
   JOIN carts c ON c.id = o.cart_id AND c.status = 'CONFIRMED' \
   JOIN cart_items ci ON ci.cart_id = o.cart_id \
   JOIN products p ON p.id = ci.product_id \
   WHERE o.created_at > $1 AND o.created_at <= $2";

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  #[instrument(name = "PgStore::connect", skip(database_url))]
  pub async fn connect(database_url: &str, max_connections: u32) -> EngineResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    event!(Level::INFO, max_connections, "Database connection pool established.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Applies the embedded schema migrations.
  pub async fn migrate(&self) -> EngineResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    event!(Level::INFO, "Database migrations applied.");
    Ok(())
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> EngineResult<Box<dyn UnitOfWork>> {
    let tx = self.pool.begin().await.map_err(|e| EngineError::store("begin", e))?;
    Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
  }

  async fn product(&self, product_id: Uuid) -> EngineResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL");
    Ok(
      sqlx::query_as::<_, Product>(&sql)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn list_products(&self, page: &Page) -> EngineResult<Vec<Product>> {
    let sql = format!(
      "SELECT {PRODUCT_COLUMNS} FROM products \
       WHERE deleted_at IS NULL \
         AND ($1::TEXT IS NULL OR STRPOS(LOWER(brand_name || ' ' || model_name), $1) > 0) \
       ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3"
    );
    Ok(
      sqlx::query_as::<_, Product>(&sql)
        .bind(page.needle())
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn user(&self, user_id: Uuid) -> EngineResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    Ok(sqlx::query_as::<_, User>(&sql).bind(user_id).fetch_optional(&self.pool).await?)
  }

  async fn order_details(&self, tracking_code: &str) -> EngineResult<Option<OrderDetails>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE tracking_code = $1");
    let Some(order) = sqlx::query_as::<_, Order>(&sql)
      .bind(tracking_code)
      .fetch_optional(&self.pool)
      .await?
    else {
      return Ok(None);
    };

    let lines = sqlx::query_as::<_, OrderLine>(
      "SELECT ci.product_id, p.brand_name, p.model_name, ci.quantity, \
              COALESCE(ci.unit_price, p.price) AS unit_price \
       FROM cart_items ci JOIN products p ON p.id = ci.product_id \
       WHERE ci.cart_id = $1 ORDER BY ci.product_id ASC, ci.id ASC",
    )
    .bind(order.cart_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(Some(OrderDetails { order, lines }))
  }

  async fn list_orders(&self, filter: &OrderFilter) -> EngineResult<Vec<Order>> {
    let sql = format!(
      "SELECT {ORDER_COLUMNS} FROM orders \
       WHERE ($1::UUID IS NULL OR user_id = $1) \
         AND ($2::TEXT IS NULL OR STRPOS(LOWER(tracking_code), $2) > 0) \
       ORDER BY created_at DESC, id ASC LIMIT $3 OFFSET $4"
    );
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(filter.user_id)
        .bind(filter.page.needle())
        .bind(i64::from(filter.page.limit()))
        .bind(filter.page.offset() as i64)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn product_sales(&self, range: &TimeRange) -> EngineResult<Vec<ProductSales>> {
    let sql = format!(
      "SELECT ci.product_id, p.brand_name, p.model_name, SUM(ci.quantity)::BIGINT AS units \
       {SOLD_ITEMS} \
       GROUP BY ci.product_id, p.brand_name, p.model_name \
       ORDER BY units DESC, ci.product_id ASC"
    );
    Ok(
      sqlx::query_as::<_, ProductSales>(&sql)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn income(&self, range: &TimeRange) -> EngineResult<Decimal> {
    let sql = format!("SELECT COALESCE(SUM(ci.quantity * ci.unit_price), 0) {SOLD_ITEMS}");
    Ok(
      sqlx::query_scalar::<_, Decimal>(&sql)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?,
    )
  }
}

/// One PostgreSQL transaction. Dropping it uncommitted rolls back.
pub struct PgUnitOfWork {
  tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
  fn conn(&mut self) -> EngineResult<&mut PgConnection> {
    self
      .tx
      .as_deref_mut()
      .ok_or_else(|| EngineError::Internal("unit of work already finished".to_string()))
  }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
  async fn pending_cart(&mut self, user_id: Uuid, lock: bool) -> EngineResult<Option<Cart>> {
    let sql = format!(
      "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = 'PENDING'{}",
      if lock { " FOR UPDATE" } else { "" }
    );
    Ok(sqlx::query_as::<_, Cart>(&sql).bind(user_id).fetch_optional(self.conn()?).await?)
  }

  async fn cart(&mut self, cart_id: Uuid) -> EngineResult<Option<Cart>> {
    let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1");
    Ok(sqlx::query_as::<_, Cart>(&sql).bind(cart_id).fetch_optional(self.conn()?).await?)
  }

  async fn cart_lines(&mut self, cart_id: Uuid) -> EngineResult<Vec<CartLine>> {
    Ok(
      sqlx::query_as::<_, CartLine>(
        "SELECT ci.id AS item_id, ci.product_id, p.brand_name, p.model_name, ci.quantity, \
                COALESCE(ci.unit_price, p.price) AS unit_price, p.stock AS available \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 ORDER BY ci.product_id ASC, ci.id ASC",
      )
      .bind(cart_id)
      .fetch_all(self.conn()?)
      .await?,
    )
  }

  async fn insert_cart(&mut self, cart: &Cart) -> EngineResult<InsertOutcome> {
    // Untargeted so the partial "one pending cart per user" index counts as a conflict too.
    let result = sqlx::query(
      "INSERT INTO carts (id, user_id, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5) \
       ON CONFLICT DO NOTHING",
    )
    .bind(cart.id)
    .bind(cart.user_id)
    .bind(cart.status)
    .bind(cart.created_at)
    .bind(cart.updated_at)
    .execute(self.conn()?)
    .await?;
    Ok(insert_outcome(result.rows_affected()))
  }

  async fn seal_cart(&mut self, cart_id: Uuid, prices: &[LinePrice], at: DateTime<Utc>) -> EngineResult<bool> {
    let sealed = sqlx::query("UPDATE carts SET status = 'CONFIRMED', updated_at = $2 WHERE id = $1 AND status = 'PENDING'")
      .bind(cart_id)
      .bind(at)
      .execute(self.conn()?)
      .await?;
    if sealed.rows_affected() == 0 {
      return Ok(false);
    }
    for price in prices {
      sqlx::query("UPDATE cart_items SET unit_price = $2 WHERE id = $1")
        .bind(price.item_id)
        .bind(price.unit_price)
        .execute(self.conn()?)
        .await?;
    }
    Ok(true)
  }

  async fn line_item(&mut self, item_id: Uuid) -> EngineResult<Option<LineItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_items WHERE id = $1");
    Ok(sqlx::query_as::<_, LineItem>(&sql).bind(item_id).fetch_optional(self.conn()?).await?)
  }

  async fn line_item_for_product(&mut self, cart_id: Uuid, product_id: Uuid) -> EngineResult<Option<LineItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 AND product_id = $2");
    Ok(
      sqlx::query_as::<_, LineItem>(&sql)
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.conn()?)
        .await?,
    )
  }

  async fn insert_line_item(&mut self, item: &LineItem) -> EngineResult<()> {
    sqlx::query(
      "INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(item.id)
    .bind(item.cart_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.created_at)
    .execute(self.conn()?)
    .await?;
    Ok(())
  }

  async fn set_line_quantity(&mut self, item_id: Uuid, quantity: i32) -> EngineResult<bool> {
    let result = sqlx::query(
      "UPDATE cart_items ci SET quantity = $2 FROM carts c \
       WHERE ci.id = $1 AND c.id = ci.cart_id AND c.status = 'PENDING'",
    )
    .bind(item_id)
    .bind(quantity)
    .execute(self.conn()?)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn delete_line_item(&mut self, item_id: Uuid) -> EngineResult<bool> {
    let result = sqlx::query(
      "DELETE FROM cart_items ci USING carts c \
       WHERE ci.id = $1 AND c.id = ci.cart_id AND c.status = 'PENDING'",
    )
    .bind(item_id)
    .execute(self.conn()?)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn product(&mut self, product_id: Uuid, lock: bool) -> EngineResult<Option<Product>> {
    let sql = format!(
      "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL{}",
      if lock { " FOR UPDATE" } else { "" }
    );
    Ok(sqlx::query_as::<_, Product>(&sql).bind(product_id).fetch_optional(self.conn()?).await?)
  }

  async fn insert_product(&mut self, product: &Product) -> EngineResult<()> {
    sqlx::query(&format!(
      "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
    ))
    .bind(product.id)
    .bind(&product.brand_name)
    .bind(&product.model_name)
    .bind(&product.os)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.image.as_deref())
    .bind(product.created_at)
    .bind(product.updated_at)
    .bind(product.deleted_at)
    .execute(self.conn()?)
    .await?;
    Ok(())
  }

  async fn update_product(&mut self, product: &Product) -> EngineResult<()> {
    let result = sqlx::query(
      "UPDATE products SET brand_name = $2, model_name = $3, os = $4, price = $5, stock = $6, \
       image = $7, updated_at = $8 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.brand_name)
    .bind(&product.model_name)
    .bind(&product.os)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.image.as_deref())
    .bind(product.updated_at)
    .execute(self.conn()?)
    .await?;
    if result.rows_affected() == 0 {
      return Err(EngineError::ProductNotFound { product_id: product.id });
    }
    Ok(())
  }

  async fn soft_delete_product(&mut self, product_id: Uuid, at: DateTime<Utc>) -> EngineResult<bool> {
    let result =
      sqlx::query("UPDATE products SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL")
        .bind(product_id)
        .bind(at)
        .execute(self.conn()?)
        .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn reserve_stock(&mut self, product_id: Uuid, quantity: i32) -> EngineResult<ReserveOutcome> {
    let remaining: Option<i32> = sqlx::query_scalar(
      "UPDATE products SET stock = stock - $2 \
       WHERE id = $1 AND deleted_at IS NULL AND stock >= $2 RETURNING stock",
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(self.conn()?)
    .await?;

    if let Some(remaining) = remaining {
      return Ok(ReserveOutcome::Reserved { remaining });
    }

    let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 AND deleted_at IS NULL")
      .bind(product_id)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(match available {
      Some(available) => ReserveOutcome::Insufficient { available },
      None => ReserveOutcome::Missing,
    })
  }

  async fn release_stock(&mut self, product_id: Uuid, quantity: i32) -> EngineResult<bool> {
    let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
      .bind(product_id)
      .bind(quantity)
      .execute(self.conn()?)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn insert_order(&mut self, order: &Order) -> EngineResult<InsertOutcome> {
    // Only tracking-code collisions are retryable; a second order for the same cart must fail loudly.
    let result = sqlx::query(&format!(
      "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (tracking_code) DO NOTHING"
    ))
    .bind(order.id)
    .bind(&order.tracking_code)
    .bind(order.cart_id)
    .bind(order.user_id)
    .bind(order.total_price)
    .bind(order.created_at)
    .execute(self.conn()?)
    .await?;
    Ok(insert_outcome(result.rows_affected()))
  }

  async fn insert_user(&mut self, user: &User) -> EngineResult<InsertOutcome> {
    let result = sqlx::query(&format!(
      "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
       ON CONFLICT (username) DO NOTHING"
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.phone_number)
    .bind(&user.line_id)
    .bind(&user.address)
    .bind(user.age)
    .bind(user.birth_date)
    .bind(user.role)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .execute(self.conn()?)
    .await?;
    Ok(insert_outcome(result.rows_affected()))
  }

  async fn user(&mut self, user_id: Uuid, lock: bool) -> EngineResult<Option<User>> {
    let sql = format!(
      "SELECT {USER_COLUMNS} FROM users WHERE id = $1{}",
      if lock { " FOR UPDATE" } else { "" }
    );
    Ok(sqlx::query_as::<_, User>(&sql).bind(user_id).fetch_optional(self.conn()?).await?)
  }

  async fn update_user(&mut self, user: &User) -> EngineResult<()> {
    let result = sqlx::query(
      "UPDATE users SET first_name = $2, last_name = $3, phone_number = $4, line_id = $5, \
       address = $6, age = $7, birth_date = $8 WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.phone_number)
    .bind(&user.line_id)
    .bind(&user.address)
    .bind(user.age)
    .bind(user.birth_date)
    .execute(self.conn()?)
    .await?;
    if result.rows_affected() == 0 {
      return Err(EngineError::UserNotFound { user_id: user.id });
    }
    Ok(())
  }

  async fn commit(&mut self) -> EngineResult<()> {
    let tx = self
      .tx
      .take()
      .ok_or_else(|| EngineError::Internal("unit of work already finished".to_string()))?;
    tx.commit().await.map_err(|e| EngineError::store("commit", e))
  }

  async fn rollback(&mut self) -> EngineResult<()> {
    match self.tx.take() {
      Some(tx) => tx.rollback().await.map_err(|e| EngineError::store("rollback", e)),
      None => Ok(()),
    }
  }
}

fn insert_outcome(rows_affected: u64) -> InsertOutcome {
  if rows_affected == 0 {
    InsertOutcome::Conflict
  } else {
    InsertOutcome::Inserted
  }
}
