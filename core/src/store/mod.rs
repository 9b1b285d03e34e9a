// kab-orders/src/store/mod.rs

//! The relational store the engine runs on.
//!
//! A [`Store`] answers read-only queries directly and hands out [`UnitOfWork`]s for
//! everything that mutates. A unit of work is one database transaction: nothing it does is
//! visible to anyone else until [`UnitOfWork::commit`], and dropping it without committing
//! discards all of it.
//!
//! Two backends ship with the crate:
//! - [`PgStore`]: PostgreSQL through `sqlx`, with row locks and conditional updates.
//! - [`MemoryStore`]: in-process tables with fully serialized transactions.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::analytics::TimeRange;
use crate::error::EngineResult;
use crate::model::{
  Cart, CartLine, LineItem, Order, OrderDetails, OrderFilter, Page, Product, ProductSales, User,
};

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
  Reserved { remaining: i32 },
  Insufficient { available: i32 },
  /// The product does not exist or has been soft-deleted.
  Missing,
}

/// Result of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  Conflict,
}

/// Unit price frozen onto a line item when its cart is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePrice {
  pub item_id: Uuid,
  pub unit_price: Decimal,
}

#[async_trait]
pub trait Store: Send + Sync {
  async fn begin(&self) -> EngineResult<Box<dyn UnitOfWork>>;

  /// A live (not soft-deleted) product.
  async fn product(&self, product_id: Uuid) -> EngineResult<Option<Product>>;
  async fn list_products(&self, page: &Page) -> EngineResult<Vec<Product>>;
  async fn user(&self, user_id: Uuid) -> EngineResult<Option<User>>;

  async fn order_details(&self, tracking_code: &str) -> EngineResult<Option<OrderDetails>>;
  /// Newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> EngineResult<Vec<Order>>;

  /// Units sold per product over orders created inside `range`, confirmed carts only.
  async fn product_sales(&self, range: &TimeRange) -> EngineResult<Vec<ProductSales>>;
  /// Sum of `quantity * frozen unit price` over orders created inside `range`.
  async fn income(&self, range: &TimeRange) -> EngineResult<Decimal>;
}

#[async_trait]
pub trait UnitOfWork: Send {
  /// The user's pending cart; `lock` takes a row lock held until the unit of work ends.
  async fn pending_cart(&mut self, user_id: Uuid, lock: bool) -> EngineResult<Option<Cart>>;
  async fn cart(&mut self, cart_id: Uuid) -> EngineResult<Option<Cart>>;
  /// Lines of a cart ordered by ascending product id.
  async fn cart_lines(&mut self, cart_id: Uuid) -> EngineResult<Vec<CartLine>>;
  async fn insert_cart(&mut self, cart: &Cart) -> EngineResult<InsertOutcome>;
  /// Flips a PENDING cart to CONFIRMED and freezes the given prices. Returns `false` when
  /// the cart was no longer pending, in which case nothing changed.
  async fn seal_cart(&mut self, cart_id: Uuid, prices: &[LinePrice], at: DateTime<Utc>) -> EngineResult<bool>;

  async fn line_item(&mut self, item_id: Uuid) -> EngineResult<Option<LineItem>>;
  async fn line_item_for_product(&mut self, cart_id: Uuid, product_id: Uuid) -> EngineResult<Option<LineItem>>;
  async fn insert_line_item(&mut self, item: &LineItem) -> EngineResult<()>;
  /// Edits a line only while its cart is PENDING. Returns `false` when the item is gone or
  /// its cart has been confirmed.
  async fn set_line_quantity(&mut self, item_id: Uuid, quantity: i32) -> EngineResult<bool>;
  /// Same guard as [`UnitOfWork::set_line_quantity`].
  async fn delete_line_item(&mut self, item_id: Uuid) -> EngineResult<bool>;

  /// A live product; `lock` takes a row lock.
  async fn product(&mut self, product_id: Uuid, lock: bool) -> EngineResult<Option<Product>>;
  async fn insert_product(&mut self, product: &Product) -> EngineResult<()>;
  async fn update_product(&mut self, product: &Product) -> EngineResult<()>;
  async fn soft_delete_product(&mut self, product_id: Uuid, at: DateTime<Utc>) -> EngineResult<bool>;

  /// Decrements stock by `quantity` only if at least that much is available, as one
  /// atomic conditional update.
  async fn reserve_stock(&mut self, product_id: Uuid, quantity: i32) -> EngineResult<ReserveOutcome>;
  /// Adds `quantity` back. Returns `false` if the product is gone.
  async fn release_stock(&mut self, product_id: Uuid, quantity: i32) -> EngineResult<bool>;

  async fn insert_order(&mut self, order: &Order) -> EngineResult<InsertOutcome>;

  async fn insert_user(&mut self, user: &User) -> EngineResult<InsertOutcome>;
  /// `lock` takes a row lock held until the unit of work ends.
  async fn user(&mut self, user_id: Uuid, lock: bool) -> EngineResult<Option<User>>;
  /// Writes the profile fields back. Username, role and password hash are left as stored.
  async fn update_user(&mut self, user: &User) -> EngineResult<()>;

  async fn commit(&mut self) -> EngineResult<()>;
  async fn rollback(&mut self) -> EngineResult<()>;
}
