// kab-orders/src/model/cart.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "cart_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CartStatus {
  Pending,
  Confirmed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: CartStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Cart {
  pub fn new_pending(user_id: Uuid, now: DateTime<Utc>) -> Self {
    Cart {
      id: Uuid::new_v4(),
      user_id,
      status: CartStatus::Pending,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn is_pending(&self) -> bool {
    self.status == CartStatus::Pending
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LineItem {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  /// Frozen when the owning cart is confirmed; `None` while the cart is pending.
  pub unit_price: Option<Decimal>,
  pub created_at: DateTime<Utc>,
}

/// A line item joined with the product it points at.
///
/// `unit_price` is the frozen price for confirmed carts and the live catalog price
/// for pending ones.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  pub item_id: Uuid,
  pub product_id: Uuid,
  pub brand_name: String,
  pub model_name: String,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub available: i32,
}

impl CartLine {
  pub fn subtotal(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
  #[serde(flatten)]
  pub cart: Cart,
  pub lines: Vec<CartLine>,
}

impl CartView {
  pub fn total(&self) -> Decimal {
    self.lines.iter().map(CartLine::subtotal).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }
}
