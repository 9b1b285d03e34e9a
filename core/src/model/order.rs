// kab-orders/src/model/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable record of one successful confirmation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub tracking_code: String,
  pub cart_id: Uuid,
  pub user_id: Uuid,
  pub total_price: Decimal,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderLine {
  pub product_id: Uuid,
  pub brand_name: String,
  pub model_name: String,
  pub quantity: i32,
  pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
  #[serde(flatten)]
  pub order: Order,
  pub lines: Vec<OrderLine>,
}

/// What a caller gets back from a successful confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
  pub order_id: Uuid,
  pub tracking_code: String,
  pub total_price: Decimal,
  pub confirmed_cart_id: Uuid,
  pub next_cart_id: Uuid,
  pub created_at: DateTime<Utc>,
}

/// Units of one product sold inside an analytics window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ProductSales {
  pub product_id: Uuid,
  pub brand_name: String,
  pub model_name: String,
  pub units: i64,
}
