// kab-orders/src/model/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub brand_name: String,
  pub model_name: String,
  pub os: String,
  pub price: Decimal,
  pub stock: i32,
  #[serde(skip_serializing)]
  pub image: Option<Vec<u8>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
  pub fn is_deleted(&self) -> bool {
    self.deleted_at.is_some()
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub brand_name: String,
  pub model_name: String,
  #[serde(default)]
  pub os: String,
  pub price: Decimal,
  pub stock: i32,
  #[serde(default)]
  pub image: Option<Vec<u8>>,
}

impl NewProduct {
  pub fn validate(&self) -> EngineResult<()> {
    if self.brand_name.trim().is_empty() || self.model_name.trim().is_empty() {
      return Err(EngineError::Validation(
        "brand_name and model_name are required".to_string(),
      ));
    }
    check_price_and_stock(Some(self.price), Some(self.stock))
  }

  pub fn into_product(self, id: Uuid, now: DateTime<Utc>) -> Product {
    Product {
      id,
      brand_name: self.brand_name,
      model_name: self.model_name,
      os: self.os,
      price: self.price,
      stock: self.stock,
      image: self.image,
      created_at: now,
      updated_at: now,
      deleted_at: None,
    }
  }
}

/// Partial catalog update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
  pub brand_name: Option<String>,
  pub model_name: Option<String>,
  pub os: Option<String>,
  pub price: Option<Decimal>,
  pub stock: Option<i32>,
  pub image: Option<Vec<u8>>,
}

impl ProductPatch {
  pub fn validate(&self) -> EngineResult<()> {
    check_price_and_stock(self.price, self.stock)
  }

  pub fn apply(self, product: &mut Product, now: DateTime<Utc>) {
    if let Some(brand_name) = self.brand_name {
      product.brand_name = brand_name;
    }
    if let Some(model_name) = self.model_name {
      product.model_name = model_name;
    }
    if let Some(os) = self.os {
      product.os = os;
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if let Some(stock) = self.stock {
      product.stock = stock;
    }
    if let Some(image) = self.image {
      product.image = Some(image);
    }
    product.updated_at = now;
  }
}

fn check_price_and_stock(price: Option<Decimal>, stock: Option<i32>) -> EngineResult<()> {
  if price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
    return Err(EngineError::Validation("price must not be negative".to_string()));
  }
  if stock.is_some_and(|s| s < 0) {
    return Err(EngineError::Validation("stock must not be negative".to_string()));
  }
  Ok(())
}
