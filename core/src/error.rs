// kab-orders/src/error.rs
use std::time::Duration;

use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

/// Every failure the engine can report.
///
/// Variants up to `TrackingCodeExhausted` are business outcomes: expected, reported with
/// enough detail for the caller to act on, and never retried by the engine. The rest are
/// fatal to the current request; whatever unit of work was open has been rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
  InsufficientStock {
    product_id: Uuid,
    requested: i32,
    available: i32,
  },

  #[error("Cart {cart_id} has no items to confirm")]
  EmptyCart { cart_id: Uuid },

  #[error("No pending cart exists for user {user_id}")]
  CartNotFound { user_id: Uuid },

  #[error("Cart {cart_id} is confirmed and can no longer be modified")]
  CartImmutable { cart_id: Uuid },

  #[error("Cart {cart_id} was confirmed by a concurrent request")]
  CartAlreadyConfirmed { cart_id: Uuid },

  #[error("User {user_id} already has a pending cart")]
  PendingCartExists { user_id: Uuid },

  #[error("Line item {item_id} not found")]
  LineItemNotFound { item_id: Uuid },

  #[error("User {user_id} not found")]
  UserNotFound { user_id: Uuid },

  #[error("Product {product_id} not found")]
  ProductNotFound { product_id: Uuid },

  #[error("Order with tracking code '{tracking_code}' not found")]
  OrderNotFound { tracking_code: String },

  #[error("Username '{username}' is already taken")]
  UsernameTaken { username: String },

  #[error("Quantity must be positive, got {quantity}")]
  InvalidQuantity { quantity: i32 },

  #[error("Validation failed: {0}")]
  Validation(String),

  #[error("Could not allocate a unique tracking code after {attempts} attempts")]
  TrackingCodeExhausted { attempts: u32 },

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Schema migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Store operation '{operation}' failed. Source: {source}")]
  Store {
    operation: &'static str,
    #[source]
    source: AnyhowError,
  },

  #[error("Confirmation abandoned after {after:?}")]
  Timeout { after: Duration },

  #[error("Internal engine error: {0}")]
  Internal(String),
}

impl EngineError {
  /// `true` for expected business outcomes, `false` for failures of the store or engine.
  pub fn is_business(&self) -> bool {
    !matches!(
      self,
      EngineError::Database(_)
        | EngineError::Migration(_)
        | EngineError::Store { .. }
        | EngineError::Timeout { .. }
        | EngineError::Internal(_)
    )
  }

  pub(crate) fn store(operation: &'static str, source: impl Into<AnyhowError>) -> Self {
    EngineError::Store {
      operation,
      source: source.into(),
    }
  }
}

pub type EngineResult<T, E = EngineError> = std::result::Result<T, E>;
