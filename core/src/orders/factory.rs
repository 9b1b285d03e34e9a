// kab-orders/src/orders/factory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

use super::tracking::TrackingCodeSource;
use crate::error::{EngineError, EngineResult};
use crate::model::{Cart, Order};
use crate::store::{InsertOutcome, UnitOfWork};

/// Persists the order for a sealed cart under a fresh tracking code.
#[derive(Clone)]
pub struct OrderFactory {
  codes: Arc<dyn TrackingCodeSource>,
  max_attempts: u32,
}

impl OrderFactory {
  pub fn new(codes: Arc<dyn TrackingCodeSource>, max_attempts: u32) -> Self {
    Self {
      codes,
      max_attempts: max_attempts.max(1),
    }
  }

  /// Inserts the order, drawing a new code whenever the previous one was already taken.
  ///
  /// Collisions are resolved by the store's unique constraint; they never touch stock, so
  /// retrying here never re-runs a reservation.
  #[instrument(name = "OrderFactory::create_order", skip_all, fields(cart_id = %cart.id, total = %total))]
  pub async fn create_order(
    &self,
    uow: &mut dyn UnitOfWork,
    cart: &Cart,
    total: Decimal,
    now: DateTime<Utc>,
  ) -> EngineResult<Order> {
    for attempt in 1..=self.max_attempts {
      let order = Order {
        id: Uuid::new_v4(),
        tracking_code: self.codes.next_code(),
        cart_id: cart.id,
        user_id: cart.user_id,
        total_price: total,
        created_at: now,
      };
      match uow.insert_order(&order).await? {
        InsertOutcome::Inserted => {
          event!(Level::INFO, tracking_code = %order.tracking_code, attempt, "Order created.");
          return Ok(order);
        }
        InsertOutcome::Conflict => {
          event!(Level::WARN, tracking_code = %order.tracking_code, attempt, "Tracking code collision, drawing another.");
        }
      }
    }
    Err(EngineError::TrackingCodeExhausted {
      attempts: self.max_attempts,
    })
  }
}

impl std::fmt::Debug for OrderFactory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderFactory")
      .field("max_attempts", &self.max_attempts)
      .finish_non_exhaustive()
  }
}
