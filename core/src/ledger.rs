// kab-orders/src/ledger.rs

//! Stock ledger: the only code that moves `products.stock` during a confirmation.
//!
//! A reservation is one conditional decrement at the storage layer. There is no window
//! between checking availability and taking it, so concurrent reservations against the
//! same product can never jointly exceed what was available.

use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::store::{ReserveOutcome, UnitOfWork};

/// Takes `quantity` units of `product_id`, returning the stock left afterwards.
///
/// On failure nothing was decremented; the caller is expected to abandon its unit of work.
#[instrument(name = "ledger::reserve", skip(uow), level = "debug")]
pub async fn reserve(uow: &mut dyn UnitOfWork, product_id: Uuid, quantity: i32) -> EngineResult<i32> {
  if quantity <= 0 {
    return Err(EngineError::InvalidQuantity { quantity });
  }
  match uow.reserve_stock(product_id, quantity).await? {
    ReserveOutcome::Reserved { remaining } => {
      event!(Level::DEBUG, remaining, "Stock reserved.");
      Ok(remaining)
    }
    ReserveOutcome::Insufficient { available } => {
      event!(Level::INFO, available, "Reservation refused: insufficient stock.");
      Err(EngineError::InsufficientStock {
        product_id,
        requested: quantity,
        available,
      })
    }
    ReserveOutcome::Missing => Err(EngineError::ProductNotFound { product_id }),
  }
}

/// Compensating increment for a reservation made earlier in the same unit of work.
///
/// Only needed by stores that cannot roll a decrement back themselves. Releasing
/// against a soft-deleted product still restores its stock.
#[instrument(name = "ledger::release", skip(uow), level = "debug")]
pub async fn release(uow: &mut dyn UnitOfWork, product_id: Uuid, quantity: i32) -> EngineResult<()> {
  if quantity <= 0 {
    return Err(EngineError::InvalidQuantity { quantity });
  }
  if !uow.release_stock(product_id, quantity).await? {
    return Err(EngineError::ProductNotFound { product_id });
  }
  event!(Level::DEBUG, "Stock released.");
  Ok(())
}
