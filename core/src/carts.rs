// kab-orders/src/carts.rs

//! Cart store: the per-user cart lifecycle and line-item edits.
//!
//! Every user owns exactly one PENDING cart. It is opened at registration and again right
//! after each confirmation, and it is the only cart whose items may change.

use chrono::{DateTime, Utc};
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{Cart, CartView, LineItem};
use crate::store::{InsertOutcome, UnitOfWork};

/// The user's pending cart with its lines. `lock` holds the cart row until the unit of
/// work ends, which is what confirmations do.
pub async fn pending_cart(uow: &mut dyn UnitOfWork, user_id: Uuid, lock: bool) -> EngineResult<CartView> {
  let cart = uow
    .pending_cart(user_id, lock)
    .await?
    .ok_or(EngineError::CartNotFound { user_id })?;
  load_view(uow, cart).await
}

#[instrument(name = "carts::open_new_pending_cart", skip(uow, now))]
pub async fn open_new_pending_cart(
  uow: &mut dyn UnitOfWork,
  user_id: Uuid,
  now: DateTime<Utc>,
) -> EngineResult<Cart> {
  if uow.pending_cart(user_id, false).await?.is_some() {
    return Err(EngineError::PendingCartExists { user_id });
  }
  let cart = Cart::new_pending(user_id, now);
  match uow.insert_cart(&cart).await? {
    InsertOutcome::Inserted => {
      event!(Level::DEBUG, cart_id = %cart.id, "Pending cart opened.");
      Ok(cart)
    }
    InsertOutcome::Conflict => Err(EngineError::PendingCartExists { user_id }),
  }
}

/// Adds `quantity` of a product to the user's pending cart, merging into an existing line
/// for the same product.
#[instrument(name = "carts::add_or_merge_item", skip(uow, now))]
pub async fn add_or_merge_item(
  uow: &mut dyn UnitOfWork,
  user_id: Uuid,
  product_id: Uuid,
  quantity: i32,
  now: DateTime<Utc>,
) -> EngineResult<CartView> {
  check_quantity(quantity)?;
  let cart = uow
    .pending_cart(user_id, true)
    .await?
    .ok_or(EngineError::CartNotFound { user_id })?;
  let product = uow
    .product(product_id, false)
    .await?
    .ok_or(EngineError::ProductNotFound { product_id })?;

  match uow.line_item_for_product(cart.id, product_id).await? {
    Some(existing) => {
      let merged = existing.quantity.saturating_add(quantity);
      check_stock(product_id, merged, product.stock)?;
      if !uow.set_line_quantity(existing.id, merged).await? {
        return Err(EngineError::CartImmutable { cart_id: cart.id });
      }
      event!(Level::DEBUG, item_id = %existing.id, quantity = merged, "Merged into existing line.");
    }
    None => {
      check_stock(product_id, quantity, product.stock)?;
      let item = LineItem {
        id: Uuid::new_v4(),
        cart_id: cart.id,
        product_id,
        quantity,
        unit_price: None,
        created_at: now,
      };
      uow.insert_line_item(&item).await?;
      event!(Level::DEBUG, item_id = %item.id, quantity, "Line added.");
    }
  }
  load_view(uow, cart).await
}

#[instrument(name = "carts::set_item_quantity", skip(uow))]
pub async fn set_item_quantity(
  uow: &mut dyn UnitOfWork,
  user_id: Uuid,
  item_id: Uuid,
  quantity: i32,
) -> EngineResult<CartView> {
  check_quantity(quantity)?;
  let (item, cart) = owned_item(uow, user_id, item_id).await?;
  let product = uow
    .product(item.product_id, false)
    .await?
    .ok_or(EngineError::ProductNotFound {
      product_id: item.product_id,
    })?;
  check_stock(item.product_id, quantity, product.stock)?;
  if !uow.set_line_quantity(item.id, quantity).await? {
    return Err(EngineError::CartImmutable { cart_id: cart.id });
  }
  load_view(uow, cart).await
}

#[instrument(name = "carts::remove_item", skip(uow))]
pub async fn remove_item(uow: &mut dyn UnitOfWork, user_id: Uuid, item_id: Uuid) -> EngineResult<CartView> {
  let (item, cart) = owned_item(uow, user_id, item_id).await?;
  if !uow.delete_line_item(item.id).await? {
    return Err(EngineError::CartImmutable { cart_id: cart.id });
  }
  load_view(uow, cart).await
}

/// Resolves an item the caller may edit and locks the pending cart it belongs to, so the
/// edit queues behind any confirmation of that cart. Items in someone else's cart look
/// missing; items in one of the caller's confirmed carts are immutable.
async fn owned_item(uow: &mut dyn UnitOfWork, user_id: Uuid, item_id: Uuid) -> EngineResult<(LineItem, Cart)> {
  let pending = uow.pending_cart(user_id, true).await?;
  // Read after the lock: a confirmation that just committed is visible now.
  let item = uow
    .line_item(item_id)
    .await?
    .ok_or(EngineError::LineItemNotFound { item_id })?;
  if let Some(cart) = pending.filter(|cart| cart.id == item.cart_id) {
    return Ok((item, cart));
  }
  match uow.cart(item.cart_id).await? {
    Some(cart) if cart.user_id == user_id => Err(EngineError::CartImmutable { cart_id: cart.id }),
    _ => Err(EngineError::LineItemNotFound { item_id }),
  }
}

async fn load_view(uow: &mut dyn UnitOfWork, cart: Cart) -> EngineResult<CartView> {
  let lines = uow.cart_lines(cart.id).await?;
  Ok(CartView { cart, lines })
}

fn check_quantity(quantity: i32) -> EngineResult<()> {
  if quantity <= 0 {
    return Err(EngineError::InvalidQuantity { quantity });
  }
  Ok(())
}

fn check_stock(product_id: Uuid, requested: i32, available: i32) -> EngineResult<()> {
  if requested > available {
    return Err(EngineError::InsufficientStock {
      product_id,
      requested,
      available,
    });
  }
  Ok(())
}
