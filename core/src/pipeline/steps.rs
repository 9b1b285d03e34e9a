// kab-orders/src/pipeline/steps.rs

//! The five standard confirmation steps.

use async_trait::async_trait;
use tracing::{event, Level};

use super::context::{ConfirmCtx, ConfirmStage};
use super::control::StepControl;
use super::step::ConfirmStep;
use crate::carts;
use crate::error::{EngineError, EngineResult};
use crate::ledger;
use crate::orders::OrderFactory;
use crate::store::LinePrice;

/// Locks the caller's pending cart and snapshots its lines and total.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadPendingCart;

#[async_trait]
impl ConfirmStep for LoadPendingCart {
  fn name(&self) -> &str {
    "load_pending_cart"
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::Validating
  }

  async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    let view = carts::pending_cart(ctx.uow.as_mut(), ctx.user_id, true).await?;
    if view.is_empty() {
      return Err(EngineError::EmptyCart { cart_id: view.cart.id });
    }
    ctx.total = view.total();
    event!(Level::DEBUG, cart_id = %view.cart.id, lines = view.lines.len(), total = %ctx.total, "Pending cart loaded.");
    ctx.cart = Some(view);
    Ok(StepControl::Continue)
  }
}

/// Reserves every line in ascending product id order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReserveStock;

#[async_trait]
impl ConfirmStep for ReserveStock {
  fn name(&self) -> &str {
    "reserve_stock"
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::ReservingStock
  }

  async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    let mut wanted: Vec<_> = ctx.cart()?.lines.iter().map(|l| (l.product_id, l.quantity)).collect();
    wanted.sort_by_key(|(product_id, _)| *product_id);

    for (product_id, quantity) in wanted {
      ledger::reserve(ctx.uow.as_mut(), product_id, quantity).await?;
      ctx.reserved.push((product_id, quantity));
    }
    Ok(StepControl::Continue)
  }
}

/// Flips the cart to CONFIRMED and freezes each line's unit price.
#[derive(Debug, Clone, Copy, Default)]
pub struct SealCart;

#[async_trait]
impl ConfirmStep for SealCart {
  fn name(&self) -> &str {
    "seal_cart"
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::EmittingOrder
  }

  async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    let view = ctx.cart()?;
    let cart_id = view.cart.id;
    let prices: Vec<LinePrice> = view
      .lines
      .iter()
      .map(|line| LinePrice {
        item_id: line.item_id,
        unit_price: line.unit_price,
      })
      .collect();

    if !ctx.uow.seal_cart(cart_id, &prices, ctx.now).await? {
      return Err(EngineError::CartAlreadyConfirmed { cart_id });
    }
    Ok(StepControl::Continue)
  }
}

/// Writes the order row for the sealed cart.
#[derive(Debug, Clone)]
pub struct EmitOrder {
  factory: OrderFactory,
}

impl EmitOrder {
  pub fn new(factory: OrderFactory) -> Self {
    Self { factory }
  }
}

#[async_trait]
impl ConfirmStep for EmitOrder {
  fn name(&self) -> &str {
    "emit_order"
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::EmittingOrder
  }

  async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    let cart = ctx.cart()?.cart.clone();
    let order = self
      .factory
      .create_order(ctx.uow.as_mut(), &cart, ctx.total, ctx.now)
      .await?;
    ctx.order = Some(order);
    Ok(StepControl::Continue)
  }
}

/// Opens the user's next pending cart.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReopenCart;

#[async_trait]
impl ConfirmStep for ReopenCart {
  fn name(&self) -> &str {
    "reopen_cart"
  }

  fn stage(&self) -> ConfirmStage {
    ConfirmStage::ReopeningCart
  }

  async fn run(&self, ctx: &mut ConfirmCtx) -> EngineResult<StepControl> {
    let cart = carts::open_new_pending_cart(ctx.uow.as_mut(), ctx.user_id, ctx.now).await?;
    ctx.next_cart = Some(cart);
    Ok(StepControl::Continue)
  }
}
