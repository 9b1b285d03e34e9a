// kab-orders/src/pipeline/context.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::{event, Level};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{Cart, CartView, Confirmation, Order};
use crate::store::UnitOfWork;

/// Where a confirmation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmStage {
  PendingCart,
  Validating,
  ReservingStock,
  EmittingOrder,
  ReopeningCart,
  Confirmed,
  RolledBack,
}

impl fmt::Display for ConfirmStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ConfirmStage::PendingCart => "pending_cart",
      ConfirmStage::Validating => "validating",
      ConfirmStage::ReservingStock => "reserving_stock",
      ConfirmStage::EmittingOrder => "emitting_order",
      ConfirmStage::ReopeningCart => "reopening_cart",
      ConfirmStage::Confirmed => "confirmed",
      ConfirmStage::RolledBack => "rolled_back",
    };
    f.write_str(name)
  }
}

/// State shared by the steps of one confirmation.
pub struct ConfirmCtx {
  pub user_id: Uuid,
  /// Timestamp stamped on everything this confirmation writes.
  pub now: DateTime<Utc>,
  pub uow: Box<dyn UnitOfWork>,
  stage: ConfirmStage,
  /// Loaded by the validating step; line prices are the snapshot the total is built from.
  pub cart: Option<CartView>,
  pub total: Decimal,
  /// `(product_id, quantity)` for every successful reservation, in reservation order.
  pub reserved: Vec<(Uuid, i32)>,
  pub order: Option<Order>,
  pub next_cart: Option<Cart>,
}

impl ConfirmCtx {
  pub fn new(user_id: Uuid, now: DateTime<Utc>, uow: Box<dyn UnitOfWork>) -> Self {
    Self {
      user_id,
      now,
      uow,
      stage: ConfirmStage::PendingCart,
      cart: None,
      total: Decimal::ZERO,
      reserved: Vec::new(),
      order: None,
      next_cart: None,
    }
  }

  pub fn stage(&self) -> ConfirmStage {
    self.stage
  }

  pub fn transition(&mut self, next: ConfirmStage) {
    if next != self.stage {
      event!(Level::DEBUG, user_id = %self.user_id, from = %self.stage, to = %next, "Confirmation stage changed.");
      self.stage = next;
    }
  }

  /// The loaded cart, or an internal error if a step runs before the validating step.
  pub fn cart(&self) -> EngineResult<&CartView> {
    self
      .cart
      .as_ref()
      .ok_or_else(|| EngineError::Internal("pending cart has not been loaded".to_string()))
  }

  /// `true` once the order exists and the replacement cart is open.
  pub fn is_complete(&self) -> bool {
    self.order.is_some() && self.next_cart.is_some()
  }

  pub fn confirmation(&self) -> EngineResult<Confirmation> {
    match (&self.cart, &self.order, &self.next_cart) {
      (Some(cart), Some(order), Some(next_cart)) => Ok(Confirmation {
        order_id: order.id,
        tracking_code: order.tracking_code.clone(),
        total_price: order.total_price,
        confirmed_cart_id: cart.cart.id,
        next_cart_id: next_cart.id,
        created_at: order.created_at,
      }),
      _ => Err(EngineError::Internal(format!(
        "confirmation incomplete at stage {}",
        self.stage
      ))),
    }
  }
}

impl fmt::Debug for ConfirmCtx {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConfirmCtx")
      .field("user_id", &self.user_id)
      .field("stage", &self.stage)
      .field("total", &self.total)
      .field("reserved", &self.reserved)
      .finish_non_exhaustive()
  }
}
