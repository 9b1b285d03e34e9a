// kab-server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use kab_orders::model::CartView;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddItemRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct SetQuantityRequestPayload {
  pub quantity: i32,
}

/// The pending cart with its running total.
#[derive(Serialize)]
struct CartResponse {
  #[serde(flatten)]
  cart: CartView,
  total_price: rust_decimal::Decimal,
}

impl From<CartView> for CartResponse {
  fn from(cart: CartView) -> Self {
    CartResponse {
      total_price: cart.total(),
      cart,
    }
  }
}

#[instrument(name = "handler::view_cart", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.engine.pending_cart(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_item_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddItemRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state
    .engine
    .add_item(auth_user.user_id, req_payload.product_id, req_payload.quantity)
    .await?;
  info!(lines = cart.lines.len(), "Item added to cart.");
  Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[instrument(name = "handler::set_cart_item", skip(app_state, req_payload, auth_user, path), fields(user_id = %auth_user.user_id, item_id = %path.as_ref()))]
pub async fn set_item_quantity_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetQuantityRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state
    .engine
    .set_item_quantity(auth_user.user_id, path.into_inner(), req_payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id, item_id = %path.as_ref()))]
pub async fn remove_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state
    .engine
    .remove_item(auth_user.user_id, path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
