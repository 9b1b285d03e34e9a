// kab-server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use kab_orders::model::{NewProduct, Page, ProductPatch};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

/// `?page=0&page_size=20&search=galaxy`
#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<Page>,
) -> Result<HttpResponse, AppError> {
  let products = app_state.engine.list_products(&query).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.engine.product(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

/// Raw image bytes. Catalog images are stored as JPEG.
#[instrument(name = "handler::product_image", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn product_image_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let image = app_state
    .engine
    .product_image(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {product_id} has no image.")))?;
  Ok(HttpResponse::Ok().content_type("image/jpeg").body(image))
}

#[instrument(name = "handler::create_product", skip_all, fields(admin_id = %admin.0.user_id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.engine.create_product(req_payload.into_inner()).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(app_state, admin, req_payload, path), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductPatch>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .engine
    .update_product(path.into_inner(), req_payload.into_inner())
    .await?;
  info!(admin_id = %admin.0.user_id, "Product updated.");
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(app_state, admin, path), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  app_state.engine.delete_product(path.into_inner()).await?;
  info!(admin_id = %admin.0.user_id, "Product deleted.");
  Ok(HttpResponse::NoContent().finish())
}
