// kab-server/src/web/routes.rs

use actix_web::{error, web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{analytics_handlers, cart_handlers, order_handlers, product_handlers, user_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies and query strings answer with the same `{"error": ...}` shape as everything else.
fn json_error(err: error::JsonPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

fn path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(json_error))
    .app_data(web::QueryConfig::default().error_handler(query_error))
    .app_data(web::PathConfig::default().error_handler(path_error))
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/users")
            .route("", web::post().to(user_handlers::register_user_handler))
            .route("/me", web::get().to(user_handlers::current_user_handler))
            .route("/me", web::patch().to(user_handlers::update_current_user_handler)),
        )
        .service(
          web::scope("/products")
            .route("", web::get().to(product_handlers::list_products_handler))
            .route("", web::post().to(product_handlers::create_product_handler))
            .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
            .route("/{product_id}", web::patch().to(product_handlers::update_product_handler))
            .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler))
            .route("/{product_id}/image", web::get().to(product_handlers::product_image_handler)),
        )
        .service(
          web::scope("/cart")
            .route("", web::get().to(cart_handlers::view_cart_handler))
            .route("/items", web::post().to(cart_handlers::add_item_handler))
            .route("/items/{item_id}", web::patch().to(cart_handlers::set_item_quantity_handler))
            .route("/items/{item_id}", web::delete().to(cart_handlers::remove_item_handler)),
        )
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::all_orders_handler))
            .route("/confirm", web::post().to(order_handlers::confirm_cart_handler))
            .route("/track", web::get().to(order_handlers::order_history_handler))
            .route("/track/{tracking_code}", web::get().to(order_handlers::track_order_handler)),
        )
        .service(
          web::scope("/analytics")
            .route("/best-worst", web::get().to(analytics_handlers::best_worst_handler))
            .route("/income", web::get().to(analytics_handlers::income_handler)),
        ),
    );
}
