// kab-server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use kab_orders::model::Page;
use kab_orders::EngineError;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};

#[instrument(name = "handler::confirm_cart", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn confirm_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  match app_state.engine.confirm_cart(auth_user.user_id).await {
    Ok(confirmation) => {
      info!(tracking_code = %confirmation.tracking_code, "Order confirmed.");
      Ok(HttpResponse::Created().json(confirmation))
    }
    Err(engine_err) => {
      warn!(error = %engine_err, business = engine_err.is_business(), "Confirmation refused.");
      Err(engine_err.into())
    }
  }
}

/// Guests only see their own orders; anyone else's tracking code looks unknown.
#[instrument(name = "handler::track_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let tracking_code = path.into_inner();
  let details = app_state.engine.order_by_tracking_code(&tracking_code).await?;
  if details.order.user_id != auth_user.user_id && !auth_user.is_admin() {
    return Err(EngineError::OrderNotFound { tracking_code }.into());
  }
  Ok(HttpResponse::Ok().json(details))
}

/// `?page=0&page_size=20&search=TH-12`
#[instrument(name = "handler::order_history", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn order_history_handler(
  app_state: web::Data<AppState>,
  query: web::Query<Page>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state
    .engine
    .orders_for_user(auth_user.user_id, query.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::all_orders", skip(app_state, _admin))]
pub async fn all_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<Page>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.engine.all_orders(query.into_inner()).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[cfg(test)]
mod tests {
  use actix_web::http::StatusCode;
  use actix_web::test;
  use serde_json::{json, Value};

  use crate::web::test_support::{test_app, TestApp, ADMIN};

  #[actix_web::test]
  async fn confirming_returns_a_tracking_code_and_opens_a_new_cart() {
    let fx = TestApp::new();
    let user = fx.user("buyer").await;
    let phone = fx.phone("A", 100, 5).await;
    fx.state.engine.add_item(user.id, phone.id, 2).await.unwrap();
    let app = test::init_service(test_app(fx.state.clone())).await;
    let uid = user.id.to_string();

    let resp = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/orders/confirm")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let confirmation: Value = test::read_body_json(resp).await;
    let code = confirmation["tracking_code"].as_str().unwrap().to_string();
    assert!(code.starts_with("TH-"));
    assert_eq!(confirmation["total_price"], "200");
    assert_eq!(fx.state.engine.product(phone.id).await.unwrap().stock, 3);

    let cart: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/cart")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(cart["id"], confirmation["next_cart_id"]);
    assert_eq!(cart["lines"], json!([]));

    let again = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/orders/confirm")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    let details: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri(&format!("/api/v1/orders/track/{code}"))
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(details["lines"][0]["quantity"], 2);

    let history: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/orders/track")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
  }

  #[actix_web::test]
  async fn insufficient_stock_is_a_conflict_and_nothing_changes() {
    let fx = TestApp::new();
    let first = fx.user("first").await;
    let second = fx.user("second").await;
    let phone = fx.phone("B", 150, 5).await;
    fx.state.engine.add_item(first.id, phone.id, 3).await.unwrap();
    fx.state.engine.add_item(second.id, phone.id, 3).await.unwrap();
    let app = test::init_service(test_app(fx.state.clone())).await;

    let ok = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/orders/confirm")
        .insert_header(("X-User-ID", first.id.to_string()))
        .to_request(),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::CREATED);

    let refused = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/orders/confirm")
        .insert_header(("X-User-ID", second.id.to_string()))
        .to_request(),
    )
    .await;
    assert_eq!(refused.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(refused).await;
    assert_eq!(body["available"], 2);
    assert_eq!(fx.store.order_count().await, 1);
  }

  #[actix_web::test]
  async fn other_users_orders_are_hidden_from_guests_but_not_admins() {
    let fx = TestApp::new();
    let owner = fx.user("owner").await;
    let snoop = fx.user("snoop").await;
    let phone = fx.phone("C", 10, 5).await;
    fx.state.engine.add_item(owner.id, phone.id, 1).await.unwrap();
    let code = fx.state.engine.confirm_cart(owner.id).await.unwrap().tracking_code;
    let app = test::init_service(test_app(fx.state.clone())).await;

    let hidden = test::call_service(
      &app,
      test::TestRequest::get()
        .uri(&format!("/api/v1/orders/track/{code}"))
        .insert_header(("X-User-ID", snoop.id.to_string()))
        .to_request(),
    )
    .await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let as_admin = test::call_service(
      &app,
      test::TestRequest::get()
        .uri(&format!("/api/v1/orders/track/{code}"))
        .insert_header(("X-User-ID", snoop.id.to_string()))
        .insert_header(ADMIN)
        .to_request(),
    )
    .await;
    assert_eq!(as_admin.status(), StatusCode::OK);

    let guest_listing = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/orders")
        .insert_header(("X-User-ID", snoop.id.to_string()))
        .to_request(),
    )
    .await;
    assert_eq!(guest_listing.status(), StatusCode::FORBIDDEN);

    let all: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/orders")
        .insert_header(("X-User-ID", snoop.id.to_string()))
        .insert_header(ADMIN)
        .to_request(),
    )
    .await;
    assert_eq!(all[0]["tracking_code"], json!(code));
  }
}
