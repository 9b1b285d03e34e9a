// kab-server/src/web/handlers/analytics_handlers.rs

use actix_web::{web, HttpResponse};
use kab_orders::{TimeRange, Window, WindowReport};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};

/// `?window=day|week|month|year`; omitted means every window.
#[derive(Deserialize, Debug)]
pub struct WindowQuery {
  pub window: Option<Window>,
}

/// One window of a report. A failed window carries `error` instead of `result`.
#[derive(Serialize)]
struct WindowEntry<T: Serialize> {
  window: Window,
  range: TimeRange,
  #[serde(skip_serializing_if = "Option::is_none")]
  result: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
}

impl<T: Serialize> From<WindowReport<T>> for WindowEntry<T> {
  fn from(report: WindowReport<T>) -> Self {
    let (result, error) = match report.outcome {
      Ok(value) => (Some(value), None),
      Err(err) => (None, Some(err.to_string())),
    };
    WindowEntry {
      window: report.window,
      range: report.range,
      result,
      error,
    }
  }
}

#[instrument(name = "handler::best_worst", skip(app_state, _auth_user))]
pub async fn best_worst_handler(
  app_state: web::Data<AppState>,
  query: web::Query<WindowQuery>,
  _auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let engine = &app_state.engine;
  match query.window {
    Some(window) => Ok(HttpResponse::Ok().json(engine.sales_extremes(window).await?)),
    None => {
      let report: Vec<_> = engine.sales_report().await.into_iter().map(WindowEntry::from).collect();
      Ok(HttpResponse::Ok().json(report))
    }
  }
}

#[instrument(name = "handler::income", skip(app_state, _admin))]
pub async fn income_handler(
  app_state: web::Data<AppState>,
  query: web::Query<WindowQuery>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let engine = &app_state.engine;
  match query.window {
    Some(window) => {
      let total = engine.total_income(window).await?;
      Ok(HttpResponse::Ok().json(serde_json::json!({ "window": window, "total_income": total })))
    }
    None => {
      let report: Vec<_> = engine.income_report().await.into_iter().map(WindowEntry::from).collect();
      Ok(HttpResponse::Ok().json(report))
    }
  }
}

#[cfg(test)]
mod tests {
  use actix_web::http::StatusCode;
  use actix_web::test;
  use serde_json::{json, Value};

  use crate::web::test_support::{test_app, TestApp, ADMIN};

  #[actix_web::test]
  async fn todays_sales_show_up_in_every_window() {
    let fx = TestApp::new();
    let user = fx.user("analyst").await;
    let hot = fx.phone("Hot", 50, 20).await;
    let cold = fx.phone("Cold", 80, 20).await;
    fx.state.engine.add_item(user.id, hot.id, 4).await.unwrap();
    fx.state.engine.add_item(user.id, cold.id, 1).await.unwrap();
    fx.state.engine.confirm_cart(user.id).await.unwrap();
    let app = test::init_service(test_app(fx.state.clone())).await;
    let uid = user.id.to_string();

    let day: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/analytics/best-worst?window=day")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(day["best"]["product_id"], json!(hot.id));
    assert_eq!(day["best"]["units"], 4);
    assert_eq!(day["worst"]["product_id"], json!(cold.id));

    let report: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/analytics/income")
        .insert_header(("X-User-ID", uid.as_str()))
        .insert_header(ADMIN)
        .to_request(),
    )
    .await;
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["window"], "day");
    for entry in entries {
      assert_eq!(entry["result"], "280");
    }
  }

  #[actix_web::test]
  async fn income_is_admin_only_and_windows_are_validated() {
    let fx = TestApp::new();
    let user = fx.user("curious").await;
    let app = test::init_service(test_app(fx.state.clone())).await;
    let uid = user.id.to_string();

    let forbidden = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/analytics/income?window=week")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let bad_window = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/analytics/best-worst?window=decade")
        .insert_header(("X-User-ID", uid.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(bad_window.status(), StatusCode::BAD_REQUEST);

    let empty: Value = test::call_and_read_body_json(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/analytics/income?window=week")
        .insert_header(("X-User-ID", uid.as_str()))
        .insert_header(ADMIN)
        .to_request(),
    )
    .await;
    assert_eq!(empty["total_income"], "0");
  }
}
