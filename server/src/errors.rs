// kab-server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use kab_orders::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<EngineError>() {
      Ok(engine_err) => AppError::Engine(engine_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

fn engine_status(err: &EngineError) -> StatusCode {
  match err {
    EngineError::EmptyCart { .. } | EngineError::InvalidQuantity { .. } | EngineError::Validation(_) => {
      StatusCode::BAD_REQUEST
    }
    EngineError::CartNotFound { .. }
    | EngineError::LineItemNotFound { .. }
    | EngineError::UserNotFound { .. }
    | EngineError::ProductNotFound { .. }
    | EngineError::OrderNotFound { .. } => StatusCode::NOT_FOUND,
    EngineError::InsufficientStock { .. }
    | EngineError::CartImmutable { .. }
    | EngineError::CartAlreadyConfirmed { .. }
    | EngineError::PendingCartExists { .. }
    | EngineError::UsernameTaken { .. }
    | EngineError::TrackingCodeExhausted { .. } => StatusCode::CONFLICT,
    EngineError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
    EngineError::Database(_) | EngineError::Migration(_) | EngineError::Store { .. } | EngineError::Internal(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Engine(err) => engine_status(err),
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let body = match self {
      AppError::Engine(EngineError::InsufficientStock {
        product_id,
        requested,
        available,
      }) => json!({
        "error": self.to_string(),
        "product_id": product_id,
        "requested": requested,
        "available": available,
      }),
      // Store and engine failures keep their detail in the log only.
      AppError::Engine(err) if !err.is_business() => {
        tracing::error!(application_error = %self, "Responding with error");
        json!({"error": "An internal error occurred"})
      }
      AppError::Config(_) | AppError::Internal(_) => {
        tracing::error!(application_error = %self, "Responding with error");
        json!({"error": "An internal error occurred"})
      }
      _ => {
        tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
        json!({"error": self.to_string()})
      }
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use uuid::Uuid;

  #[test]
  fn business_errors_map_to_client_statuses() {
    let cases = [
      (EngineError::EmptyCart { cart_id: Uuid::nil() }, StatusCode::BAD_REQUEST),
      (EngineError::CartNotFound { user_id: Uuid::nil() }, StatusCode::NOT_FOUND),
      (
        EngineError::OrderNotFound {
          tracking_code: "TH-1".into(),
        },
        StatusCode::NOT_FOUND,
      ),
      (
        EngineError::InsufficientStock {
          product_id: Uuid::nil(),
          requested: 3,
          available: 2,
        },
        StatusCode::CONFLICT,
      ),
      (
        EngineError::UsernameTaken {
          username: "taken".into(),
        },
        StatusCode::CONFLICT,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(AppError::from(err).status_code(), status);
    }
  }

  #[test]
  fn fatal_errors_map_to_server_statuses() {
    let timeout = AppError::from(EngineError::Timeout {
      after: Duration::from_secs(1),
    });
    assert_eq!(timeout.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let internal = AppError::from(EngineError::Internal("boom".into()));
    assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      AppError::Auth("missing header".into()).status_code(),
      StatusCode::UNAUTHORIZED
    );
  }

  #[test]
  fn anyhow_keeps_wrapped_engine_errors() {
    let wrapped = anyhow::Error::new(EngineError::ProductNotFound {
      product_id: Uuid::nil(),
    });
    assert!(matches!(
      AppError::from(wrapped),
      AppError::Engine(EngineError::ProductNotFound { .. })
    ));
    assert!(matches!(
      AppError::from(anyhow::anyhow!("plain failure")),
      AppError::Internal(_)
    ));
  }
}
