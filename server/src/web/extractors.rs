// kab-server/src/web/extractors.rs

//! Caller identity as forwarded by the upstream gateway.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use kab_orders::model::UserRole;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Any caller carrying a valid `X-User-ID`. A missing `X-User-Role` means `GUEST`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: UserRole,
}

impl AuthenticatedUser {
  pub fn is_admin(&self) -> bool {
    self.role == UserRole::Admin
  }
}

/// A caller whose `X-User-Role` is `ADMIN`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthenticatedUser);

fn identify(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let user_id = req
    .headers()
    .get(USER_ID_HEADER)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| Uuid::parse_str(value.trim()).ok())
    .ok_or_else(|| {
      warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
      AppError::Auth("Missing or invalid X-User-ID header.".to_string())
    })?;

  let role = match req.headers().get(USER_ROLE_HEADER) {
    None => UserRole::Guest,
    Some(value) => match value.to_str().map(|s| s.trim().to_ascii_uppercase()) {
      Ok(role) if role == "ADMIN" => UserRole::Admin,
      Ok(role) if role == "GUEST" => UserRole::Guest,
      _ => return Err(AppError::Auth("Invalid X-User-Role header.".to_string())),
    },
  };

  Ok(AuthenticatedUser { user_id, role })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(identify(req))
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(identify(req).and_then(|user| {
      if user.is_admin() {
        Ok(AdminUser(user))
      } else {
        warn!(user_id = %user.user_id, "Admin route refused to a non-admin caller.");
        Err(AppError::Forbidden("Administrator role required.".to_string()))
      }
    }))
  }
}
