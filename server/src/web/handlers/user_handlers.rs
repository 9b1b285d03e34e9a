// kab-server/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use kab_orders::model::{NewUser, UserPatch, UserRole};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct RegisterRequestPayload {
  pub username: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: String,
  #[serde(default)]
  pub line_id: Option<String>,
  #[serde(default)]
  pub address: Option<String>,
  #[serde(default)]
  pub age: Option<i32>,
  #[serde(default)]
  pub birth_date: Option<NaiveDate>,
}

/// Self-service registration always creates a `GUEST`.
#[instrument(name = "handler::register_user", skip_all, fields(username = %req_payload.username))]
pub async fn register_user_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let password_hash = auth_service::hash_password(&payload.password)?;

  let user = app_state
    .engine
    .register_user(NewUser {
      username: payload.username,
      password_hash,
      first_name: payload.first_name,
      last_name: payload.last_name,
      phone_number: payload.phone_number,
      line_id: payload.line_id,
      address: payload.address,
      age: payload.age,
      birth_date: payload.birth_date,
      role: UserRole::Guest,
    })
    .await?;

  info!(user_id = %user.id, "User registered through the API.");
  Ok(HttpResponse::Created().json(user))
}

#[instrument(name = "handler::current_user", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn current_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .engine
    .user(auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", auth_user.user_id)))?;
  Ok(HttpResponse::Ok().json(user))
}

/// Profile edit for the calling user. Username, role and password are not editable.
#[instrument(name = "handler::update_current_user", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn update_current_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<UserPatch>,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .engine
    .update_user(auth_user.user_id, req_payload.into_inner())
    .await?;
  info!("Profile updated through the API.");
  Ok(HttpResponse::Ok().json(user))
}
