// kab-orders/src/model/user.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
  Guest,
  Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: String,
  pub line_id: Option<String>,
  pub address: Option<String>,
  pub age: Option<i32>,
  pub birth_date: Option<NaiveDate>,
  pub role: UserRole,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

/// Registration input. The password arrives already hashed by the service layer.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: String,
  pub line_id: Option<String>,
  pub address: Option<String>,
  pub age: Option<i32>,
  pub birth_date: Option<NaiveDate>,
  pub role: UserRole,
}

impl NewUser {
  pub fn validate(&self) -> EngineResult<()> {
    if self.username.trim().is_empty() {
      return Err(EngineError::Validation("username is required".to_string()));
    }
    if self.password_hash.is_empty() {
      return Err(EngineError::Validation("password hash is required".to_string()));
    }
    if self.age.is_some_and(|age| age < 0) {
      return Err(EngineError::Validation("age must not be negative".to_string()));
    }
    Ok(())
  }

  pub fn into_user(self, id: Uuid, now: DateTime<Utc>) -> User {
    User {
      id,
      username: self.username.trim().to_string(),
      first_name: self.first_name,
      last_name: self.last_name,
      phone_number: self.phone_number,
      line_id: self.line_id,
      address: self.address,
      age: self.age,
      birth_date: self.birth_date,
      role: self.role,
      password_hash: self.password_hash,
      created_at: now,
    }
  }
}

/// Profile update; `None` leaves the field untouched. Username, role and password are not
/// editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub phone_number: Option<String>,
  pub line_id: Option<String>,
  pub address: Option<String>,
  pub age: Option<i32>,
  pub birth_date: Option<NaiveDate>,
}

impl UserPatch {
  pub fn validate(&self) -> EngineResult<()> {
    if self.age.is_some_and(|age| age < 0) {
      return Err(EngineError::Validation("age must not be negative".to_string()));
    }
    Ok(())
  }

  pub fn apply(self, user: &mut User) {
    if let Some(first_name) = self.first_name {
      user.first_name = first_name;
    }
    if let Some(last_name) = self.last_name {
      user.last_name = last_name;
    }
    if let Some(phone_number) = self.phone_number {
      user.phone_number = phone_number;
    }
    if let Some(line_id) = self.line_id {
      user.line_id = Some(line_id);
    }
    if let Some(address) = self.address {
      user.address = Some(address);
    }
    if let Some(age) = self.age {
      user.age = Some(age);
    }
    if let Some(birth_date) = self.birth_date {
      user.birth_date = Some(birth_date);
    }
  }
}
