// kab-server/src/web/test_support.rs

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web as actix_data, App};
use kab_orders::model::{NewProduct, NewUser, Product, User, UserRole};
use kab_orders::{Engine, MemoryStore};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;
use crate::web::configure_app_routes;

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
}

impl TestApp {
  pub fn new() -> Self {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone()).expect("default engine config is valid");
    TestApp {
      state: AppState {
        engine: Arc::new(engine),
      },
      store,
    }
  }

  pub async fn user(&self, username: &str) -> User {
    self
      .state
      .engine
      .register_user(NewUser {
        username: username.to_string(),
        password_hash: "$argon2id$test".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone_number: "0800000000".to_string(),
        line_id: None,
        address: None,
        age: None,
        birth_date: None,
        role: UserRole::Guest,
      })
      .await
      .expect("user registers")
  }

  pub async fn phone(&self, model: &str, price: i64, stock: i32) -> Product {
    self
      .state
      .engine
      .create_product(NewProduct {
        brand_name: "Kab".to_string(),
        model_name: model.to_string(),
        os: "Android".to_string(),
        price: Decimal::from(price),
        stock,
        image: None,
      })
      .await
      .expect("product is created")
  }
}

pub fn test_app(
  state: AppState,
) -> App<
  impl ServiceFactory<
    ServiceRequest,
    Config = (),
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
    InitError = (),
  >,
> {
  App::new()
    .app_data(actix_data::Data::new(state))
    .configure(configure_app_routes)
}

pub fn registration(username: &str) -> Value {
  json!({
    "username": username,
    "password": "s3cret-enough",
    "first_name": "Test",
    "last_name": "User",
    "phone_number": "0812345678",
  })
}

pub const ADMIN: (&str, &str) = ("X-User-Role", "ADMIN");
