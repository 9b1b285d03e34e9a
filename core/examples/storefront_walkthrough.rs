// kab-orders/examples/storefront_walkthrough.rs

use kab_orders::model::{NewProduct, NewUser, UserRole};
use kab_orders::{Engine, EngineError, EngineResult, MemoryStore, Window};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

fn customer(username: &str) -> NewUser {
  NewUser {
    username: username.to_string(),
    password_hash: "precomputed-argon2-hash".to_string(),
    first_name: username.to_string(),
    last_name: "Demo".to_string(),
    phone_number: "0812345678".to_string(),
    line_id: Some(format!("@{username}")),
    address: Some("Chiang Mai".to_string()),
    age: Some(28),
    birth_date: None,
    role: UserRole::Guest,
  }
}

#[tokio::main]
async fn main() -> EngineResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Storefront Walkthrough ---");

  let engine = Engine::new(Arc::new(MemoryStore::new()))?;

  let phone = engine
    .create_product(NewProduct {
      brand_name: "Kab".to_string(),
      model_name: "One".to_string(),
      os: "Android".to_string(),
      price: Decimal::new(12_900, 0),
      stock: 5,
      image: None,
    })
    .await?;
  info!(product_id = %phone.id, stock = phone.stock, "Catalog seeded.");

  let alice = engine.register_user(customer("alice")).await?;
  let bob = engine.register_user(customer("bob")).await?;

  engine.add_item(alice.id, phone.id, 2).await?;
  let confirmation = engine.confirm_cart(alice.id).await?;
  info!(
    tracking_code = %confirmation.tracking_code,
    total = %confirmation.total_price,
    "Alice confirmed her cart."
  );

  // Bob and Alice both put the last three units in their carts; Alice confirms first.
  engine.add_item(bob.id, phone.id, 3).await?;
  engine.add_item(alice.id, phone.id, 3).await?;
  engine.confirm_cart(alice.id).await?;
  match engine.confirm_cart(bob.id).await {
    Err(EngineError::InsufficientStock {
      requested, available, ..
    }) => warn!(requested, available, "Bob's confirmation was refused."),
    other => info!(?other, "Unexpected outcome for Bob."),
  }

  let extremes = engine.sales_extremes(Window::Day).await?;
  let income = engine.total_income(Window::Day).await?;
  info!(?extremes, %income, "Today's sales.");

  Ok(())
}
