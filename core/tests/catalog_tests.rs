// tests/catalog_tests.rs

mod common;

use chrono::Duration;
use common::{new_phone, Fixture};
use kab_orders::model::{Page, ProductPatch};
use kab_orders::EngineError;
use rust_decimal_macros::dec;

#[tokio::test]
async fn create_update_and_soft_delete() {
  let fx = Fixture::new();
  let phone = fx.phone("Nova", 199, 3).await;
  assert_eq!(fx.engine.product(phone.id).await.unwrap().model_name, "Nova");

  fx.clock.advance(Duration::minutes(5));
  let updated = fx
    .engine
    .update_product(
      phone.id,
      ProductPatch {
        price: Some(dec!(149.50)),
        os: Some("iOS".into()),
        ..ProductPatch::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(updated.price, dec!(149.50));
  assert_eq!(updated.os, "iOS");
  assert_eq!(updated.stock, 3);
  assert!(updated.updated_at > updated.created_at);

  fx.engine.delete_product(phone.id).await.unwrap();
  assert!(matches!(
    fx.engine.product(phone.id).await,
    Err(EngineError::ProductNotFound { .. })
  ));
  assert!(matches!(
    fx.engine.delete_product(phone.id).await,
    Err(EngineError::ProductNotFound { .. })
  ));
  assert!(matches!(
    fx.engine.update_product(phone.id, ProductPatch::default()).await,
    Err(EngineError::ProductNotFound { .. })
  ));
}

#[tokio::test]
async fn negative_price_or_stock_is_rejected() {
  let fx = Fixture::new();
  assert!(matches!(
    fx.engine.create_product(new_phone("Kab", "Bad", -1, 1)).await,
    Err(EngineError::Validation(_))
  ));
  assert!(matches!(
    fx.engine.create_product(new_phone("Kab", "Bad", 1, -1)).await,
    Err(EngineError::Validation(_))
  ));

  let phone = fx.phone("Good", 10, 1).await;
  assert!(matches!(
    fx.engine
      .update_product(
        phone.id,
        ProductPatch {
          stock: Some(-5),
          ..ProductPatch::default()
        }
      )
      .await,
    Err(EngineError::Validation(_))
  ));
  assert_eq!(fx.stock_of(phone.id).await, 1);
}

#[tokio::test]
async fn listing_searches_and_paginates_newest_first() {
  let fx = Fixture::new();
  for model in ["Galaxy S", "Galaxy A", "Pixel", "Galaxy Z"] {
    fx.engine.create_product(new_phone("Samsung", model, 100, 1)).await.unwrap();
    fx.clock.advance(Duration::seconds(1));
  }
  let hidden = fx.phone("Galaxy Old", 1, 1).await;
  fx.engine.delete_product(hidden.id).await.unwrap();

  let galaxies = fx
    .engine
    .list_products(&Page {
      search: Some("  GALAXY ".into()),
      ..Page::default()
    })
    .await
    .unwrap();
  let names: Vec<_> = galaxies.iter().map(|p| p.model_name.as_str()).collect();
  assert_eq!(names, ["Galaxy Z", "Galaxy A", "Galaxy S"]);

  let second_page = fx
    .engine
    .list_products(&Page {
      page: 1,
      page_size: Some(2),
      search: None,
    })
    .await
    .unwrap();
  let names: Vec<_> = second_page.iter().map(|p| p.model_name.as_str()).collect();
  assert_eq!(names, ["Galaxy A", "Galaxy S"]);
}

#[tokio::test]
async fn order_lookup_and_history() {
  let fx = Fixture::new();
  let alice = fx.user("alice").await;
  let bob = fx.user("bob").await;
  let phone = fx.phone("Track", 10, 10).await;

  fx.engine.add_item(alice.id, phone.id, 1).await.unwrap();
  let a1 = fx.engine.confirm_cart(alice.id).await.unwrap();
  fx.clock.advance(Duration::seconds(1));
  fx.engine.add_item(bob.id, phone.id, 2).await.unwrap();
  let b1 = fx.engine.confirm_cart(bob.id).await.unwrap();

  let alice_orders = fx.engine.orders_for_user(alice.id, Page::default()).await.unwrap();
  assert_eq!(alice_orders.len(), 1);
  assert_eq!(alice_orders[0].tracking_code, a1.tracking_code);

  let search = Page {
    search: Some(b1.tracking_code[3..9].to_lowercase()),
    ..Page::default()
  };
  let found = fx.engine.orders_for_user(bob.id, search.clone()).await.unwrap();
  assert_eq!(found.len(), 1);
  assert!(fx.engine.orders_for_user(alice.id, search).await.unwrap().len() <= 1);

  let all = fx.engine.all_orders(Page::default()).await.unwrap();
  let codes: Vec<_> = all.iter().map(|o| o.tracking_code.clone()).collect();
  assert_eq!(codes, [b1.tracking_code.clone(), a1.tracking_code.clone()]);

  let details = fx.engine.order_by_tracking_code(&b1.tracking_code).await.unwrap();
  assert_eq!(details.order.total_price, dec!(20));

  assert!(matches!(
    fx.engine.order_by_tracking_code("TH-0000000000").await,
    Err(EngineError::OrderNotFound { .. })
  ));
}

#[tokio::test]
async fn deleted_products_stay_visible_in_order_history() {
  let fx = Fixture::new();
  let user = fx.user("historian").await;
  let phone = fx.phone("Vintage", 75, 2).await;

  fx.engine.add_item(user.id, phone.id, 2).await.unwrap();
  let confirmation = fx.engine.confirm_cart(user.id).await.unwrap();
  fx.engine.delete_product(phone.id).await.unwrap();

  let details = fx.engine.order_by_tracking_code(&confirmation.tracking_code).await.unwrap();
  assert_eq!(details.lines.len(), 1);
  assert_eq!(details.lines[0].model_name, "Vintage");
  assert_eq!(details.lines[0].unit_price, dec!(75));
}

#[tokio::test]
async fn product_image_bytes_are_served_back() {
  let fx = Fixture::new();
  let mut with_image = new_phone("Kab", "Pictured", 10, 1);
  with_image.image = Some(vec![0xFF, 0xD8, 0xFF, 0xE0]);
  let pictured = fx.engine.create_product(with_image).await.unwrap();
  let plain = fx.phone("Plain", 10, 1).await;

  assert_eq!(
    fx.engine.product_image(pictured.id).await.unwrap(),
    Some(vec![0xFF, 0xD8, 0xFF, 0xE0])
  );
  assert_eq!(fx.engine.product_image(plain.id).await.unwrap(), None);

  fx.engine
    .update_product(
      plain.id,
      ProductPatch {
        image: Some(vec![1, 2, 3]),
        ..ProductPatch::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(fx.engine.product_image(plain.id).await.unwrap(), Some(vec![1, 2, 3]));

  fx.engine.delete_product(pictured.id).await.unwrap();
  assert!(matches!(
    fx.engine.product_image(pictured.id).await,
    Err(EngineError::ProductNotFound { .. })
  ));
}
