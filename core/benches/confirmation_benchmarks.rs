use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kab_orders::model::{NewProduct, NewUser, UserRole};
use kab_orders::{Engine, MemoryStore, RandomTrackingCodes};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use uuid::Uuid;

fn bench_user(i: usize) -> NewUser {
  NewUser {
    username: format!("bench_{i}"),
    password_hash: "hash".to_string(),
    first_name: "Bench".to_string(),
    last_name: "User".to_string(),
    phone_number: "0800000000".to_string(),
    line_id: None,
    address: None,
    age: None,
    birth_date: None,
    role: UserRole::Guest,
  }
}

fn bench_phone(i: usize) -> NewProduct {
  NewProduct {
    brand_name: "Bench".to_string(),
    model_name: format!("Model {i}"),
    os: "Android".to_string(),
    price: Decimal::new(19_999, 2),
    stock: 1_000_000,
    image: None,
  }
}

/// An engine with one user whose pending cart holds `lines` distinct products.
async fn engine_with_cart(lines: usize) -> (Arc<Engine>, Uuid) {
  let store = Arc::new(MemoryStore::new());
  let engine = Engine::builder(store)
    .tracking_codes(Arc::new(RandomTrackingCodes::seeded("TH-", 10, 42)))
    .build()
    .unwrap();
  let user = engine.register_user(bench_user(0)).await.unwrap();
  for i in 0..lines {
    let product = engine.create_product(bench_phone(i)).await.unwrap();
    engine.add_item(user.id, product.id, 1).await.unwrap();
  }
  (Arc::new(engine), user.id)
}

/// `buyers` users, each with one unit of the same product in their cart.
async fn engine_with_buyers(buyers: usize) -> (Arc<Engine>, Vec<Uuid>) {
  let engine = Engine::new(Arc::new(MemoryStore::new())).unwrap();
  let product = engine.create_product(bench_phone(0)).await.unwrap();
  let mut users = Vec::with_capacity(buyers);
  for i in 0..buyers {
    let user = engine.register_user(bench_user(i)).await.unwrap();
    engine.add_item(user.id, product.id, 1).await.unwrap();
    users.push(user.id);
  }
  (Arc::new(engine), users)
}

fn bench_confirm_cart(c: &mut Criterion) {
  let mut group = c.benchmark_group("ConfirmCart");
  let rt = Runtime::new().unwrap();

  for lines in [1usize, 5, 20] {
    group.throughput(Throughput::Elements(lines as u64));
    group.bench_with_input(BenchmarkId::from_parameter(format!("{lines}lines")), &lines, |b, &lines| {
      // Setup runs inside the timed closure, so only the confirmation itself is measured.
      b.to_async(&rt).iter_custom(|iters| async move {
        let mut elapsed = Duration::ZERO;
        for _ in 0..iters {
          let (engine, user_id) = engine_with_cart(lines).await;
          let start = Instant::now();
          criterion::black_box(engine.confirm_cart(user_id).await.unwrap());
          elapsed += start.elapsed();
        }
        elapsed
      });
    });
  }
  group.finish();
}

fn bench_contended_confirmations(c: &mut Criterion) {
  let mut group = c.benchmark_group("ContendedConfirmations");
  let rt = Runtime::new().unwrap();

  for buyers in [4usize, 16] {
    group.throughput(Throughput::Elements(buyers as u64));
    group.bench_with_input(BenchmarkId::from_parameter(buyers), &buyers, |b, &buyers| {
      b.to_async(&rt).iter_custom(|iters| async move {
        let mut elapsed = Duration::ZERO;
        for _ in 0..iters {
          let (engine, users) = engine_with_buyers(buyers).await;
          let start = Instant::now();
          let handles: Vec<_> = users
            .into_iter()
            .map(|user_id| {
              let engine = engine.clone();
              tokio::spawn(async move { engine.confirm_cart(user_id).await })
            })
            .collect();
          for handle in handles {
            criterion::black_box(handle.await.unwrap().unwrap());
          }
          elapsed += start.elapsed();
        }
        elapsed
      });
    });
  }
  group.finish();
}

fn bench_sales_report(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let (engine, user_id) = rt.block_on(engine_with_cart(10));
  rt.block_on(async {
    for _ in 0..50 {
      engine.confirm_cart(user_id).await.unwrap();
      let view = engine.pending_cart(user_id).await.unwrap();
      // Refill the fresh cart from the catalog.
      if view.is_empty() {
        for product in engine.list_products(&Default::default()).await.unwrap() {
          engine.add_item(user_id, product.id, 1).await.unwrap();
        }
      }
    }
  });

  c.bench_function("SalesReport/all_windows", |b| {
    b.to_async(&rt).iter(|| async {
      criterion::black_box(engine.sales_report().await);
    });
  });
}

criterion_group!(
  benches,
  bench_confirm_cart,
  bench_contended_confirmations,
  bench_sales_report
);
criterion_main!(benches);
