// kab-orders/src/store/memory.rs

//! In-process store. Each unit of work holds the table lock from `begin` until it ends, so
//! transactions are fully serialized; writes go to a staged copy that `commit` publishes.
//!
//! Pool-level reads take the same lock. Unlike [`PgStore`](super::PgStore), catalog and
//! analytics queries here wait behind any open unit of work, including a confirmation, so
//! this store suits tests and single-process demos rather than concurrent traffic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{event, Level};
use uuid::Uuid;

use super::{InsertOutcome, LinePrice, ReserveOutcome, Store, UnitOfWork};
use crate::analytics::TimeRange;
use crate::error::{EngineError, EngineResult};
use crate::model::{
  Cart, CartLine, CartStatus, LineItem, Order, OrderDetails, OrderFilter, OrderLine, Page, Product,
  ProductSales, User,
};

#[derive(Debug, Clone, Default)]
struct Tables {
  users: HashMap<Uuid, User>,
  products: HashMap<Uuid, Product>,
  carts: HashMap<Uuid, Cart>,
  items: HashMap<Uuid, LineItem>,
  orders: HashMap<Uuid, Order>,
}

impl Tables {
  fn live_product(&self, product_id: Uuid) -> Option<&Product> {
    self.products.get(&product_id).filter(|p| !p.is_deleted())
  }

  /// The item exists and its cart is still PENDING.
  fn item_is_editable(&self, item_id: Uuid) -> bool {
    self
      .items
      .get(&item_id)
      .and_then(|item| self.carts.get(&item.cart_id))
      .is_some_and(Cart::is_pending)
  }

  fn lines_of(&self, cart: &Cart) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = self
      .items
      .values()
      .filter(|item| item.cart_id == cart.id)
      .filter_map(|item| {
        // Deleted products stay joinable: confirmed carts must keep their history.
        let product = self.products.get(&item.product_id)?;
        Some(CartLine {
          item_id: item.id,
          product_id: product.id,
          brand_name: product.brand_name.clone(),
          model_name: product.model_name.clone(),
          quantity: item.quantity,
          unit_price: item.unit_price.unwrap_or(product.price),
          available: product.stock,
        })
      })
      .collect();
    lines.sort_by_key(|line| (line.product_id, line.item_id));
    lines
  }

  /// Line items of confirmed carts whose order falls inside `range`.
  fn sold_items<'a>(&'a self, range: &'a TimeRange) -> impl Iterator<Item = &'a LineItem> + 'a {
    self
      .orders
      .values()
      .filter(move |order| range.contains(order.created_at))
      .filter(move |order| {
        self
          .carts
          .get(&order.cart_id)
          .is_some_and(|cart| cart.status == CartStatus::Confirmed)
      })
      .flat_map(move |order| self.items.values().filter(move |item| item.cart_id == order.cart_id))
  }
}

/// Shared handle; clones point at the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every cart the user has ever had, oldest first.
  pub async fn carts_of(&self, user_id: Uuid) -> Vec<Cart> {
    let tables = self.tables.lock().await;
    let mut carts: Vec<Cart> = tables.carts.values().filter(|c| c.user_id == user_id).cloned().collect();
    carts.sort_by_key(|c| (c.created_at, c.status == CartStatus::Pending));
    carts
  }

  pub async fn order_count(&self) -> usize {
    self.tables.lock().await.orders.len()
  }

  pub async fn line_item_count(&self) -> usize {
    self.tables.lock().await.items.len()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn begin(&self) -> EngineResult<Box<dyn UnitOfWork>> {
    let guard = self.tables.clone().lock_owned().await;
    let staged = guard.clone();
    event!(Level::TRACE, "Memory unit of work started.");
    Ok(Box::new(MemoryUnitOfWork {
      guard: Some(guard),
      staged,
    }))
  }

  async fn product(&self, product_id: Uuid) -> EngineResult<Option<Product>> {
    Ok(self.tables.lock().await.live_product(product_id).cloned())
  }

  async fn list_products(&self, page: &Page) -> EngineResult<Vec<Product>> {
    let tables = self.tables.lock().await;
    let needle = page.needle();
    let mut products: Vec<Product> = tables
      .products
      .values()
      .filter(|p| !p.is_deleted())
      .filter(|p| match &needle {
        Some(n) => format!("{} {}", p.brand_name, p.model_name).to_lowercase().contains(n),
        None => true,
      })
      .cloned()
      .collect();
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(paginate(products, page))
  }

  async fn user(&self, user_id: Uuid) -> EngineResult<Option<User>> {
    Ok(self.tables.lock().await.users.get(&user_id).cloned())
  }

  async fn order_details(&self, tracking_code: &str) -> EngineResult<Option<OrderDetails>> {
    let tables = self.tables.lock().await;
    let Some(order) = tables.orders.values().find(|o| o.tracking_code == tracking_code).cloned() else {
      return Ok(None);
    };
    let lines = match tables.carts.get(&order.cart_id) {
      Some(cart) => tables
        .lines_of(cart)
        .into_iter()
        .map(|line| OrderLine {
          product_id: line.product_id,
          brand_name: line.brand_name,
          model_name: line.model_name,
          quantity: line.quantity,
          unit_price: line.unit_price,
        })
        .collect(),
      None => Vec::new(),
    };
    Ok(Some(OrderDetails { order, lines }))
  }

  async fn list_orders(&self, filter: &OrderFilter) -> EngineResult<Vec<Order>> {
    let tables = self.tables.lock().await;
    let needle = filter.page.needle();
    let mut orders: Vec<Order> = tables
      .orders
      .values()
      .filter(|o| filter.user_id.map_or(true, |user_id| o.user_id == user_id))
      .filter(|o| match &needle {
        Some(n) => o.tracking_code.to_lowercase().contains(n),
        None => true,
      })
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(paginate(orders, &filter.page))
  }

  async fn product_sales(&self, range: &TimeRange) -> EngineResult<Vec<ProductSales>> {
    let tables = self.tables.lock().await;
    let mut units: HashMap<Uuid, i64> = HashMap::new();
    for item in tables.sold_items(range) {
      *units.entry(item.product_id).or_default() += i64::from(item.quantity);
    }
    let mut sales: Vec<ProductSales> = units
      .into_iter()
      .filter_map(|(product_id, units)| {
        let product = tables.products.get(&product_id)?;
        Some(ProductSales {
          product_id,
          brand_name: product.brand_name.clone(),
          model_name: product.model_name.clone(),
          units,
        })
      })
      .collect();
    sales.sort_by(|a, b| b.units.cmp(&a.units).then(a.product_id.cmp(&b.product_id)));
    Ok(sales)
  }

  async fn income(&self, range: &TimeRange) -> EngineResult<Decimal> {
    let tables = self.tables.lock().await;
    Ok(
      tables
        .sold_items(range)
        .map(|item| item.unit_price.unwrap_or_default() * Decimal::from(item.quantity))
        .sum(),
    )
  }
}

fn paginate<T>(rows: Vec<T>, page: &Page) -> Vec<T> {
  let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
  rows.into_iter().skip(offset).take(page.limit() as usize).collect()
}

pub struct MemoryUnitOfWork {
  guard: Option<OwnedMutexGuard<Tables>>,
  staged: Tables,
}

impl MemoryUnitOfWork {
  fn ensure_open(&self) -> EngineResult<()> {
    if self.guard.is_none() {
      return Err(EngineError::Internal("unit of work already finished".to_string()));
    }
    Ok(())
  }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
  async fn pending_cart(&mut self, user_id: Uuid, _lock: bool) -> EngineResult<Option<Cart>> {
    self.ensure_open()?;
    Ok(
      self
        .staged
        .carts
        .values()
        .find(|c| c.user_id == user_id && c.is_pending())
        .cloned(),
    )
  }

  async fn cart(&mut self, cart_id: Uuid) -> EngineResult<Option<Cart>> {
    self.ensure_open()?;
    Ok(self.staged.carts.get(&cart_id).cloned())
  }

  async fn cart_lines(&mut self, cart_id: Uuid) -> EngineResult<Vec<CartLine>> {
    self.ensure_open()?;
    Ok(match self.staged.carts.get(&cart_id) {
      Some(cart) => self.staged.lines_of(cart),
      None => Vec::new(),
    })
  }

  async fn insert_cart(&mut self, cart: &Cart) -> EngineResult<InsertOutcome> {
    self.ensure_open()?;
    let pending_exists = cart.is_pending()
      && self
        .staged
        .carts
        .values()
        .any(|c| c.user_id == cart.user_id && c.is_pending());
    if pending_exists || self.staged.carts.contains_key(&cart.id) {
      return Ok(InsertOutcome::Conflict);
    }
    self.staged.carts.insert(cart.id, cart.clone());
    Ok(InsertOutcome::Inserted)
  }

  async fn seal_cart(&mut self, cart_id: Uuid, prices: &[LinePrice], at: DateTime<Utc>) -> EngineResult<bool> {
    self.ensure_open()?;
    let Some(cart) = self.staged.carts.get_mut(&cart_id).filter(|c| c.is_pending()) else {
      return Ok(false);
    };
    cart.status = CartStatus::Confirmed;
    cart.updated_at = at;
    for price in prices {
      if let Some(item) = self.staged.items.get_mut(&price.item_id) {
        item.unit_price = Some(price.unit_price);
      }
    }
    Ok(true)
  }

  async fn line_item(&mut self, item_id: Uuid) -> EngineResult<Option<LineItem>> {
    self.ensure_open()?;
    Ok(self.staged.items.get(&item_id).cloned())
  }

  async fn line_item_for_product(&mut self, cart_id: Uuid, product_id: Uuid) -> EngineResult<Option<LineItem>> {
    self.ensure_open()?;
    Ok(
      self
        .staged
        .items
        .values()
        .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        .cloned(),
    )
  }

  async fn insert_line_item(&mut self, item: &LineItem) -> EngineResult<()> {
    self.ensure_open()?;
    self.staged.items.insert(item.id, item.clone());
    Ok(())
  }

  async fn set_line_quantity(&mut self, item_id: Uuid, quantity: i32) -> EngineResult<bool> {
    self.ensure_open()?;
    if !self.staged.item_is_editable(item_id) {
      return Ok(false);
    }
    if let Some(item) = self.staged.items.get_mut(&item_id) {
      item.quantity = quantity;
    }
    Ok(true)
  }

  async fn delete_line_item(&mut self, item_id: Uuid) -> EngineResult<bool> {
    self.ensure_open()?;
    if !self.staged.item_is_editable(item_id) {
      return Ok(false);
    }
    Ok(self.staged.items.remove(&item_id).is_some())
  }

  async fn product(&mut self, product_id: Uuid, _lock: bool) -> EngineResult<Option<Product>> {
    self.ensure_open()?;
    Ok(self.staged.live_product(product_id).cloned())
  }

  async fn insert_product(&mut self, product: &Product) -> EngineResult<()> {
    self.ensure_open()?;
    self.staged.products.insert(product.id, product.clone());
    Ok(())
  }

  async fn update_product(&mut self, product: &Product) -> EngineResult<()> {
    self.ensure_open()?;
    match self.staged.products.get_mut(&product.id) {
      Some(existing) => {
        *existing = product.clone();
        Ok(())
      }
      None => Err(EngineError::ProductNotFound { product_id: product.id }),
    }
  }

  async fn soft_delete_product(&mut self, product_id: Uuid, at: DateTime<Utc>) -> EngineResult<bool> {
    self.ensure_open()?;
    match self.staged.products.get_mut(&product_id).filter(|p| !p.is_deleted()) {
      Some(product) => {
        product.deleted_at = Some(at);
        product.updated_at = at;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn reserve_stock(&mut self, product_id: Uuid, quantity: i32) -> EngineResult<ReserveOutcome> {
    self.ensure_open()?;
    let Some(product) = self.staged.products.get_mut(&product_id).filter(|p| !p.is_deleted()) else {
      return Ok(ReserveOutcome::Missing);
    };
    if product.stock < quantity {
      return Ok(ReserveOutcome::Insufficient {
        available: product.stock,
      });
    }
    product.stock -= quantity;
    Ok(ReserveOutcome::Reserved {
      remaining: product.stock,
    })
  }

  async fn release_stock(&mut self, product_id: Uuid, quantity: i32) -> EngineResult<bool> {
    self.ensure_open()?;
    match self.staged.products.get_mut(&product_id) {
      Some(product) => {
        product.stock += quantity;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn insert_order(&mut self, order: &Order) -> EngineResult<InsertOutcome> {
    self.ensure_open()?;
    // Mirrors the unique indexes: only a tracking-code clash is retryable.
    if self.staged.orders.values().any(|o| o.cart_id == order.cart_id) {
      return Err(EngineError::Internal(format!(
        "cart {} already has an order",
        order.cart_id
      )));
    }
    if self.staged.orders.values().any(|o| o.tracking_code == order.tracking_code) {
      return Ok(InsertOutcome::Conflict);
    }
    self.staged.orders.insert(order.id, order.clone());
    Ok(InsertOutcome::Inserted)
  }

  async fn insert_user(&mut self, user: &User) -> EngineResult<InsertOutcome> {
    self.ensure_open()?;
    if self.staged.users.values().any(|u| u.username == user.username) {
      return Ok(InsertOutcome::Conflict);
    }
    self.staged.users.insert(user.id, user.clone());
    Ok(InsertOutcome::Inserted)
  }

  async fn user(&mut self, user_id: Uuid, _lock: bool) -> EngineResult<Option<User>> {
    self.ensure_open()?;
    Ok(self.staged.users.get(&user_id).cloned())
  }

  async fn update_user(&mut self, user: &User) -> EngineResult<()> {
    self.ensure_open()?;
    let existing = self
      .staged
      .users
      .get_mut(&user.id)
      .ok_or(EngineError::UserNotFound { user_id: user.id })?;
    *existing = User {
      username: existing.username.clone(),
      role: existing.role,
      password_hash: existing.password_hash.clone(),
      created_at: existing.created_at,
      ..user.clone()
    };
    Ok(())
  }

  async fn commit(&mut self) -> EngineResult<()> {
    let mut guard = self
      .guard
      .take()
      .ok_or_else(|| EngineError::Internal("unit of work already finished".to_string()))?;
    *guard = std::mem::take(&mut self.staged);
    event!(Level::TRACE, "Memory unit of work committed.");
    Ok(())
  }

  async fn rollback(&mut self) -> EngineResult<()> {
    if self.guard.take().is_some() {
      self.staged = Tables::default();
      event!(Level::TRACE, "Memory unit of work rolled back.");
    }
    Ok(())
  }
}
