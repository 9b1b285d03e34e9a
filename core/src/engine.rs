// kab-orders/src/engine.rs

//! `Engine`: the single in-process entry point the service layer talks to.

use chrono::{DateTime, Local, TimeZone};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::analytics::{self, SalesExtremes, Window, WindowReport};
use crate::carts;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{
  Confirmation, CartView, NewProduct, NewUser, Order, OrderDetails, OrderFilter, Page, Product, ProductPatch, User,
  UserPatch,
};
use crate::orders::{OrderFactory, RandomTrackingCodes, TrackingCodeSource};
use crate::pipeline::{ConfirmCtx, ConfirmStage, ConfirmationPipeline, PipelineOutcome};
use crate::store::{InsertOutcome, Store, UnitOfWork};

pub struct Engine {
  store: Arc<dyn Store>,
  clock: Arc<dyn Clock>,
  config: EngineConfig,
  pipeline: ConfirmationPipeline,
}

/// Assembles an [`Engine`]. Only the store is mandatory.
pub struct EngineBuilder {
  store: Arc<dyn Store>,
  clock: Option<Arc<dyn Clock>>,
  codes: Option<Arc<dyn TrackingCodeSource>>,
  config: EngineConfig,
}

impl EngineBuilder {
  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  pub fn tracking_codes(mut self, codes: Arc<dyn TrackingCodeSource>) -> Self {
    self.codes = Some(codes);
    self
  }

  pub fn config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn build(self) -> EngineResult<Engine> {
    self.config.validate()?;
    let codes = self
      .codes
      .unwrap_or_else(|| Arc::new(RandomTrackingCodes::from_config(&self.config)));
    let factory = OrderFactory::new(codes, self.config.max_tracking_attempts);
    Ok(Engine {
      store: self.store,
      clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
      pipeline: ConfirmationPipeline::standard(factory),
      config: self.config,
    })
  }
}

impl Engine {
  pub fn builder(store: Arc<dyn Store>) -> EngineBuilder {
    EngineBuilder {
      store,
      clock: None,
      codes: None,
      config: EngineConfig::default(),
    }
  }

  /// Engine with the system clock, random tracking codes and default configuration.
  pub fn new(store: Arc<dyn Store>) -> EngineResult<Self> {
    Self::builder(store).build()
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub fn pipeline(&self) -> &ConfirmationPipeline {
    &self.pipeline
  }

  /// For adding or removing confirmation steps before the engine is shared.
  pub fn pipeline_mut(&mut self) -> &mut ConfirmationPipeline {
    &mut self.pipeline
  }

  // --- Confirmation ---

  /// Converts the user's pending cart into an order in one unit of work.
  ///
  /// On any error nothing is persisted: stock, the cart and the order table are as they
  /// were before the call, and the cart is still pending.
  #[instrument(name = "Engine::confirm_cart", skip(self))]
  pub async fn confirm_cart(&self, user_id: Uuid) -> EngineResult<Confirmation> {
    match self.config.confirm_timeout() {
      Some(after) => match tokio::time::timeout(after, self.run_confirmation(user_id)).await {
        Ok(result) => result,
        Err(_) => {
          // The dropped future took its unit of work with it, which rolled it back.
          event!(Level::WARN, ?after, "Confirmation timed out.");
          Err(EngineError::Timeout { after })
        }
      },
      None => self.run_confirmation(user_id).await,
    }
  }

  async fn run_confirmation(&self, user_id: Uuid) -> EngineResult<Confirmation> {
    let uow = self.store.begin().await?;
    let mut ctx = ConfirmCtx::new(user_id, self.clock.now(), uow);

    let outcome = self.pipeline.run(&mut ctx).await;
    let commit = match outcome {
      Ok(PipelineOutcome::Completed) => true,
      Ok(PipelineOutcome::Stopped { ref at }) if ctx.is_complete() => {
        event!(Level::DEBUG, step = %at, "Pipeline stopped after the confirmation was complete.");
        true
      }
      _ => false,
    };

    if !commit {
      abandon(&mut ctx).await;
      return Err(match outcome {
        Err(e) => e,
        Ok(PipelineOutcome::Stopped { at }) => {
          EngineError::Internal(format!("confirmation stopped at step '{at}' before completing"))
        }
        Ok(PipelineOutcome::Completed) => EngineError::Internal("unreachable pipeline outcome".to_string()),
      });
    }

    let confirmation = ctx.confirmation()?;
    ctx.uow.commit().await?;
    ctx.transition(ConfirmStage::Confirmed);
    event!(
      Level::INFO,
      tracking_code = %confirmation.tracking_code,
      total = %confirmation.total_price,
      "Cart confirmed."
    );
    Ok(confirmation)
  }

  // --- Cart store ---

  pub async fn pending_cart(&self, user_id: Uuid) -> EngineResult<CartView> {
    let mut uow = self.store.begin().await?;
    let view = carts::pending_cart(uow.as_mut(), user_id, false).await?;
    uow.rollback().await?;
    Ok(view)
  }

  /// Opens a pending cart for a user who has none. Registration does this already.
  pub async fn open_new_pending_cart(&self, user_id: Uuid) -> EngineResult<CartView> {
    let now = self.clock.now();
    self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          let cart = carts::open_new_pending_cart(uow, user_id, now).await?;
          Ok(CartView {
            cart,
            lines: Vec::new(),
          })
        })
      })
      .await
  }

  pub async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> EngineResult<CartView> {
    let now = self.clock.now();
    self
      .in_unit_of_work(move |uow| Box::pin(carts::add_or_merge_item(uow, user_id, product_id, quantity, now)))
      .await
  }

  pub async fn set_item_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> EngineResult<CartView> {
    self
      .in_unit_of_work(move |uow| Box::pin(carts::set_item_quantity(uow, user_id, item_id, quantity)))
      .await
  }

  pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> EngineResult<CartView> {
    self
      .in_unit_of_work(move |uow| Box::pin(carts::remove_item(uow, user_id, item_id)))
      .await
  }

  // --- Accounts ---

  /// Stores a new user and opens their first pending cart, atomically.
  #[instrument(name = "Engine::register_user", skip_all, fields(username = %new_user.username))]
  pub async fn register_user(&self, new_user: NewUser) -> EngineResult<User> {
    new_user.validate()?;
    let now = self.clock.now();
    let user = new_user.into_user(Uuid::new_v4(), now);
    let user = self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          if uow.insert_user(&user).await? == InsertOutcome::Conflict {
            return Err(EngineError::UsernameTaken {
              username: user.username.clone(),
            });
          }
          carts::open_new_pending_cart(uow, user.id, now).await?;
          Ok(user)
        })
      })
      .await?;
    event!(Level::INFO, user_id = %user.id, "User registered.");
    Ok(user)
  }

  pub async fn user(&self, user_id: Uuid) -> EngineResult<Option<User>> {
    self.store.user(user_id).await
  }

  /// Applies a profile update and returns the stored user.
  #[instrument(name = "Engine::update_user", skip(self, patch))]
  pub async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> EngineResult<User> {
    patch.validate()?;
    let user = self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          let mut user = uow
            .user(user_id, true)
            .await?
            .ok_or(EngineError::UserNotFound { user_id })?;
          patch.apply(&mut user);
          uow.update_user(&user).await?;
          Ok(user)
        })
      })
      .await?;
    event!(Level::DEBUG, user_id = %user.id, "Profile updated.");
    Ok(user)
  }

  // --- Catalog ---

  #[instrument(name = "Engine::create_product", skip_all)]
  pub async fn create_product(&self, new_product: NewProduct) -> EngineResult<Product> {
    new_product.validate()?;
    let product = new_product.into_product(Uuid::new_v4(), self.clock.now());
    let product = self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          uow.insert_product(&product).await?;
          Ok(product)
        })
      })
      .await?;
    event!(Level::INFO, product_id = %product.id, "Product created.");
    Ok(product)
  }

  /// Applies a partial update. Frozen prices on confirmed carts are untouched.
  #[instrument(name = "Engine::update_product", skip(self, patch))]
  pub async fn update_product(&self, product_id: Uuid, patch: ProductPatch) -> EngineResult<Product> {
    patch.validate()?;
    let now = self.clock.now();
    self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          let mut product = uow
            .product(product_id, true)
            .await?
            .ok_or(EngineError::ProductNotFound { product_id })?;
          patch.apply(&mut product, now);
          uow.update_product(&product).await?;
          Ok(product)
        })
      })
      .await
  }

  /// Soft delete: the product leaves the catalog but stays joinable from past orders.
  #[instrument(name = "Engine::delete_product", skip(self))]
  pub async fn delete_product(&self, product_id: Uuid) -> EngineResult<()> {
    let now = self.clock.now();
    self
      .in_unit_of_work(move |uow| {
        Box::pin(async move {
          if !uow.soft_delete_product(product_id, now).await? {
            return Err(EngineError::ProductNotFound { product_id });
          }
          Ok(())
        })
      })
      .await
  }

  pub async fn product(&self, product_id: Uuid) -> EngineResult<Product> {
    self
      .store
      .product(product_id)
      .await?
      .ok_or(EngineError::ProductNotFound { product_id })
  }

  /// Stored image bytes of a live product, `None` when it has no image.
  pub async fn product_image(&self, product_id: Uuid) -> EngineResult<Option<Vec<u8>>> {
    let product = self.product(product_id).await?;
    Ok(product.image.filter(|bytes| !bytes.is_empty()))
  }

  pub async fn list_products(&self, page: &Page) -> EngineResult<Vec<Product>> {
    self.store.list_products(page).await
  }

  // --- Orders ---

  pub async fn order_by_tracking_code(&self, tracking_code: &str) -> EngineResult<OrderDetails> {
    self
      .store
      .order_details(tracking_code)
      .await?
      .ok_or_else(|| EngineError::OrderNotFound {
        tracking_code: tracking_code.to_string(),
      })
  }

  pub async fn orders_for_user(&self, user_id: Uuid, page: Page) -> EngineResult<Vec<Order>> {
    self
      .store
      .list_orders(&OrderFilter {
        user_id: Some(user_id),
        page,
      })
      .await
  }

  pub async fn all_orders(&self, page: Page) -> EngineResult<Vec<Order>> {
    self.store.list_orders(&OrderFilter { user_id: None, page }).await
  }

  // --- Analytics ---

  /// Best and worst seller over `window`, with "today" taken in the process-local zone.
  pub async fn sales_extremes(&self, window: Window) -> EngineResult<SalesExtremes> {
    self.sales_extremes_at(window, &self.local_now()).await
  }

  pub async fn sales_extremes_at<Tz: TimeZone>(&self, window: Window, now: &DateTime<Tz>) -> EngineResult<SalesExtremes> {
    analytics::sales_extremes(self.store.as_ref(), window.range_at(now)).await
  }

  pub async fn total_income(&self, window: Window) -> EngineResult<Decimal> {
    self.total_income_at(window, &self.local_now()).await
  }

  pub async fn total_income_at<Tz: TimeZone>(&self, window: Window, now: &DateTime<Tz>) -> EngineResult<Decimal> {
    analytics::total_income(self.store.as_ref(), window.range_at(now)).await
  }

  pub async fn sales_report(&self) -> Vec<WindowReport<SalesExtremes>> {
    self.sales_report_at(&self.local_now()).await
  }

  pub async fn sales_report_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<WindowReport<SalesExtremes>> {
    let mut reports = Vec::with_capacity(Window::ALL.len());
    for window in Window::ALL {
      let range = window.range_at(now);
      let outcome = analytics::sales_extremes(self.store.as_ref(), range).await;
      log_window_failure(window, &outcome);
      reports.push(WindowReport { window, range, outcome });
    }
    reports
  }

  pub async fn income_report(&self) -> Vec<WindowReport<Decimal>> {
    self.income_report_at(&self.local_now()).await
  }

  pub async fn income_report_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<WindowReport<Decimal>> {
    let mut reports = Vec::with_capacity(Window::ALL.len());
    for window in Window::ALL {
      let range = window.range_at(now);
      let outcome = analytics::total_income(self.store.as_ref(), range).await;
      log_window_failure(window, &outcome);
      reports.push(WindowReport { window, range, outcome });
    }
    reports
  }

  fn local_now(&self) -> DateTime<Local> {
    self.clock.now().with_timezone(&Local)
  }

  /// Runs `work` in a fresh unit of work, committing on `Ok` and rolling back on `Err`.
  async fn in_unit_of_work<T, F>(&self, work: F) -> EngineResult<T>
  where
    T: Send,
    F: for<'u> FnOnce(
        &'u mut dyn UnitOfWork,
      ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<T>> + Send + 'u>>
      + Send,
  {
    let mut uow = self.store.begin().await?;
    match work(uow.as_mut()).await {
      Ok(value) => {
        uow.commit().await?;
        Ok(value)
      }
      Err(e) => {
        if let Err(rollback_err) = uow.rollback().await {
          event!(Level::ERROR, error = %rollback_err, "Rollback failed.");
        }
        Err(e)
      }
    }
  }
}

async fn abandon(ctx: &mut ConfirmCtx) {
  if let Err(e) = ctx.uow.rollback().await {
    event!(Level::ERROR, error = %e, "Rollback of confirmation failed.");
  }
  ctx.transition(ConfirmStage::RolledBack);
}

fn log_window_failure<T>(window: Window, outcome: &EngineResult<T>) {
  if let Err(e) = outcome {
    event!(Level::ERROR, %window, error = %e, "Analytics window failed.");
  }
}

impl std::fmt::Debug for Engine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Engine")
      .field("config", &self.config)
      .field("pipeline", &self.pipeline)
      .finish_non_exhaustive()
  }
}
