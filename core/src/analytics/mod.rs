// kab-orders/src/analytics/mod.rs

//! Read-only sales aggregation over committed orders.
//!
//! Only orders whose cart reached CONFIRMED count, and income always uses the unit price
//! frozen at confirmation, so later catalog edits never rewrite history.

pub mod window;

pub use window::{TimeRange, Window};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{event, instrument, Level};

use crate::error::EngineResult;
use crate::model::ProductSales;
use crate::store::Store;

/// Best and worst seller of a window; both `None` when nothing sold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesExtremes {
  pub best: Option<ProductSales>,
  pub worst: Option<ProductSales>,
}

impl SalesExtremes {
  /// Picks the highest and lowest unit counts. Ties go to the lowest product id on both ends.
  pub fn from_sales(sales: &[ProductSales]) -> Self {
    let best = sales
      .iter()
      .min_by(|a, b| b.units.cmp(&a.units).then(a.product_id.cmp(&b.product_id)))
      .cloned();
    let worst = sales
      .iter()
      .min_by(|a, b| a.units.cmp(&b.units).then(a.product_id.cmp(&b.product_id)))
      .cloned();
    Self { best, worst }
  }
}

/// One window's share of a report. Each window is computed on its own, so a failure in one
/// does not hide the others.
#[derive(Debug)]
pub struct WindowReport<T> {
  pub window: Window,
  pub range: TimeRange,
  pub outcome: EngineResult<T>,
}

#[instrument(name = "analytics::sales_extremes", skip(store), level = "debug")]
pub async fn sales_extremes(store: &dyn Store, range: TimeRange) -> EngineResult<SalesExtremes> {
  let sales = store.product_sales(&range).await?;
  event!(Level::DEBUG, products_sold = sales.len(), "Aggregated sales.");
  Ok(SalesExtremes::from_sales(&sales))
}

#[instrument(name = "analytics::total_income", skip(store), level = "debug")]
pub async fn total_income(store: &dyn Store, range: TimeRange) -> EngineResult<Decimal> {
  store.income(&range).await
}
