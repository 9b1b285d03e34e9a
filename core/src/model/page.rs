// kab-orders/src/model/page.rs

use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based pagination plus an optional substring filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
  #[serde(default)]
  pub page: u32,
  #[serde(default)]
  pub page_size: Option<u32>,
  #[serde(default)]
  pub search: Option<String>,
}

impl Page {
  pub fn limit(&self) -> u32 {
    self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page) * u64::from(self.limit())
  }

  /// The search term, trimmed and lowercased; `None` when blank.
  pub fn needle(&self) -> Option<String> {
    self
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_lowercase)
  }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  /// Restrict to one user's orders; `None` lists every order.
  pub user_id: Option<Uuid>,
  pub page: Page,
}
