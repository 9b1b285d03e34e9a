// kab-orders/src/analytics/window.rs

//! Standard reporting windows and the time ranges they resolve to.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reporting window that always ends at "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
  Day,
  Week,
  Month,
  Year,
}

impl Window {
  pub const ALL: [Window; 4] = [Window::Day, Window::Week, Window::Month, Window::Year];

  /// Days before today's local midnight at which the window opens.
  pub fn lookback_days(self) -> i64 {
    match self {
      Window::Day => 0,
      Window::Week => 7,
      Window::Month => 30,
      Window::Year => 365,
    }
  }

  /// Resolves the window against `now`, whose time zone decides where "today" begins.
  pub fn range_at<Tz: TimeZone>(self, now: &DateTime<Tz>) -> TimeRange {
    let midnight = local_midnight(now);
    TimeRange {
      start: midnight - Duration::days(self.lookback_days()),
      end: now.with_timezone(&Utc),
    }
  }
}

impl fmt::Display for Window {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Window::Day => "day",
      Window::Week => "week",
      Window::Month => "month",
      Window::Year => "year",
    };
    f.write_str(name)
  }
}

/// `(start, end]`: an order placed exactly at `start` belongs to the previous range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl TimeRange {
  pub fn contains(&self, instant: DateTime<Utc>) -> bool {
    self.start < instant && instant <= self.end
  }
}

fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
  let naive_midnight = now.date_naive().and_time(NaiveTime::MIN);
  match now.timezone().from_local_datetime(&naive_midnight).earliest() {
    Some(midnight) => midnight.with_timezone(&Utc),
    // Midnight skipped by a DST jump: step back by the local time elapsed since it.
    None => now.with_timezone(&Utc) - (now.naive_local() - naive_midnight),
  }
}
