//! The curfew predicate — a pure function of wall-clock time.
//!
//! During the curfew window, entry requires an approved late-entry request.
//! Screens that display curfew state re-evaluate it by polling at least once
//! per minute; there is no clock-tick event source.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Daily curfew period, expressed in whole hours on a 24-hour clock.
///
/// The default window is 22:00–04:00, which wraps midnight. Windows with
/// `start_hour < end_hour` (no wrap) are also supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurfewWindow {
  pub start_hour: u32,
  pub end_hour:   u32,
}

impl Default for CurfewWindow {
  fn default() -> Self {
    Self {
      start_hour: 22,
      end_hour:   4,
    }
  }
}

impl CurfewWindow {
  /// True iff the hour-of-day of `t` falls inside the window.
  ///
  /// The window is half-open on both edges: the start hour is inside, the
  /// end hour is outside (21:59 → false, 22:00 → true, 03:59 → true,
  /// 04:00 → false for the default window).
  pub fn contains<T: Timelike>(&self, t: &T) -> bool {
    self.contains_hour(t.hour())
  }

  /// [`Self::contains`] on a bare hour-of-day (0–23).
  pub fn contains_hour(&self, hour: u32) -> bool {
    if self.start_hour > self.end_hour {
      // Wraps midnight.
      hour >= self.start_hour || hour < self.end_hour
    } else {
      hour >= self.start_hour && hour < self.end_hour
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveTime;

  use super::*;

  fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
  }

  #[test]
  fn default_window_boundaries() {
    let w = CurfewWindow::default();
    assert!(!w.contains(&at(21, 59)));
    assert!(w.contains(&at(22, 0)));
    assert!(w.contains(&at(3, 59)));
    assert!(!w.contains(&at(4, 0)));
  }

  #[test]
  fn default_window_wraps_midnight() {
    let w = CurfewWindow::default();
    assert!(w.contains(&at(23, 30)));
    assert!(w.contains(&at(0, 0)));
    assert!(w.contains(&at(2, 15)));
    assert!(!w.contains(&at(12, 0)));
  }

  #[test]
  fn matches_hour_comparison_for_all_hours() {
    let w = CurfewWindow::default();
    for hour in 0..24 {
      assert_eq!(w.contains_hour(hour), hour >= 22 || hour < 4, "hour {hour}");
    }
  }

  #[test]
  fn non_wrapping_window() {
    let w = CurfewWindow {
      start_hour: 1,
      end_hour:   5,
    };
    assert!(!w.contains(&at(0, 59)));
    assert!(w.contains(&at(1, 0)));
    assert!(w.contains(&at(4, 59)));
    assert!(!w.contains(&at(5, 0)));
    assert!(!w.contains(&at(23, 0)));
  }
}
