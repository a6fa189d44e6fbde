use serde::{Deserialize, Serialize};

/// Weighted window above which a configuration earns no rating at all.
pub const MAX_WEIGHTED_WINDOW_MS: f64 = 150.0;
/// Weighted window up to which the cubic piece applies.
pub const CUBIC_LIMIT_MS: f64 = 100.0;

/// Hit-window tolerances a player chose, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentConfig {
    pub perfect_window_ms: f64,
    pub good_window_ms: f64,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            perfect_window_ms: 80.0,
            good_window_ms: 160.0,
        }
    }
}

impl JudgmentConfig {
    pub fn new(perfect_window_ms: f64, good_window_ms: f64) -> Self {
        Self {
            perfect_window_ms,
            good_window_ms,
        }
    }

    pub fn rks_factor(&self) -> f64 {
        rks_factor(self.perfect_window_ms, self.good_window_ms)
    }
}

/// `0.8 * perfect + 0.225 * good`
pub fn weighted_window(perfect_window_ms: f64, good_window_ms: f64) -> f64 {
    0.8 * perfect_window_ms + 0.225 * good_window_ms
}

/// Rating multiplier for a judgment configuration.
///
/// Continuous and non-increasing in the weighted window: 1 at zero width, 0
/// from 150 ms on. `x == 150` takes the quadratic piece, which is exactly 0
/// there. The cubic piece would exceed 1 below 100 ms; the multiplier is
/// capped at 1.
pub fn rks_factor(perfect_window_ms: f64, good_window_ms: f64) -> f64 {
    let x = weighted_window(perfect_window_ms, good_window_ms);
    if x > MAX_WEIGHTED_WINDOW_MS {
        0.0
    } else if x > CUBIC_LIMIT_MS {
        x * x / 7500.0 - 4.0 * x / 75.0 + 5.0
    } else {
        let shifted = x - CUBIC_LIMIT_MS;
        (-(shifted * shifted * shifted) / 4_000_000.0 + 1.0).min(1.0)
    }
}
