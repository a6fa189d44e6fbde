use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most fractional digits accepted by [`TimeValue::from_beats_decimal`].
pub const MAX_DECIMAL_PLACES: usize = 9;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeValueError {
    #[error("negative denominator in time triple [{beat}, {numerator}, {denominator}]")]
    NegativeDenominator {
        beat: i32,
        numerator: i32,
        denominator: i32,
    },
    #[error("invalid decimal beat: {0:?}")]
    InvalidDecimal(String),
}

/// Fractional-beat time: `beat + numerator / denominator`.
///
/// Serialized as the triple `[beat, numerator, denominator]`. Two values are
/// simultaneous when their [`to_scalar`](Self::to_scalar) results are equal,
/// whatever their raw triples look like.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "[i32; 3]", into = "[i32; 3]")]
pub struct TimeValue {
    pub beat: i32,
    pub numerator: i32,
    pub denominator: i32,
}

impl TimeValue {
    pub const ZERO: TimeValue = TimeValue {
        beat: 0,
        numerator: 0,
        denominator: 1,
    };

    pub fn new(beat: i32, numerator: i32, denominator: i32) -> Result<Self, TimeValueError> {
        if denominator < 0 {
            return Err(TimeValueError::NegativeDenominator {
                beat,
                numerator,
                denominator,
            });
        }
        Ok(Self {
            beat,
            numerator,
            denominator,
        })
    }

    pub fn from_beat(beat: i32) -> Self {
        Self {
            beat,
            numerator: 0,
            denominator: 1,
        }
    }

    pub fn to_scalar(&self) -> f64 {
        if self.numerator == 0 || self.denominator == 0 {
            return self.beat as f64;
        }
        self.beat as f64 + self.numerator as f64 / self.denominator as f64
    }

    /// Converts a decimal beat literal such as `"2.25"` or `"-0.5"` into an
    /// exact, reduced triple (`(2, 1, 4)` and `(-1, 1, 2)` respectively).
    pub fn from_beats_decimal(src: &str) -> Result<Self, TimeValueError> {
        let invalid = || TimeValueError::InvalidDecimal(src.to_string());

        let s = src.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.len() > MAX_DECIMAL_PLACES {
            return Err(invalid());
        }

        let scale = 10_i64.pow(frac_part.len() as u32);
        let int_value: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let frac_value: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };

        let mut total = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(invalid)?;
        if negative {
            total = -total;
        }

        let beat = i32::try_from(total.div_euclid(scale)).map_err(|_| invalid())?;
        let rem = total.rem_euclid(scale);
        if rem == 0 {
            return Ok(Self::from_beat(beat));
        }
        let g = gcd(rem, scale);
        Ok(Self {
            beat,
            numerator: (rem / g) as i32,
            denominator: (scale / g) as i32,
        })
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

impl Default for TimeValue {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<[i32; 3]> for TimeValue {
    type Error = TimeValueError;

    fn try_from([beat, numerator, denominator]: [i32; 3]) -> Result<Self, Self::Error> {
        Self::new(beat, numerator, denominator)
    }
}

impl From<TimeValue> for [i32; 3] {
    fn from(t: TimeValue) -> Self {
        [t.beat, t.numerator, t.denominator]
    }
}

impl PartialEq for TimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_scalar(other) == Ordering::Equal
    }
}

impl PartialOrd for TimeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_scalar(other))
    }
}

impl TimeValue {
    pub fn cmp_scalar(&self, other: &Self) -> Ordering {
        self.to_scalar().total_cmp(&other.to_scalar())
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.beat, self.numerator, self.denominator)
    }
}
