// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rational numbers for exact frame-rate and timebase arithmetic.
//!
//! Frame rates like 30000/1001 do not round-trip through floats, so all
//! timing math is kept on integer fractions. Values normalize on
//! construction: reduced terms, denominator always positive, zero is 0/1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized rational number over `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    /// Zero as 0/1.
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// Create a rational, normalizing on construction. A zero
    /// denominator is treated as 1.
    pub fn new(num: i64, den: i64) -> Self {
        let mut r = Self {
            num,
            den: if den == 0 { 1 } else { den },
        };
        r.normalize();
        r
    }

    /// Numerator of the reduced fraction.
    pub fn num(&self) -> i64 {
        self.num
    }

    /// Denominator of the reduced fraction, always positive.
    pub fn den(&self) -> i64 {
        self.den
    }

    /// True when the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Approximate value as `f64`.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn normalize(&mut self) {
        if self.num == 0 {
            self.den = 1;
            return;
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs()) as i64;
        self.num /= g;
        self.den /= g;
        if self.den < 0 {
            self.num = -self.num;
            self.den = -self.den;
        }
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self { num: value, den: 1 }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_on_construction() {
        let r = Rational::new(30000, 1001);
        assert_eq!((r.num(), r.den()), (30000, 1001));
        let r = Rational::new(60, 2);
        assert_eq!((r.num(), r.den()), (30, 1));
        let r = Rational::new(1, -4);
        assert_eq!((r.num(), r.den()), (-1, 4));
    }

    #[test]
    fn test_zero_denominator_and_zero_value() {
        let r = Rational::new(5, 0);
        assert_eq!(r.den(), 1);
        let z = Rational::new(0, 7);
        assert_eq!((z.num(), z.den()), (0, 1));
        assert!(z.is_zero());
    }
}
