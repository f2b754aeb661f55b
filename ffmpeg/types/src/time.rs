/*!
    Time bases and timestamp rescaling.
*/

use serde::{Deserialize, Serialize};

/**
    Jitter, in microseconds, allowed when comparing timestamps that went
    through more than one time base conversion.
*/
pub const TIME_BASE_JITTER_US: i64 = 100;

/**
    Default tolerance, in microseconds, for landing a precise seek.
*/
pub const DEFAULT_SEEK_ACCURACY_US: i64 = 10;

/**
    A rational number, used for time bases and frame rates.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /**
        The caller-facing time base: one tick per microsecond.
    */
    pub const MICROSECONDS: Self = Self::new(1, 1_000_000);

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns true when both terms are nonzero.
    */
    pub const fn is_valid(&self) -> bool {
        self.num != 0 && self.den != 0
    }

    /**
        Convert to a float. Invalid rationals yield 0.0.
    */
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }

    /**
        Rescale `value` from this time base to `to`, rounding to the nearest
        tick with halves away from zero.
    */
    pub fn rescale(self, value: i64, to: Rational) -> i64 {
        if !self.is_valid() || !to.is_valid() {
            return value;
        }

        // value * self.num / self.den / (to.num / to.den)
        let numerator = value as i128 * self.num as i128 * to.den as i128;
        let denominator = self.den as i128 * to.num as i128;
        let (numerator, denominator) = if denominator < 0 {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };

        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /**
        Rescale `value` from this time base to microseconds.
    */
    pub fn to_micros(self, value: i64) -> i64 {
        self.rescale(value, Self::MICROSECONDS)
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
