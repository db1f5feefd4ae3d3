//! Logistic transitions.
//!
//! Numerical notes:
//! - `1 / (1 + exp(-x))` overflows `exp` for very negative `x`; we switch to the
//!   algebraically equal `exp(x) / (1 + exp(x))` there, so the result is exact
//!   at both tails (0 and 1) instead of producing `inf / inf`.

/// Standard logistic function `σ(x) = 1 / (1 + e^{-x})`.
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// A logistic transition centred on `midpoint` with steepness `steepness`.
///
/// `weight(day)` goes from 0 (well before the midpoint) to 1 (well after).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub midpoint: f64,
    pub steepness: f64,
}

impl Transition {
    pub fn new(midpoint: f64, steepness: f64) -> Self {
        Self { midpoint, steepness }
    }

    pub fn weight(&self, day: f64) -> f64 {
        logistic(self.steepness * (day - self.midpoint))
    }

    /// Move from `from` toward `to` by this transition's weight at `day`.
    pub fn blend(&self, from: f64, to: f64, day: f64) -> f64 {
        from + (to - from) * self.weight(day)
    }
}
