//! Easing curves mapping raw progress in [0, 1] onto eased progress.

use std::fmt;
use std::sync::Arc;

/// A monotonic curve `[0, 1] -> [0, 1]`.
///
/// Well-formed curves satisfy `f(0) = 0` and `f(1) = 1`; otherwise the
/// effect snaps visibly when a loop wraps around.
#[derive(Clone)]
pub struct Easing {
    name: &'static str,
    curve: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl Easing {
    /// Identity curve.
    pub fn linear() -> Self {
        Self::named("linear", |t| t)
    }

    /// Quadratic ease-in-out.
    pub fn ease_in_out() -> Self {
        Self::named("ease_in_out", |t| {
            if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
            }
        })
    }

    /// Quadratic ease-in.
    pub fn ease_in() -> Self {
        Self::named("ease_in", |t| t * t)
    }

    /// Quadratic ease-out.
    pub fn ease_out() -> Self {
        Self::named("ease_out", |t| 1.0 - (1.0 - t) * (1.0 - t))
    }

    /// Caller-supplied curve.
    pub fn custom(curve: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::named("custom", curve)
    }

    fn named(name: &'static str, curve: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self { name, curve: Arc::new(curve) }
    }

    /// Evaluate the curve.
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        (self.curve)(t)
    }

    /// Curve name, for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::linear()
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Easing({})", self.name)
    }
}
