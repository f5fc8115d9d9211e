//! Effect timeline: duration, easing and looping.

use crate::anim::easing::Easing;
use crate::error::{EffectError, Result};

/// How long an effect runs and how its progress is shaped.
#[derive(Clone, Debug)]
pub struct Timeline {
    duration_ticks: u32,
    easing: Easing,
    looping: bool,
}

impl Timeline {
    /// Create a timeline. Fails on a zero duration.
    pub fn new(duration_ticks: u32, easing: Easing, looping: bool) -> Result<Self> {
        if duration_ticks == 0 {
            return Err(EffectError::invalid("timeline duration must be positive"));
        }
        Ok(Self { duration_ticks, easing, looping })
    }

    /// Linear, non-looping timeline.
    pub fn linear(duration_ticks: u32) -> Result<Self> {
        Self::new(duration_ticks, Easing::linear(), false)
    }

    /// Duration in ticks.
    #[inline]
    pub fn duration_ticks(&self) -> u32 {
        self.duration_ticks
    }

    /// Whether the timeline wraps around instead of finishing.
    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// The easing curve.
    pub fn easing(&self) -> &Easing {
        &self.easing
    }

    /// Raw progress `(tick mod duration) / duration`, in [0, 1).
    #[inline]
    pub fn raw_progress(&self, local_tick: u32) -> f64 {
        (local_tick % self.duration_ticks) as f64 / self.duration_ticks as f64
    }

    /// Eased progress at `local_tick`.
    #[inline]
    pub fn progress(&self, local_tick: u32) -> f64 {
        self.easing.apply(self.raw_progress(local_tick))
    }

    /// True once a non-looping timeline has run its full duration.
    #[inline]
    pub fn is_complete(&self, local_tick: u32) -> bool {
        !self.looping && local_tick >= self.duration_ticks
    }
}
