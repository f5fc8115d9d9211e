//! Animation primitives: easing curves, timelines and transforms.

pub mod easing;
pub mod timeline;
pub mod transform;

pub use easing::Easing;
pub use timeline::Timeline;
pub use transform::{Transform, ProgressFn};
