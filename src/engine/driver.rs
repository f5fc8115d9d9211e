//! Async frame driver for hosts without a game loop of their own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::engine::clock::FrameClock;

/// Advance `clock` at `tick_rate` Hz until `frames` have run or `shutdown`
/// fires. Returns the number of frames advanced.
///
/// Late frames are skipped rather than replayed in a burst. Dropping every
/// shutdown sender also ends the loop.
pub async fn drive(
    clock: Arc<FrameClock>,
    tick_rate: u32,
    frames: Option<u64>,
    mut shutdown: broadcast::Receiver<()>,
) -> u64 {
    let tick_duration = Duration::from_micros(1_000_000 / tick_rate.max(1) as u64);
    let mut tick_interval = interval(tick_duration);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut advanced = 0;
    loop {
        if frames.is_some_and(|limit| advanced >= limit) {
            break;
        }
        tokio::select! {
            _ = tick_interval.tick() => {
                clock.advance();
                advanced += 1;
            }
            _ = shutdown.recv() => {
                info!("Shutdown signal received after {} frames", advanced);
                break;
            }
        }
    }
    advanced
}
