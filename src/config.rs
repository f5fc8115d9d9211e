//! Engine configuration.
//!
//! Defaults match a 20 Hz host. Values can be overridden from `ARC_EFFECT_*`
//! environment variables or loaded from a JSON file; missing JSON fields
//! keep their defaults.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::core::quant::{REL_SCALE, SUPPRESSION_EPSILON};
use crate::error::{EffectError, Result};
use crate::TICK_RATE;

/// Prefix of every configuration environment variable.
pub const ENV_PREFIX: &str = "ARC_EFFECT_";

/// Scheduler, codec and pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames per second of the driving clock
    pub tick_rate: u32,
    /// Maximum entity effects per shard
    pub shard_capacity: usize,
    /// Motion sync every N effect ticks
    pub client_sync_interval_ticks: u32,
    /// Physics re-freeze every N effect ticks
    pub physics_freeze_interval_ticks: u32,
    /// Per-shard, per-tick time budget in microseconds
    pub time_budget_micros: u64,
    /// Effects visited per shard tick, at most
    pub batch_size_per_tick: usize,
    /// Motion updates reach viewers within this distance of the body
    pub tracking_range: f64,
    /// Quantization units per world unit
    pub quantization_scale: f64,
    /// Updates whose decoded magnitude is below this are not sent
    pub suppression_epsilon: f64,
    /// Compute workers. Zero runs compute inline on the tick thread
    pub compute_threads: usize,
    /// Bounded compute queue length
    pub compute_queue_capacity: usize,
    /// Carry the quantization remainder into the next interval
    pub carry_quantization_remainder: bool,
    /// Omit unchanged orientation bytes from motion updates
    pub look_only_on_change: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            shard_capacity: 20,
            client_sync_interval_ticks: 2,
            physics_freeze_interval_ticks: 10,
            time_budget_micros: 2_000,
            batch_size_per_tick: 256,
            tracking_range: 64.0,
            quantization_scale: REL_SCALE,
            suppression_epsilon: SUPPRESSION_EPSILON,
            compute_threads: default_compute_threads(),
            compute_queue_capacity: 1024,
            carry_quantization_remainder: false,
            look_only_on_change: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with every `ARC_EFFECT_*` variable that is set applied on top.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        override_from_env("TICK_RATE", &mut config.tick_rate)?;
        override_from_env("SHARD_CAPACITY", &mut config.shard_capacity)?;
        override_from_env("CLIENT_SYNC_INTERVAL_TICKS", &mut config.client_sync_interval_ticks)?;
        override_from_env("PHYSICS_FREEZE_INTERVAL_TICKS", &mut config.physics_freeze_interval_ticks)?;
        override_from_env("TIME_BUDGET_MICROS", &mut config.time_budget_micros)?;
        override_from_env("BATCH_SIZE_PER_TICK", &mut config.batch_size_per_tick)?;
        override_from_env("TRACKING_RANGE", &mut config.tracking_range)?;
        override_from_env("QUANTIZATION_SCALE", &mut config.quantization_scale)?;
        override_from_env("SUPPRESSION_EPSILON", &mut config.suppression_epsilon)?;
        override_from_env("COMPUTE_THREADS", &mut config.compute_threads)?;
        override_from_env("COMPUTE_QUEUE_CAPACITY", &mut config.compute_queue_capacity)?;
        override_from_env("CARRY_QUANTIZATION_REMAINDER", &mut config.carry_quantization_remainder)?;
        override_from_env("LOOK_ONLY_ON_CHANGE", &mut config.look_only_on_change)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the schedulers cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tick_rate", self.tick_rate as u64),
            ("shard_capacity", self.shard_capacity as u64),
            ("client_sync_interval_ticks", self.client_sync_interval_ticks as u64),
            ("physics_freeze_interval_ticks", self.physics_freeze_interval_ticks as u64),
            ("time_budget_micros", self.time_budget_micros),
            ("batch_size_per_tick", self.batch_size_per_tick as u64),
            ("compute_queue_capacity", self.compute_queue_capacity as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(EffectError::InvalidConfig(format!("{} must be positive", name)));
        }
        if !(self.quantization_scale.is_finite() && self.quantization_scale > 0.0) {
            return Err(EffectError::InvalidConfig("quantization_scale must be positive".into()));
        }
        if !(self.tracking_range.is_finite() && self.tracking_range >= 0.0) {
            return Err(EffectError::InvalidConfig("tracking_range must be non-negative".into()));
        }
        if self.suppression_epsilon.is_nan() || self.suppression_epsilon < 0.0 {
            return Err(EffectError::InvalidConfig("suppression_epsilon must be non-negative".into()));
        }
        Ok(())
    }

    /// Time budget as a duration.
    pub fn time_budget(&self) -> Duration {
        Duration::from_micros(self.time_budget_micros)
    }

    /// Squared tracking range.
    pub fn tracking_range_sq(&self) -> f64 {
        self.tracking_range * self.tracking_range
    }

    /// Frame period of the driving clock.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

fn default_compute_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .max(2)
}

fn override_from_env<T: FromStr>(name: &str, slot: &mut T) -> Result<()> {
    let key = format!("{}{}", ENV_PREFIX, name);
    if let Ok(raw) = std::env::var(&key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| EffectError::InvalidConfig(format!("{} has an invalid value: {}", key, raw)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.shard_capacity, 20);
        assert_eq!(config.time_budget(), Duration::from_millis(2));
        assert_eq!(config.tracking_range_sq(), 4096.0);
        assert!(config.compute_threads >= 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_partial_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "shard_capacity": 5, "compute_threads": 0 }"#).unwrap();
        assert_eq!(config.shard_capacity, 5);
        assert_eq!(config.compute_threads, 0);
        assert_eq!(config.client_sync_interval_ticks, 2);
    }

    #[test]
    fn test_json_rejects_invalid() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "client_sync_interval_ticks": 0 }"#),
            Err(EffectError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(EffectError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_zero_time_budget_rejected() {
        let config = EngineConfig { time_budget_micros: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(EffectError::InvalidConfig(_))));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "time_budget_micros": 0 }"#),
            Err(EffectError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("ARC_EFFECT_BATCH_SIZE_PER_TICK", "64");
        std::env::set_var("ARC_EFFECT_LOOK_ONLY_ON_CHANGE", "true");
        let config = EngineConfig::from_env().unwrap();
        std::env::remove_var("ARC_EFFECT_BATCH_SIZE_PER_TICK");
        std::env::remove_var("ARC_EFFECT_LOOK_ONLY_ON_CHANGE");

        assert_eq!(config.batch_size_per_tick, 64);
        assert!(config.look_only_on_change);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            EngineConfig::from_json_file("/nonexistent/arc-effect.json"),
            Err(EffectError::Io(_))
        ));
    }
}
