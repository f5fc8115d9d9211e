//! Ready-made effects.

use std::f64::consts::PI;

use crate::anim::{Easing, Timeline, Transform};
use crate::core::vec3::Vec3;
use crate::effect::context::ParticleContext;
use crate::effect::entity::{EntityEffectSpec, EntityParams, RigSpec};
use crate::effect::particle::{Color, ParticleEffectSpec, ParticleKind, ParticleParams};
use crate::error::{EffectError, Result};
use crate::shape::{shape, Circle};
use crate::world::{BodyId, Location};
use crate::TICK_RATE;

/// Samples on the ring of [`ring_pulse`].
pub const RING_SAMPLES: u32 = 96;

/// Damage dealt by [`line_strike`].
pub const LINE_STRIKE_DAMAGE: f64 = 20.0;

/// Rig model bound by [`line_strike`].
pub const LINE_STRIKE_MODEL: &str = "viperwolf";

/// Red dust ring whose X/Z scale swells and relaxes once over `secs`.
pub fn ring_pulse(
    context: ParticleContext,
    center: impl Fn() -> Option<Location> + Send + Sync + 'static,
    radius: f64,
    secs: f64,
) -> Result<ParticleEffectSpec> {
    let duration = (secs * TICK_RATE as f64) as u32;
    let pulse = |t: f64| 1.0 + 0.5 * (t * PI).sin();

    ParticleEffectSpec::builder()
        .context(context)
        .origin(center)
        .shape(shape(Circle::new(radius, RING_SAMPLES)?))
        .transform(
            Transform::identity()
                .with_scale(move |t| Vec3::new(pulse(t), t, pulse(t)))
                .with_rotate(|_| Vec3::ZERO),
        )
        .params(ParticleParams {
            color: Some(Color::rgb(255, 80, 80)),
            size: 1.5,
            ..ParticleParams::new(ParticleKind::Dust)
        })
        .timeline(Timeline::new(duration, Easing::linear(), false)?)
        .build()
}

/// Flame spiral of `samples` points climbing `height` over `turns` turns.
///
/// The spiral scrolls upward as progress advances.
pub fn spiral_ascend(
    context: ParticleContext,
    center: impl Fn() -> Option<Location> + Send + Sync + 'static,
    height: f64,
    turns: u32,
    samples: u32,
) -> Result<ParticleEffectSpec> {
    if samples == 0 {
        return Err(EffectError::invalid("spiral needs at least one sample"));
    }
    let spiral = move |progress: f64, _seed: i64| {
        (0..samples)
            .map(|i| {
                let t = (i as f64 / samples as f64 + progress) % 1.0;
                let angle = 2.0 * PI * turns as f64 * t;
                Vec3::new(angle.cos() * 1.5, height * t, angle.sin() * 1.5)
            })
            .collect::<Vec<_>>()
    };

    ParticleEffectSpec::builder()
        .context(context)
        .origin(center)
        .shape(shape(spiral))
        .params(ParticleParams {
            speed: 0.01,
            ..ParticleParams::new(ParticleKind::Flame)
        })
        .timeline(Timeline::linear(100)?)
        .build()
}

/// Proxy that slides forward one block per unit progress from one block in
/// front of `start`, striking the first living bodies it passes through.
///
/// A hit damages the target and removes the proxy, which ends the effect.
pub fn line_strike(caster: BodyId, start: Location) -> Result<EntityEffectSpec> {
    let params = EntityParams {
        visible: true,
        collidable: true,
        speed: 1.0,
        ..Default::default()
    }
    .with_fixed_hitbox(0.5)
    .on_attack(|hit| {
        hit.world.damage(hit.target, LINE_STRIKE_DAMAGE, hit.caster);
        hit.world.remove_body(hit.proxy);
        Ok(())
    })
    .with_rig(RigSpec::model(LINE_STRIKE_MODEL));

    EntityEffectSpec::builder(caster)
        .origin(start)
        .offset(Vec3::X)
        .transform(Transform::identity().with_translate(|t| Vec3::new(t, 0.0, 0.0)))
        .params(params)
        .timeline(Timeline::linear(100)?)
        .build()
}
