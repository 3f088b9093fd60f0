//! A slowly spinning ring of soft dots on the ground.

use super::{rotate_y, usable_dt, Blend, Decoration, Primitives, Sprite, SpriteShape};
use crate::power_law;
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for a [`GroundHalo`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundHaloConfig {
    pub count: usize,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub y: f32,

    /// The total vertical spread of the dots around `y`.
    pub thickness: f32,

    /// Radians per second. Negative spins the other way.
    pub spin: f32,

    /// Values near 1 spread the dots evenly. Larger values pull them towards the middle.
    pub density_power: f32,

    pub size: f32,
    pub opacity: f32,
}

impl Default for GroundHaloConfig {
    fn default() -> Self {
        Self {
            count: 1800,
            inner_radius: 0.05,
            outer_radius: 90.,
            y: -10.9,
            thickness: 2.,
            spin: 0.1,
            density_power: 1.06,
            size: 0.14,
            opacity: 0.2,
        }
    }
}

impl GroundHaloConfig {
    /// The fainter, tighter second ring.
    pub fn inner() -> Self {
        Self {
            count: 900,
            inner_radius: 0.05,
            outer_radius: 80.,
            y: -10.3,
            thickness: 2.6,
            spin: -0.14,
            density_power: 1.18,
            size: 0.095,
            opacity: 0.14,
        }
    }
}

/// A ring of dots that spins about the y axis.
#[derive(Clone, Debug)]
pub struct GroundHalo {
    config: GroundHaloConfig,
    points: Vec<Vec3>,
    angle: f32,
}

impl GroundHalo {
    pub fn new(config: GroundHaloConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let points = (0..config.count)
            .map(|_| {
                let u = power_law(&mut rng, config.density_power);
                let radius = config.inner_radius + (config.outer_radius - config.inner_radius) * u;
                let angle = rng.gen::<f32>() * TAU;
                let y = config.y + (rng.gen::<f32>() - 0.5) * config.thickness;

                Vec3::new(angle.cos() * radius, y, angle.sin() * radius)
            })
            .collect();

        Self {
            config,
            points,
            angle: 0.,
        }
    }

    /// The points before spinning.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }
}

impl Decoration for GroundHalo {
    fn update(&mut self, dt: f32, _elapsed: f32) {
        self.angle += usable_dt(dt) * self.config.spin;
    }

    fn emit(&self, out: &mut Primitives) {
        out.sprites.extend(self.points.iter().map(|&p| Sprite {
            position: rotate_y(p, self.angle),
            size: self.config.size,
            colour: [1.; 3],
            alpha: self.config.opacity,
            blend: Blend::Additive,
            shape: SpriteShape::Dot,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_within_ring_and_slab() {
        for config in [GroundHaloConfig::default(), GroundHaloConfig::inner()] {
            let halo = GroundHalo::new(config.clone(), 99);
            assert_eq!(halo.points().len(), config.count);

            for p in halo.points() {
                let radius = Vec3::new(p.x, 0., p.z).length();
                assert!(radius >= config.inner_radius - 1e-4);
                assert!(radius <= config.outer_radius + 1e-4);
                assert!((p.y - config.y).abs() <= config.thickness / 2. + 1e-5);
            }
        }
    }

    #[test]
    fn spinning_keeps_radius() {
        let mut halo = GroundHalo::new(GroundHaloConfig::default(), 5);
        halo.update(3., 3.);

        let mut out = Primitives::default();
        halo.emit(&mut out);

        for (sprite, p) in out.sprites.iter().zip(halo.points()) {
            let before = Vec3::new(p.x, 0., p.z).length();
            let after = Vec3::new(sprite.position.x, 0., sprite.position.z).length();
            assert!((before - after).abs() < 1e-3);
        }
    }
}
