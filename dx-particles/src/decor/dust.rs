//! A flat carpet of fine dust under the tree.

use super::{rotate_y, usable_dt, Blend, Decoration, Primitives, Sprite, SpriteShape};
use crate::power_law;
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for a [`DustDisk`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DustDiskConfig {
    pub radius: f32,
    pub y: f32,
    pub spin: f32,
    pub opacity: f32,

    /// How many specks of dust to scatter over the disk.
    pub count: usize,
}

impl Default for DustDiskConfig {
    fn default() -> Self {
        Self {
            radius: 120.,
            y: -9.9,
            spin: 0.05,
            opacity: 0.68,
            count: 2400,
        }
    }
}

impl DustDiskConfig {
    /// The wider, fainter disk that sits just below the first one.
    pub fn under() -> Self {
        Self {
            radius: 135.,
            y: -10.3,
            spin: -0.03,
            opacity: 0.36,
            count: 1600,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Speck {
    position: Vec3,
    alpha: f32,
    size: f32,
}

/// A spinning disk of dust that fades out towards its edge.
#[derive(Clone, Debug)]
pub struct DustDisk {
    config: DustDiskConfig,
    specks: Vec<Speck>,
    angle: f32,
}

impl DustDisk {
    pub fn new(config: DustDiskConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let specks = (0..config.count)
            .map(|_| {
                let t = power_law(&mut rng, 1.02);
                let radius = t * config.radius;
                let angle = rng.gen::<f32>() * TAU;

                Speck {
                    position: Vec3::new(angle.cos() * radius, config.y, angle.sin() * radius),
                    alpha: (1. - t).powf(1.4) * (0.18 + rng.gen::<f32>() * 0.55),
                    size: 0.18 + rng.gen::<f32>() * 0.55,
                }
            })
            .collect();

        Self {
            config,
            specks,
            angle: 0.,
        }
    }
}

impl Decoration for DustDisk {
    fn update(&mut self, dt: f32, _elapsed: f32) {
        self.angle += usable_dt(dt) * self.config.spin;
    }

    fn emit(&self, out: &mut Primitives) {
        out.sprites.extend(self.specks.iter().map(|speck| Sprite {
            position: rotate_y(speck.position, self.angle),
            size: speck.size,
            colour: [1.; 3],
            alpha: speck.alpha * self.config.opacity,
            blend: Blend::Normal,
            shape: SpriteShape::Dot,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specks_lie_flat_inside_radius() {
        for config in [DustDiskConfig::default(), DustDiskConfig::under()] {
            let mut disk = DustDisk::new(config.clone(), 11);
            disk.update(10., 10.);

            let mut out = Primitives::default();
            disk.emit(&mut out);
            assert_eq!(out.sprites.len(), config.count);

            for sprite in out.sprites {
                let p = sprite.position;
                assert!(Vec3::new(p.x, 0., p.z).length() <= config.radius + 1e-3);
                assert!((p.y - config.y).abs() < 1e-5);
                assert!((0. ..=config.opacity).contains(&sprite.alpha));
            }
        }
    }

    #[test]
    fn edge_is_fainter_than_centre() {
        let disk = DustDisk::new(DustDiskConfig::default(), 2);
        let (near, far): (Vec<_>, Vec<_>) = disk
            .specks
            .iter()
            .partition(|speck| speck.position.length() < 40.);

        let mean = |specks: &[&Speck]| {
            specks.iter().map(|s| s.alpha).sum::<f32>() / specks.len() as f32
        };
        assert!(mean(&near) > mean(&far));
    }
}
