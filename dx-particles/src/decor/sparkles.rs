//! Little points of light floating around in a box.

use super::{Blend, Decoration, Primitives, Sprite, SpriteShape};
use crate::colour::hex;
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for one layer of [`Sparkles`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparklesConfig {
    pub count: usize,

    /// The full size of the box along each axis, centred on the origin.
    pub scale: [f32; 3],

    /// The diameter of a sparkle in world units.
    pub size: f32,

    /// How quickly the sparkles wander.
    pub speed: f32,

    pub opacity: f32,
    pub colour: u32,
}

impl Default for SparklesConfig {
    fn default() -> Self {
        Self {
            count: 90,
            scale: [60., 35., 60.],
            size: 0.12,
            speed: 0.1,
            opacity: 0.18,
            colour: 0xffffff,
        }
    }
}

impl SparklesConfig {
    /// The four layers of background dust: white and cyan stars, then two pink layers of air.
    pub fn background_layers() -> Vec<Self> {
        vec![
            Self::default(),
            Self {
                count: 60,
                size: 0.1,
                speed: 0.07,
                opacity: 0.1,
                colour: 0x7df9ff,
                ..Self::default()
            },
            Self {
                count: 110,
                scale: [70., 45., 70.],
                size: 0.11,
                speed: 0.06,
                opacity: 0.1,
                colour: 0xff78d6,
            },
            Self {
                count: 55,
                scale: [70., 45., 70.],
                size: 0.19,
                speed: 0.03,
                opacity: 0.06,
                colour: 0xff4fd8,
            },
        ]
    }

    /// The two layers that hang around the star.
    pub fn star_layers() -> Vec<Self> {
        vec![
            Self {
                count: 120,
                scale: [6.5; 3],
                size: 0.09,
                speed: 0.22,
                opacity: 0.55,
                colour: 0xffffff,
            },
            Self {
                count: 40,
                scale: [4.5; 3],
                size: 0.14,
                speed: 0.12,
                opacity: 0.25,
                colour: 0x7df9ff,
            },
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Sparkle {
    home: Vec3,
    phase: Vec3,
}

/// A layer of wandering sparkles.
#[derive(Clone, Debug)]
pub struct Sparkles {
    config: SparklesConfig,
    sparkles: Vec<Sparkle>,
    time: f32,
}

/// How far a sparkle wanders from home, as a fraction of the box.
const WANDER: f32 = 0.02;

impl Sparkles {
    pub fn new(config: SparklesConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let half = Vec3::from(config.scale) / 2.;

        let sparkles = (0..config.count)
            .map(|_| Sparkle {
                home: (rng.gen::<Vec3>() * 2. - Vec3::ONE) * half * (1. - WANDER),
                phase: rng.gen::<Vec3>() * TAU,
            })
            .collect();

        Self {
            config,
            sparkles,
            time: 0.,
        }
    }

    fn position(&self, sparkle: &Sparkle) -> Vec3 {
        let t = self.time * self.config.speed * TAU;
        let wobble = Vec3::new(
            (t + sparkle.phase.x).sin(),
            (t * 0.8 + sparkle.phase.y).sin(),
            (t * 1.2 + sparkle.phase.z).sin(),
        );
        sparkle.home + wobble * Vec3::from(self.config.scale) / 2. * WANDER
    }
}

impl Decoration for Sparkles {
    fn update(&mut self, _dt: f32, elapsed: f32) {
        if elapsed.is_finite() {
            self.time = elapsed;
        }
    }

    fn emit(&self, out: &mut Primitives) {
        let colour = hex(self.config.colour);
        let t = self.time * self.config.speed * TAU;

        out.sprites.extend(self.sparkles.iter().map(|sparkle| {
            let pulse = 0.5 + 0.5 * (t * 1.7 + sparkle.phase.x * 3.).sin();
            Sprite {
                position: self.position(sparkle),
                size: self.config.size * (0.6 + 0.4 * pulse),
                colour,
                alpha: self.config.opacity * pulse,
                blend: Blend::Additive,
                shape: SpriteShape::Dot,
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparkles_stay_in_their_box() {
        for config in SparklesConfig::background_layers()
            .into_iter()
            .chain(SparklesConfig::star_layers())
        {
            let mut sparkles = Sparkles::new(config.clone(), 31);
            let half = Vec3::from(config.scale) / 2.;
            let mut out = Primitives::default();

            for i in 0..50 {
                sparkles.update(0.25, i as f32 * 0.25);
                out.clear();
                sparkles.emit(&mut out);

                assert_eq!(out.sprites.len(), config.count);
                for sprite in &out.sprites {
                    let p = sprite.position.abs();
                    assert!(p.x <= half.x + 1e-4 && p.y <= half.y + 1e-4 && p.z <= half.z + 1e-4);
                    assert!(sprite.alpha <= config.opacity + 1e-6);
                }
            }
        }
    }
}
