//! Snowflakes that fall slowly through the whole scene.

use super::{usable_dt, Blend, Decoration, Primitives, Sprite, SpriteShape};
use crate::power_law;
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for [`Snow`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowConfig {
    /// How many flakes there are.
    pub count: usize,

    /// Half the side length of the square that flakes fall in.
    pub area: f32,

    /// How tall the column of snow is.
    pub height: f32,

    /// The y where the column starts.
    pub y_base: f32,

    /// The base falling speed.
    pub fall_speed: f32,

    /// How strong the sideways drift is.
    pub drift: f32,

    /// The smallest flake size.
    pub size_min: f32,

    /// The largest flake size.
    pub size_max: f32,

    /// The opacity of every flake.
    pub opacity: f32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            count: 1100,
            area: 85.,
            height: 55.,
            y_base: -2.,
            fall_speed: 0.7,
            drift: 0.7,
            size_min: 0.38,
            size_max: 1.05,
            opacity: 0.72,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Flake {
    position: Vec3,
    speed: f32,
    phase: f32,
    rotation: f32,
    spin: f32,
    size: f32,
}

/// Falling snow.
#[derive(Clone, Debug)]
pub struct Snow {
    config: SnowConfig,
    flakes: Vec<Flake>,
    rng: StdRng,
}

impl Snow {
    /// Scatter the flakes through the column.
    pub fn new(config: SnowConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let flakes = (0..config.count)
            .map(|_| {
                let position = Vec3::new(
                    rng.gen_range(-1.0_f32..=1.0) * config.area,
                    config.y_base + rng.gen::<f32>() * config.height,
                    rng.gen_range(-1.0_f32..=1.0) * config.area,
                );

                // Mostly small flakes with the odd big one
                let t = power_law(&mut rng, 1.8);

                Flake {
                    position,
                    speed: (0.35 + rng.gen::<f32>() * 0.9) * config.fall_speed,
                    phase: rng.gen::<f32>() * 1000.,
                    rotation: rng.gen::<f32>() * TAU,
                    spin: rng.gen_range(-1.0_f32..=1.0) * 0.8,
                    size: config.size_max + (config.size_min - config.size_max) * t,
                }
            })
            .collect();

        Self {
            config,
            flakes,
            rng,
        }
    }

    /// The y below which a flake goes back to the top.
    fn floor(&self) -> f32 {
        self.config.y_base - 2.
    }

    /// The current flake positions.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.flakes.iter().map(|flake| flake.position)
    }
}

impl Decoration for Snow {
    fn update(&mut self, dt: f32, elapsed: f32) {
        let dt = usable_dt(dt);
        let floor = self.floor();
        let SnowConfig {
            area,
            height,
            y_base,
            drift,
            ..
        } = self.config;

        for flake in &mut self.flakes {
            flake.position.y -= flake.speed * dt;
            flake.position.x += (elapsed * 0.6 + flake.phase).sin() * drift * dt * 0.65;
            flake.position.z += (elapsed * 0.5 + flake.phase).cos() * drift * dt * 0.35;
            flake.rotation += flake.spin * dt;

            if flake.position.y < floor {
                flake.position = Vec3::new(
                    self.rng.gen_range(-1.0_f32..=1.0) * area,
                    y_base + height,
                    self.rng.gen_range(-1.0_f32..=1.0) * area,
                );
                flake.phase = self.rng.gen::<f32>() * 1000.;
            }
        }
    }

    fn emit(&self, out: &mut Primitives) {
        out.sprites.extend(self.flakes.iter().map(|flake| Sprite {
            position: flake.position,
            size: flake.size,
            colour: [1.; 3],
            alpha: self.config.opacity,
            blend: Blend::Normal,
            shape: SpriteShape::Flake {
                rotation: flake.rotation,
            },
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flakes_stay_in_their_column() {
        let config = SnowConfig::default();
        let mut snow = Snow::new(config.clone(), 7);

        let mut elapsed = 0.;
        for _ in 0..2000 {
            snow.update(0.1, elapsed);
            elapsed += 0.1;

            for p in snow.positions() {
                assert!(p.y >= config.y_base - 2. - 1.5);
                assert!(p.y <= config.y_base + config.height);
            }
        }
    }

    #[test]
    fn flakes_fall_and_respawn_at_top() {
        let config = SnowConfig {
            count: 1,
            ..SnowConfig::default()
        };
        let mut snow = Snow::new(config.clone(), 1);
        let start = snow.positions().next().unwrap();

        snow.update(0.5, 0.);
        let after = snow.positions().next().unwrap();
        assert!(after.y < start.y);

        // One huge step puts the flake below the floor, so it respawns at the top
        snow.update(1000., 0.5);
        let respawned = snow.positions().next().unwrap();
        assert_eq!(respawned.y, config.y_base + config.height);
    }

    #[test]
    fn sizes_within_bounds() {
        let config = SnowConfig::default();
        let snow = Snow::new(config.clone(), 3);
        let mut out = Primitives::default();
        snow.emit(&mut out);

        assert_eq!(out.sprites.len(), config.count);
        for sprite in out.sprites {
            assert!(sprite.size >= config.size_min - 1e-6);
            assert!(sprite.size <= config.size_max + 1e-6);
            assert_eq!(sprite.blend, Blend::Normal);
        }
    }
}
