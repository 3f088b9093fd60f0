//! The galaxy band: a glowing ribbon that spirals up around the outside of the tree, wrapped in a
//! cloud of fog points.

use super::{rotate_y, usable_dt, Blend, Decoration, Primitives, Sprite, SpriteShape, Stroke};
use crate::colour::{hex, RGBColour};
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for the [`GalaxyBand`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyBandConfig {
    pub y_min: f32,
    pub y_max: f32,

    /// How many times the ribbon goes round the tree.
    pub turns: f32,

    /// The width of the outer glow. The core is a bit over half this.
    pub width: f32,

    /// How far the ribbon floats off the surface of the tree.
    pub lift: f32,

    pub core_colour: u32,
    pub halo_colour: u32,
    pub fog_count: usize,

    /// Radians per second.
    pub spin: f32,
}

impl Default for GalaxyBandConfig {
    fn default() -> Self {
        Self {
            y_min: -9.5,
            y_max: 9.5,
            turns: 2.35,
            width: 0.95,
            lift: 1.15,
            core_colour: 0xffffff,
            halo_colour: 0xff7ad9,
            fog_count: 1200,
            spin: 0.08,
        }
    }
}

const CURVE_SEGMENTS: usize = 320;

/// A spiral ribbon with fog.
#[derive(Clone, Debug)]
pub struct GalaxyBand {
    config: GalaxyBandConfig,
    curve: Vec<Vec3>,
    fog: Vec<Vec3>,
    angle: f32,
    bob: f32,
}

impl GalaxyBand {
    pub fn new(config: GalaxyBandConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let curve: Vec<Vec3> = (0..=CURVE_SEGMENTS)
            .map(|i| spiral_point(&config, i as f32 / CURVE_SEGMENTS as f32))
            .collect();

        let fog = (0..config.fog_count)
            .map(|_| {
                let t = rng.gen::<f32>();
                let p = spiral_point(&config, t);

                let angle = t * config.turns * TAU;
                let radial = Vec3::new(angle.cos(), 0., angle.sin());
                let tangent = (spiral_point(&config, (t + 1e-3).min(1.))
                    - spiral_point(&config, (t - 1e-3).max(0.)))
                .normalize_or_zero();
                let side = tangent.cross(radial).normalize_or_zero();

                p + radial * (rng.gen::<f32>() - 0.5) * 1.6
                    + side * (rng.gen::<f32>() - 0.5)
                    + Vec3::Y * (rng.gen::<f32>() - 0.5) * 0.9
            })
            .collect();

        Self {
            config,
            curve,
            fog,
            angle: 0.,
            bob: 0.,
        }
    }

    /// The centre line of the ribbon before spinning.
    pub fn curve(&self) -> &[Vec3] {
        &self.curve
    }

    fn place(&self, p: Vec3) -> Vec3 {
        rotate_y(p, self.angle) + Vec3::Y * self.bob
    }

    fn ribbon(&self, width: f32, colour: RGBColour, alpha: f32) -> Stroke {
        Stroke {
            points: self.curve.iter().map(|&p| self.place(p)).collect(),
            width,
            colour,
            alpha,
            dash: None,
        }
    }
}

/// The point `t` of the way along the spiral.
fn spiral_point(config: &GalaxyBandConfig, t: f32) -> Vec3 {
    let y = config.y_min + (config.y_max - config.y_min) * t;
    let radius = (10. - y) * 0.46 + config.lift;
    let angle = t * config.turns * TAU;
    Vec3::new(angle.cos() * radius, y, angle.sin() * radius)
}

impl Decoration for GalaxyBand {
    fn update(&mut self, dt: f32, elapsed: f32) {
        self.angle += usable_dt(dt) * self.config.spin;
        if elapsed.is_finite() {
            self.bob = (elapsed * 0.6).sin() * 0.06;
        }
    }

    fn emit(&self, out: &mut Primitives) {
        let halo = hex(self.config.halo_colour);

        out.strokes.push(self.ribbon(self.config.width, halo, 0.22));
        out.strokes
            .push(self.ribbon(self.config.width * 0.55, hex(self.config.core_colour), 0.42));

        for &p in &self.fog {
            let position = self.place(p);
            out.sprites.push(Sprite {
                position,
                size: 1.25,
                colour: [1.; 3],
                alpha: 0.1,
                blend: Blend::Additive,
                shape: SpriteShape::Dot,
            });
            out.sprites.push(Sprite {
                position,
                size: 0.85,
                colour: halo,
                alpha: 0.22,
                blend: Blend::Additive,
                shape: SpriteShape::Dot,
            });
        }
    }
}
