//! The spinning star on top of the tree.

use super::{
    sparkles::{Sparkles, SparklesConfig},
    Blend, Decoration, Polygon, Primitives, Sprite, SpriteShape, Stroke,
};
use crate::colour::{hex, RGBColour};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

/// The config for the [`StarTopper`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarTopperConfig {
    pub outer_radius: f32,
    pub inner_radius: f32,

    /// The number of outline points, alternating between the outer and inner radius.
    pub points: usize,

    /// How far above the highest particle the star sits.
    pub anchor_offset: f32,

    pub scale: f32,

    /// Radians per second around the y axis.
    pub spin: f32,
}

impl Default for StarTopperConfig {
    fn default() -> Self {
        Self {
            outer_radius: 1.25,
            inner_radius: 0.55,
            points: 10,
            anchor_offset: 2.4,
            scale: 1.55,
            spin: 0.9,
        }
    }
}

const FACE_COLOUR: u32 = 0xffffff;
const EMISSIVE_COLOUR: u32 = 0xff7fc7;
const INNER_COLOUR: u32 = 0xffd6ef;

/// A ten-point star sitting at an anchor above the tree, with its own sparkles.
#[derive(Clone, Debug)]
pub struct StarTopper {
    config: StarTopperConfig,
    outline: Vec<Vec3>,
    anchor_y: f32,
    time: f32,
    sparkles: Vec<Sparkles>,
}

impl StarTopper {
    /// Make a star that sits `anchor_offset` above `top_y`.
    pub fn new(config: StarTopperConfig, top_y: f32, seed: u64) -> Self {
        let outline = star_outline(&config);
        let sparkles = SparklesConfig::star_layers()
            .into_iter()
            .enumerate()
            .map(|(i, layer)| Sparkles::new(layer, seed.wrapping_add(i as u64)))
            .collect();

        Self {
            anchor_y: top_y + config.anchor_offset,
            config,
            outline,
            time: 0.,
            sparkles,
        }
    }

    /// The y of the centre of the star.
    #[inline]
    pub fn anchor_y(&self) -> f32 {
        self.anchor_y
    }

    /// The flat outline of the star, before spinning and scaling.
    pub fn outline(&self) -> &[Vec3] {
        &self.outline
    }

    fn orientation(&self) -> Quat {
        // Upright, facing the camera, with a gentle nod
        Quat::from_rotation_y(self.time * self.config.spin)
            * Quat::from_rotation_x((self.time * 0.7).sin() * 0.08)
    }

    fn place(&self, orientation: Quat, scale: f32, p: Vec3) -> Vec3 {
        Vec3::Y * self.anchor_y + orientation * (p * scale)
    }

    fn face(&self, orientation: Quat, scale: f32, colour: RGBColour, alpha: f32) -> Polygon {
        Polygon {
            centre: Vec3::Y * self.anchor_y,
            rim: self
                .outline
                .iter()
                .map(|&p| self.place(orientation, scale, p))
                .collect(),
            colour,
            alpha,
            blend: Blend::Additive,
        }
    }
}

/// The outline of the star in the xy plane, with the first point straight up.
fn star_outline(config: &StarTopperConfig) -> Vec<Vec3> {
    (0..config.points)
        .map(|i| {
            let angle = i as f32 / config.points as f32 * TAU + FRAC_PI_2;
            let radius = if i % 2 == 0 {
                config.outer_radius
            } else {
                config.inner_radius
            };
            Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.)
        })
        .collect()
}

impl Decoration for StarTopper {
    fn update(&mut self, dt: f32, elapsed: f32) {
        if elapsed.is_finite() {
            self.time = elapsed;
        }
        for sparkles in &mut self.sparkles {
            sparkles.update(dt, elapsed);
        }
    }

    fn emit(&self, out: &mut Primitives) {
        let orientation = self.orientation();
        let scale = self.config.scale;

        // Glow behind the star
        out.sprites.push(Sprite {
            position: Vec3::Y * self.anchor_y,
            size: self.config.outer_radius * scale * 10.,
            colour: hex(EMISSIVE_COLOUR),
            alpha: 0.35,
            blend: Blend::Additive,
            shape: SpriteShape::Dot,
        });

        out.polygons
            .push(self.face(orientation, scale, hex(EMISSIVE_COLOUR), 0.98));
        out.polygons
            .push(self.face(orientation, scale * 0.86, hex(INNER_COLOUR), 0.55));

        let mut rim: Vec<Vec3> = self
            .outline
            .iter()
            .map(|&p| self.place(orientation, scale, p))
            .collect();
        if let Some(&first) = rim.first() {
            rim.push(first);
        }
        out.strokes.push(Stroke {
            points: rim,
            width: 0.06 * scale,
            colour: hex(FACE_COLOUR),
            alpha: 0.9,
            dash: None,
        });

        let mut local = Primitives::default();
        for sparkles in &self.sparkles {
            sparkles.emit(&mut local);
        }
        local.transform(scale, |p| Vec3::Y * self.anchor_y + p * scale);
        out.append(&mut local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn outline_alternates_radii() {
        let config = StarTopperConfig::default();
        let star = StarTopper::new(config.clone(), 9.8, 1);

        assert_eq!(star.outline().len(), 10);
        for (i, p) in star.outline().iter().enumerate() {
            let expected = if i % 2 == 0 { 1.25 } else { 0.55 };
            assert!(approx_eq!(f32, p.length(), expected, epsilon = 1e-5));
        }
        assert!(approx_eq!(f32, star.outline()[0].y, 1.25, epsilon = 1e-5));
    }

    #[test]
    fn sits_above_the_tree() {
        let star = StarTopper::new(StarTopperConfig::default(), 9.8, 1);
        assert!(approx_eq!(f32, star.anchor_y(), 12.2, epsilon = 1e-5));
    }

    #[test]
    fn spinning_star_keeps_its_size() {
        let mut star = StarTopper::new(StarTopperConfig::default(), 0., 2);
        star.update(0.5, 3.7);

        let mut out = Primitives::default();
        star.emit(&mut out);

        let face = &out.polygons[0];
        for p in &face.rim {
            let distance = (*p - face.centre).length();
            assert!(distance <= 1.25 * 1.55 + 1e-4);
            assert!(distance >= 0.55 * 1.55 - 1e-4);
        }
        assert!(out.sprites.len() > 160);
    }
}
