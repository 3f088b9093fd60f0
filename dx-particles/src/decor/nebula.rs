//! The nebula floor: a long stretch of twinkling dust that recedes into the distance behind the
//! tree, with a few dashed orbit arcs near its base.

use super::{rotate_y, Blend, Decoration, Primitives, Sprite, SpriteShape, Stroke};
use crate::{colour::hex, power_law};
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// One dashed arc on the floor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitArc {
    pub radius: f32,
    pub y: f32,
    pub start: f32,
    pub end: f32,

    /// The extra rotation of this arc about the y axis.
    pub rotation: f32,

    pub opacity: f32,
}

/// The config for the [`NebulaFloor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NebulaFloorConfig {
    pub y: f32,
    pub count: usize,

    /// The `z` of the nearest dust.
    pub z_near: f32,

    /// The `z` of the furthest dust.
    pub z_far: f32,

    /// Above 1 pushes more of the dust towards `z_far`.
    pub depth_power: f32,

    /// How far the floor is tipped towards the camera, in radians.
    pub tilt: f32,

    pub size: f32,
    pub arcs: Vec<OrbitArc>,
}

impl Default for NebulaFloorConfig {
    fn default() -> Self {
        Self {
            y: -10.2,
            count: 6000,
            z_near: -10.,
            z_far: -240.,
            depth_power: 1.65,
            tilt: -0.18,
            size: 0.45,
            arcs: vec![
                OrbitArc {
                    radius: 13.,
                    y: 0.25,
                    start: -0.5,
                    end: PI * 1.35,
                    rotation: 0.2,
                    opacity: 0.16,
                },
                OrbitArc {
                    radius: 20.,
                    y: 0.05,
                    start: 0.2,
                    end: PI * 1.65,
                    rotation: -0.35,
                    opacity: 0.12,
                },
                OrbitArc {
                    radius: 28.,
                    y: -0.15,
                    start: -0.2,
                    end: PI * 1.25,
                    rotation: 0.55,
                    opacity: 0.09,
                },
            ],
        }
    }
}

const COLD_COLOUR: u32 = 0x9fe7ff;
const WARM_COLOUR: u32 = 0xff78d6;
const ARC_COLOUR: u32 = 0xcaa6ff;

/// Seeds above this get the warm colour, which is about one speck in eight.
const WARM_THRESHOLD: f32 = 0.88;

const ARC_SEGMENTS: usize = 140;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Mote {
    position: Vec3,
    seed: f32,
}

/// Twinkling floor dust and orbit arcs.
#[derive(Clone, Debug)]
pub struct NebulaFloor {
    config: NebulaFloorConfig,
    motes: Vec<Mote>,
    arcs: Vec<Vec<Vec3>>,
    time: f32,
}

impl NebulaFloor {
    pub fn new(config: NebulaFloorConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let motes = (0..config.count)
            .map(|_| {
                let t = power_law(&mut rng, config.depth_power);
                let z = config.z_near + (config.z_far - config.z_near) * t;
                let spread = 26. + (-z) * 0.55;

                Mote {
                    position: Vec3::new(
                        (rng.gen::<f32>() - 0.5) * spread,
                        (rng.gen::<f32>() - 0.5) * 1.6,
                        z,
                    ),
                    seed: rng.gen(),
                }
            })
            .collect();

        let arcs = config.arcs.iter().map(arc_points).collect();

        Self {
            config,
            motes,
            arcs,
            time: 0.,
        }
    }

    /// Place a local point in the tipped floor.
    fn place(&self, p: Vec3) -> Vec3 {
        let (sin, cos) = self.config.tilt.sin_cos();
        Vec3::new(p.x, p.y * cos - p.z * sin, p.y * sin + p.z * cos) + Vec3::Y * self.config.y
    }
}

/// Sample an arc as a polyline, already turned by its own rotation plus the shared offset.
fn arc_points(arc: &OrbitArc) -> Vec<Vec3> {
    (0..=ARC_SEGMENTS)
        .map(|i| {
            let t = i as f32 / ARC_SEGMENTS as f32;
            let angle = arc.start + (arc.end - arc.start) * t;
            let p = Vec3::new(angle.cos() * arc.radius, arc.y, angle.sin() * arc.radius);
            rotate_y(p, arc.rotation + 0.08)
        })
        .collect()
}

/// How bright a mote is at the given time, in `[0.7, 1]`.
pub(crate) fn twinkle(time: f32, seed: f32) -> f32 {
    0.85 + 0.15 * (time * 1.2 + seed * 19.).sin()
}

impl Decoration for NebulaFloor {
    fn update(&mut self, _dt: f32, elapsed: f32) {
        if elapsed.is_finite() {
            self.time = elapsed;
        }
    }

    fn emit(&self, out: &mut Primitives) {
        let time = self.time;
        let cold = hex(COLD_COLOUR);
        let warm = hex(WARM_COLOUR);

        out.sprites.extend(self.motes.iter().map(|mote| {
            let phase = mote.seed * TAU;
            let flowing = mote.position
                + Vec3::new(
                    (time * 0.35 + phase).sin() * 0.08,
                    (time * 0.25 + phase).cos() * 0.06,
                    0.,
                );

            // Distant dust fades out
            let depth = -mote.position.z;
            let fade = 1. - crate::smoothstep(depth, 12., 210.);

            Sprite {
                position: self.place(flowing),
                size: self.config.size,
                colour: if mote.seed > WARM_THRESHOLD { warm } else { cold },
                alpha: fade * twinkle(time, mote.seed),
                blend: Blend::Additive,
                shape: SpriteShape::Dot,
            }
        }));

        out.strokes
            .extend(self.config.arcs.iter().zip(&self.arcs).map(|(arc, points)| Stroke {
                points: points.iter().map(|&p| self.place(p)).collect(),
                width: 0.08,
                colour: hex(ARC_COLOUR),
                alpha: arc.opacity,
                dash: Some(1.2),
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motes_stay_in_their_wedge() {
        let config = NebulaFloorConfig::default();
        let floor = NebulaFloor::new(config.clone(), 4);

        for mote in &floor.motes {
            let p = mote.position;
            assert!(p.z <= config.z_near && p.z >= config.z_far);
            assert!(p.x.abs() <= (26. + (-p.z) * 0.55) / 2. + 1e-4);
            assert!(p.y.abs() <= 0.8 + 1e-5);
        }
    }

    #[test]
    fn twinkle_bounds() {
        for i in 0..100 {
            let value = twinkle(i as f32 * 0.37, (i as f32 / 100.).fract());
            assert!((0.7 - 1e-6..=1. + 1e-6).contains(&value));
        }
    }

    #[test]
    fn about_one_in_eight_is_warm() {
        let floor = NebulaFloor::new(NebulaFloorConfig::default(), 8);
        let mut out = Primitives::default();
        floor.emit(&mut out);

        let warm = hex(WARM_COLOUR);
        let count = out.sprites.iter().filter(|s| s.colour == warm).count();
        let fraction = count as f32 / out.sprites.len() as f32;
        assert!((0.08..0.16).contains(&fraction), "{fraction}");

        assert_eq!(out.strokes.len(), 3);
        for stroke in out.strokes {
            assert_eq!(stroke.points.len(), ARC_SEGMENTS + 1);
        }
    }
}
