//! This module draws the screen-space effects over the scene: bloom halos, a vignette, and a light
//! film grain.

use super::paint::Glow;
use dx_particles::smoothstep;
use egui::{pos2, vec2, Color32, Mesh, Rect};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for the post-processing effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFxConfig {
    pub bloom_threshold: f32,
    pub bloom_intensity: f32,

    /// Where the vignette starts, as a fraction in from the edges.
    pub vignette_offset: f32,

    /// How dark the vignette gets at the corners.
    pub vignette_darkness: f32,

    /// The opacity of each grain speck.
    pub noise_opacity: f32,

    /// Grain specks per thousand square pixels.
    pub grain_density: f32,
}

impl Default for PostFxConfig {
    fn default() -> Self {
        Self {
            bloom_threshold: 0.55,
            bloom_intensity: 0.45,
            vignette_offset: 0.18,
            vignette_darkness: 0.45,
            noise_opacity: 0.02,
            grain_density: 1.,
        }
    }
}

/// The most grain specks in one frame.
const MAX_GRAIN: usize = 6000;

const VIGNETTE_RINGS: usize = 12;
const VIGNETTE_SEGMENTS: usize = 48;

/// The vignette extends this far out in units of the half width and half height, far enough to
/// cover the corners.
const VIGNETTE_REACH: f32 = 1.5;

impl PostFxConfig {
    pub(crate) fn glow(&self) -> Glow {
        Glow {
            threshold: self.bloom_threshold,
            intensity: self.bloom_intensity,
        }
    }

    /// How dark the vignette is at a normalised elliptical radius, where 1 touches the middle of
    /// each edge.
    pub fn vignette_alpha(&self, radius: f32) -> f32 {
        let inner = 0.5 + self.vignette_offset;
        self.vignette_darkness.clamp(0., 1.) * smoothstep(radius, inner, VIGNETTE_REACH)
    }

    /// A mesh of black rings that darkens towards the edges of `rect`.
    pub fn vignette_mesh(&self, rect: Rect) -> Mesh {
        let mut mesh = Mesh::default();
        let centre = rect.center();
        let half = rect.size() / 2.;

        for ring in 0..=VIGNETTE_RINGS {
            let radius = ring as f32 / VIGNETTE_RINGS as f32 * VIGNETTE_REACH;
            let alpha = (self.vignette_alpha(radius) * 255.).round() as u8;
            let colour = Color32::from_black_alpha(alpha);

            for segment in 0..VIGNETTE_SEGMENTS {
                let angle = segment as f32 / VIGNETTE_SEGMENTS as f32 * TAU;
                let offset = vec2(angle.cos() * half.x, angle.sin() * half.y) * radius;
                mesh.colored_vertex(centre + offset, colour);
            }
        }

        let n = VIGNETTE_SEGMENTS as u32;
        for ring in 0..VIGNETTE_RINGS as u32 {
            for segment in 0..n {
                let a = ring * n + segment;
                let b = ring * n + (segment + 1) % n;
                mesh.add_triangle(a, b, a + n);
                mesh.add_triangle(b, b + n, a + n);
            }
        }

        mesh
    }

    /// A mesh of single pixel specks of light and dark scattered over `rect`.
    pub fn grain_mesh<R: Rng + ?Sized>(&self, rect: Rect, rng: &mut R) -> Mesh {
        let mut mesh = Mesh::default();
        let alpha = self.noise_opacity.clamp(0., 1.);
        if alpha <= 0. || !(rect.area() > 0.) {
            return mesh;
        }

        let count = ((rect.area() / 1000. * self.grain_density) as usize).min(MAX_GRAIN);
        for _ in 0..count {
            let at = pos2(
                rng.gen_range(rect.min.x..rect.max.x),
                rng.gen_range(rect.min.y..rect.max.y),
            );
            let strength = (alpha * rng.gen_range(0.5..=1.) * 255.).round() as u8;
            let colour = if rng.gen() {
                Color32::from_white_alpha(strength)
            } else {
                Color32::from_black_alpha(strength)
            };
            mesh.add_colored_rect(Rect::from_min_size(at, vec2(1., 1.)), colour);
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rect() -> Rect {
        Rect::from_min_size(pos2(0., 0.), vec2(800., 600.))
    }

    #[test]
    fn vignette_is_clear_in_the_middle() {
        let config = PostFxConfig::default();
        assert_eq!(config.vignette_alpha(0.), 0.);
        assert_eq!(config.vignette_alpha(0.6), 0.);
        assert!(config.vignette_alpha(1.) > 0.);
        assert_eq!(config.vignette_alpha(VIGNETTE_REACH), 0.45);

        let mesh = config.vignette_mesh(rect());
        assert_eq!(mesh.vertices.len(), (VIGNETTE_RINGS + 1) * VIGNETTE_SEGMENTS);
        assert_eq!(mesh.vertices[0].color.a(), 0);
        assert_eq!(mesh.vertices.last().unwrap().color.a(), 115);
        assert!(mesh.is_valid());
    }

    #[test]
    fn grain_stays_in_the_rect() {
        let config = PostFxConfig::default();
        let mut rng = StdRng::seed_from_u64(12345);

        let mesh = config.grain_mesh(rect(), &mut rng);
        assert_eq!(mesh.vertices.len(), 480 * 4);
        for vertex in &mesh.vertices {
            assert!(rect().expand(1.).contains(vertex.pos));
            assert!(vertex.color.a() <= 6);
        }

        let silent = PostFxConfig {
            noise_opacity: 0.,
            ..PostFxConfig::default()
        };
        assert!(silent.grain_mesh(rect(), &mut rng).is_empty());
    }
}
