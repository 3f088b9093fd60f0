//! This module contains the decorative particles that surround the tree.
//!
//! Each decoration owns its own random layout, advances its own animation in
//! [`Decoration::update`], and describes what it looks like in [`Decoration::emit`] as a list of
//! [`Sprite`]s and [`Stroke`]s in its local space. The client decides where that local space sits
//! in the world and how to paint the primitives.

use crate::colour::RGBColour;
use glam::Vec3;

mod dust;
mod galaxy;
mod halo;
mod nebula;
mod snow;
mod sparkles;
mod star;

pub use self::{
    dust::{DustDisk, DustDiskConfig},
    galaxy::{GalaxyBand, GalaxyBandConfig},
    halo::{GroundHalo, GroundHaloConfig},
    nebula::{NebulaFloor, NebulaFloorConfig, OrbitArc},
    snow::{Snow, SnowConfig},
    sparkles::{Sparkles, SparklesConfig},
    star::{StarTopper, StarTopperConfig},
};

/// How a primitive gets mixed with whatever is behind it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Blend {
    /// Add light, so overlapping primitives glow.
    Additive,

    /// Ordinary alpha blending.
    Normal,
}

/// The outline of a [`Sprite`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpriteShape {
    /// A soft round dot.
    Dot,

    /// A six-armed snowflake, turned by the given angle in radians.
    Flake { rotation: f32 },
}

/// A single billboarded point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    /// The centre of the sprite.
    pub position: Vec3,

    /// The point size of the sprite. Like an attenuated point sprite, it covers
    /// `size * viewport_height / (2 * depth)` pixels.
    pub size: f32,

    /// The colour of the sprite.
    pub colour: RGBColour,

    /// The opacity in `[0, 1]`.
    pub alpha: f32,

    /// How to mix the sprite.
    pub blend: Blend,

    /// What to draw.
    pub shape: SpriteShape,
}

/// A polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    /// The points along the line.
    pub points: Vec<Vec3>,

    /// The width in world units.
    pub width: f32,

    /// The colour of the line.
    pub colour: RGBColour,

    /// The opacity in `[0, 1]`.
    pub alpha: f32,

    /// If `Some`, the line is split into dashes of this many world units with gaps of the same
    /// length.
    pub dash: Option<f32>,
}

/// A filled shape drawn as a fan of triangles around its centre, so it only needs to be star
/// shaped around that centre rather than convex.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// The hub of the fan.
    pub centre: Vec3,

    /// The outline, in order. The last point joins back to the first.
    pub rim: Vec<Vec3>,

    /// The fill colour.
    pub colour: RGBColour,

    /// The opacity in `[0, 1]`.
    pub alpha: f32,

    /// How to mix the fill.
    pub blend: Blend,
}

/// Everything a set of decorations wants drawn this frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitives {
    /// All the sprites.
    pub sprites: Vec<Sprite>,

    /// All the strokes.
    pub strokes: Vec<Stroke>,

    /// All the filled shapes.
    pub polygons: Vec<Polygon>,
}

impl Primitives {
    /// Empty every list but keep the allocations.
    pub fn clear(&mut self) {
        self.sprites.clear();
        self.strokes.clear();
        self.polygons.clear();
    }

    /// Move every primitive by `f`, which maps local space into some other space, and scale sizes
    /// and widths by `scale`.
    pub fn transform(&mut self, scale: f32, f: impl Fn(Vec3) -> Vec3) {
        for sprite in &mut self.sprites {
            sprite.position = f(sprite.position);
            sprite.size *= scale;
        }
        for stroke in &mut self.strokes {
            stroke.points.iter_mut().for_each(|p| *p = f(*p));
            stroke.width *= scale;
            stroke.dash = stroke.dash.map(|dash| dash * scale);
        }
        for polygon in &mut self.polygons {
            polygon.centre = f(polygon.centre);
            polygon.rim.iter_mut().for_each(|p| *p = f(*p));
        }
    }

    /// Move everything from `other` onto the end of this.
    pub fn append(&mut self, other: &mut Self) {
        self.sprites.append(&mut other.sprites);
        self.strokes.append(&mut other.strokes);
        self.polygons.append(&mut other.polygons);
    }
}

/// Something decorative that animates over time and can describe itself as primitives.
pub trait Decoration {
    /// Advance the animation. `dt` is the time since the last frame and `elapsed` is the time since
    /// the scene was built, both in seconds.
    fn update(&mut self, dt: f32, elapsed: f32);

    /// Push this decoration's primitives for the current frame.
    fn emit(&self, out: &mut Primitives);
}

/// Rotate a point about the y axis.
#[inline]
pub(crate) fn rotate_y(p: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(p.x * cos + p.z * sin, p.y, -p.x * sin + p.z * cos)
}

/// A dt that is safe to integrate with.
#[inline]
pub(crate) fn usable_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0. {
        dt
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rotate_y_quarter_turn() {
        let p = rotate_y(Vec3::X, FRAC_PI_2);
        assert!(approx_eq!(f32, p.x, 0., epsilon = 1e-6));
        assert!(approx_eq!(f32, p.z, -1., epsilon = 1e-6));

        let q = rotate_y(Vec3::new(3., 2., 0.), 1.234);
        assert!(approx_eq!(f32, Vec3::new(q.x, 0., q.z).length(), 3., epsilon = 1e-5));
        assert_eq!(q.y, 2.);
    }
}
