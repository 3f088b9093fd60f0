//! This module projects [`Primitives`] through the camera and turns them into `egui` meshes.
//!
//! Sprites are textured quads. Additive blending uses premultiplied colours with zero alpha, so the
//! `egui` blend function adds them onto whatever is already there.

use super::{camera::OrbitCamera, SceneError};
use dx_particles::{
    decor::{Blend, Primitives, Sprite, SpriteShape, Stroke},
    hex, lerp_colour, RGBColour,
};
use egui::{
    epaint::Vertex, pos2, vec2, Color32, ColorImage, Context, Mesh, Pos2, Rect, Shape,
    TextureHandle, TextureOptions,
};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// The width and height of the generated sprite textures.
const TEXTURE_SIZE: usize = 64;

/// Sprites smaller than this are drawn at this size with their alpha reduced to match.
const MIN_SPRITE_PIXELS: f32 = 1.5;

/// Strokes thinner than this are drawn at this width and fainter.
const MIN_STROKE_PIXELS: f32 = 1.;

/// The most sprites that get a bloom halo each frame.
const MAX_GLOW_SPRITES: usize = 2000;

/// Linear fog from `near` to `far`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Also the background colour, as `0xRRGGBB`.
    pub colour: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            colour: 0x050103,
            near: 140.,
            far: 340.,
        }
    }
}

impl FogConfig {
    /// How much of the fog colour to mix in at `depth`.
    pub fn factor(&self, depth: f32) -> f32 {
        if self.far <= self.near {
            return if depth >= self.far { 1. } else { 0. };
        }
        ((depth - self.near) / (self.far - self.near)).clamp(0., 1.)
    }
}

/// Extra halos around bright additive sprites.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Glow {
    /// Sprites brighter than this get a halo.
    pub threshold: f32,

    pub intensity: f32,
}

/// The textures that sprites are drawn with.
pub(crate) struct SpriteTextures {
    dot: TextureHandle,
    flake: TextureHandle,
}

impl SpriteTextures {
    pub fn new(ctx: &Context) -> Self {
        Self {
            dot: ctx.load_texture("dx-sprite-dot", dot_image(), TextureOptions::LINEAR),
            flake: ctx.load_texture("dx-sprite-flake", flake_image(), TextureOptions::LINEAR),
        }
    }
}

/// A white image whose alpha is given by `f` of the offset from the centre, in `[-1, 1]`.
fn sprite_image(f: impl Fn(f32, f32) -> f32) -> ColorImage {
    let half = TEXTURE_SIZE as f32 / 2.;
    let pixels = (0..TEXTURE_SIZE * TEXTURE_SIZE)
        .map(|i| {
            let x = ((i % TEXTURE_SIZE) as f32 + 0.5 - half) / half;
            let y = ((i / TEXTURE_SIZE) as f32 + 0.5 - half) / half;
            Color32::from_white_alpha((f(x, y).clamp(0., 1.) * 255.).round() as u8)
        })
        .collect();

    ColorImage {
        size: [TEXTURE_SIZE, TEXTURE_SIZE],
        pixels,
    }
}

/// A round dot that fades out from a bright core.
fn dot_image() -> ColorImage {
    sprite_image(|x, y| {
        let t = (1. - (x * x + y * y).sqrt()).clamp(0., 1.);
        t * t * (3. - 2. * t)
    })
}

/// Six thin arms with a soft centre.
fn flake_image() -> ColorImage {
    sprite_image(|x, y| {
        let r = (x * x + y * y).sqrt();
        if r > 1. {
            return 0.;
        }

        // Distance from the nearest arm, which are every 60 degrees
        let sector = PI / 3.;
        let angle = y.atan2(x).rem_euclid(sector);
        let off_arm = angle.min(sector - angle).sin() * r;

        let arm = (1. - off_arm / 0.09).clamp(0., 1.) * (1. - r * 0.6);
        let core = (1. - r / 0.3).clamp(0., 1.);
        arm.max(core)
    })
}

/// Something on the screen, and how far in front of the camera it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Projected {
    pub pos: Pos2,
    pub depth: f32,
}

/// Maps world space onto a rectangle of the screen.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Projector {
    view: Mat4,
    projection: Mat4,
    rect: Rect,
    near: f32,
    far: f32,

    /// Pixels per world unit at a depth of 1.
    focal: f32,
}

impl Projector {
    pub fn new(camera: &OrbitCamera, rect: Rect, near: f32, far: f32) -> Result<Self, SceneError> {
        if !(rect.width() > 0. && rect.height() > 0.) {
            return Err(SceneError::EmptyViewport);
        }

        Ok(Self {
            view: camera.view()?,
            projection: camera.projection(rect.width() / rect.height())?,
            rect,
            near,
            far,
            focal: rect.height() / 2. / (camera.fov() / 2.).tan(),
        })
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Project a point, or return `None` if it's behind the camera or past the far plane.
    pub fn project(&self, p: Vec3) -> Option<Projected> {
        let view = self.view.transform_point3(p);
        let depth = -view.z;
        if !(depth > self.near && depth < self.far) {
            return None;
        }

        let clip = self.projection * view.extend(1.);
        let ndc = clip.truncate() / clip.w;
        let centre = self.rect.center();

        Some(Projected {
            pos: pos2(
                centre.x + ndc.x * self.rect.width() / 2.,
                centre.y - ndc.y * self.rect.height() / 2.,
            ),
            depth,
        })
    }

    /// The on-screen diameter of a point sprite of the given size.
    #[inline]
    pub fn point_pixels(&self, size: f32, depth: f32) -> f32 {
        size * self.rect.height() / 2. / depth
    }

    /// The on-screen length of a world distance seen face on.
    #[inline]
    pub fn world_pixels(&self, length: f32, depth: f32) -> f32 {
        length * self.focal / depth
    }
}

/// Turn a colour and opacity into a premultiplied [`Color32`] for the given blend.
pub(crate) fn colour32(colour: RGBColour, alpha: f32, blend: Blend) -> Color32 {
    let alpha = if alpha.is_finite() {
        alpha.clamp(0., 1.)
    } else {
        0.
    };
    let [r, g, b] = colour.map(|c| (c.clamp(0., 1.) * alpha * 255.).round() as u8);

    match blend {
        Blend::Additive => Color32::from_rgba_premultiplied(r, g, b, 0),
        Blend::Normal => Color32::from_rgba_premultiplied(r, g, b, (alpha * 255.).round() as u8),
    }
}

/// Add a square quad with the whole texture on it.
fn push_quad(mesh: &mut Mesh, centre: Pos2, half: f32, rotation: f32, colour: Color32) {
    let (sin, cos) = rotation.sin_cos();
    let index = mesh.vertices.len() as u32;

    for (u, v) in [(0., 0.), (1., 0.), (1., 1.), (0., 1.)] {
        let dx = (u * 2. - 1.) * half;
        let dy = (v * 2. - 1.) * half;
        mesh.vertices.push(Vertex {
            pos: centre + vec2(dx * cos - dy * sin, dx * sin + dy * cos),
            uv: pos2(u, v),
            color: colour,
        });
    }

    mesh.add_triangle(index, index + 1, index + 2);
    mesh.add_triangle(index, index + 2, index + 3);
}

/// Paints primitives with one projector, a set of textures, and optionally fog and glow.
pub(crate) struct PrimitivePainter<'a> {
    pub projector: &'a Projector,
    pub textures: &'a SpriteTextures,
    pub fog: Option<FogConfig>,
    pub glow: Option<Glow>,
}

/// A sprite that made it onto the screen.
#[derive(Clone, Copy, Debug)]
struct PlacedSprite {
    at: Projected,
    half: f32,
    colour: RGBColour,
    alpha: f32,
    rotation: f32,
    flake: bool,
}

impl PrimitivePainter<'_> {
    /// Project a sprite, apply the minimum size and fog, and cull it if it's off screen.
    fn place(&self, sprite: &Sprite) -> Option<PlacedSprite> {
        let at = self.projector.project(sprite.position)?;

        let mut diameter = self.projector.point_pixels(sprite.size, at.depth);
        let mut alpha = sprite.alpha;
        if diameter < MIN_SPRITE_PIXELS {
            alpha *= (diameter / MIN_SPRITE_PIXELS).powi(2);
            diameter = MIN_SPRITE_PIXELS;
        }
        let half = diameter / 2.;

        if !self.projector.rect().expand(half).contains(at.pos) || !(alpha > 0.) {
            return None;
        }

        let mut colour = sprite.colour;
        if let Some(fog) = &self.fog {
            let f = fog.factor(at.depth);
            match sprite.blend {
                Blend::Normal => colour = lerp_colour(colour, hex(fog.colour), f),
                Blend::Additive => alpha *= 1. - f,
            }
        }

        let (rotation, flake) = match sprite.shape {
            SpriteShape::Dot => (0., false),
            SpriteShape::Flake { rotation } => (rotation, true),
        };

        Some(PlacedSprite {
            at,
            half,
            colour,
            alpha,
            rotation,
            flake,
        })
    }

    /// Build the meshes for a list of sprites that all share a blend.
    fn sprite_meshes(&self, sprites: &[PlacedSprite], blend: Blend) -> [Mesh; 2] {
        let mut dots = Mesh::with_texture(self.textures.dot.id());
        let mut flakes = Mesh::with_texture(self.textures.flake.id());

        for sprite in sprites {
            let mesh = if sprite.flake { &mut flakes } else { &mut dots };
            push_quad(
                mesh,
                sprite.at.pos,
                sprite.half,
                sprite.rotation,
                colour32(sprite.colour, sprite.alpha, blend),
            );
        }

        [dots, flakes]
    }

    /// Soft halos around the brightest sprites, with at most [`MAX_GLOW_SPRITES`] of them.
    fn glow_mesh(&self, sprites: &[PlacedSprite], glow: Glow) -> Mesh {
        let mut mesh = Mesh::with_texture(self.textures.dot.id());
        let stride = (sprites.len() / MAX_GLOW_SPRITES).max(1);
        let headroom = (1. - glow.threshold).max(1e-3);

        for sprite in sprites.iter().step_by(stride) {
            let brightness = sprite.colour.into_iter().fold(0., f32::max) * sprite.alpha;
            if brightness <= glow.threshold {
                continue;
            }

            let alpha = glow.intensity * 0.35 * (brightness - glow.threshold) / headroom;
            push_quad(
                &mut mesh,
                sprite.at.pos,
                sprite.half * 3.,
                0.,
                colour32(sprite.colour, alpha, Blend::Additive),
            );
        }

        mesh
    }

    /// Cut a stroke into on-screen polylines.
    fn stroke_shapes(&self, stroke: &Stroke, out: &mut Vec<Shape>) {
        let mut run: Vec<Pos2> = Vec::new();
        let mut depth_sum = 0.;
        let mut travelled = 0.;

        let flush = |run: &mut Vec<Pos2>, depth_sum: &mut f32, out: &mut Vec<Shape>| {
            if run.len() >= 2 {
                let depth = *depth_sum / run.len() as f32;
                let mut width = self.projector.world_pixels(stroke.width, depth);
                let mut alpha = stroke.alpha;
                if width < MIN_STROKE_PIXELS {
                    alpha *= width / MIN_STROKE_PIXELS;
                    width = MIN_STROKE_PIXELS;
                }
                if let Some(fog) = &self.fog {
                    alpha *= 1. - fog.factor(depth);
                }

                out.push(Shape::line(
                    std::mem::take(run),
                    egui::Stroke::new(width, colour32(stroke.colour, alpha, Blend::Additive)),
                ));
            }
            run.clear();
            *depth_sum = 0.;
        };

        for pair in stroke.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let midpoint = travelled + a.distance(b) / 2.;
            travelled += a.distance(b);

            // Dashes are resolved to whole segments
            let visible = stroke
                .dash
                .filter(|dash| *dash > 0.)
                .map_or(true, |dash| (midpoint / dash) as u64 % 2 == 0);

            match (visible, self.projector.project(a), self.projector.project(b)) {
                (true, Some(pa), Some(pb)) => {
                    if run.is_empty() {
                        run.push(pa.pos);
                        depth_sum += pa.depth;
                    }
                    run.push(pb.pos);
                    depth_sum += pb.depth;
                }
                _ => flush(&mut run, &mut depth_sum, out),
            }
        }
        flush(&mut run, &mut depth_sum, out);
    }

    /// Paint everything in `primitives`. Normal sprites go first from back to front, then the
    /// filled shapes and lines, then the additive sprites.
    pub fn paint(&self, painter: &egui::Painter, primitives: &Primitives) {
        let mut normal = Vec::new();
        let mut additive = Vec::new();
        for sprite in &primitives.sprites {
            if let Some(placed) = self.place(sprite) {
                match sprite.blend {
                    Blend::Normal => normal.push(placed),
                    Blend::Additive => additive.push(placed),
                }
            }
        }
        normal.sort_by(|a, b| b.at.depth.total_cmp(&a.at.depth));

        let mut shapes = Vec::new();
        shapes.extend(self.sprite_meshes(&normal, Blend::Normal).map(Shape::mesh));

        let mut fill = Mesh::default();
        for polygon in &primitives.polygons {
            let Some(centre) = self.projector.project(polygon.centre) else {
                continue;
            };
            let rim: Option<Vec<Projected>> = polygon
                .rim
                .iter()
                .map(|&p| self.projector.project(p))
                .collect();
            let Some(rim) = rim.filter(|rim| rim.len() >= 3) else {
                continue;
            };

            let colour = colour32(polygon.colour, polygon.alpha, polygon.blend);
            let hub = fill.vertices.len() as u32;
            fill.colored_vertex(centre.pos, colour);
            for p in &rim {
                fill.colored_vertex(p.pos, colour);
            }
            let n = rim.len() as u32;
            for i in 0..n {
                fill.add_triangle(hub, hub + 1 + i, hub + 1 + (i + 1) % n);
            }
        }
        shapes.push(Shape::mesh(fill));

        for stroke in &primitives.strokes {
            self.stroke_shapes(stroke, &mut shapes);
        }

        if let Some(glow) = self.glow {
            shapes.push(Shape::mesh(self.glow_mesh(&additive, glow)));
        }
        shapes.extend(self.sprite_meshes(&additive, Blend::Additive).map(Shape::mesh));

        painter.extend(shapes.into_iter().filter(|shape| match shape {
            Shape::Mesh(mesh) => !mesh.is_empty(),
            _ => true,
        }));
    }
}

/// Fill the rectangle with the background colour.
pub(crate) fn paint_background(painter: &egui::Painter, rect: Rect, fog: &FogConfig) {
    painter.rect_filled(rect, 0., colour32(hex(fog.colour), 1., Blend::Normal));
}
