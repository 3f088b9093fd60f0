//! This module handles the [`Scene`]: the particle tree, everything decorating it, and the camera
//! looking at them.

mod camera;
mod paint;
mod postfx;

pub use self::{
    camera::{CameraConfig, OrbitCamera},
    paint::FogConfig,
    postfx::PostFxConfig,
};

use self::paint::{paint_background, PrimitivePainter, Projector, SpriteTextures};
use dx_particles::{
    decor::{
        Blend, Decoration, DustDisk, DustDiskConfig, GalaxyBand, GalaxyBandConfig, GroundHalo,
        GroundHaloConfig, NebulaFloor, NebulaFloorConfig, Primitives, Snow, SnowConfig, Sparkles,
        SparklesConfig, Sprite, SpriteShape, StarTopper, StarTopperConfig,
    },
    FieldConfig, ParticleField, TreeRotation, TreeRotationConfig,
};
use dx_shared::Mode;
use glam::{Affine3A, Quat, Vec2, Vec3};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

/// An error from drawing the scene.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("the camera position is not finite")]
    NonFiniteCamera,

    #[error("the viewport has no area")]
    EmptyViewport,

    #[error("rendering panicked: {0}")]
    Panic(String),
}

/// The config for everything in the [`Scene`] apart from the particle field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// The seed for every random layout in the scene.
    pub seed: u64,

    pub camera: CameraConfig,
    pub rotation: TreeRotationConfig,

    /// Where the tree and its floor sit in the world.
    pub tree_offset: [f32; 3],

    /// How much the tree and its floor are scaled up.
    pub tree_scale: f32,

    /// The point size of each tree particle.
    pub point_size: f32,

    /// The opacity of each tree particle.
    pub point_opacity: f32,

    pub nebula: NebulaFloorConfig,
    pub dust: Vec<DustDiskConfig>,
    pub halos: Vec<GroundHaloConfig>,
    pub galaxy: GalaxyBandConfig,
    pub star: StarTopperConfig,
    pub snow: SnowConfig,
    pub sparkles: Vec<SparklesConfig>,

    pub fog: FogConfig,
    pub postfx: PostFxConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            camera: CameraConfig::default(),
            rotation: TreeRotationConfig::default(),
            tree_offset: [0., -3.5, 0.],
            tree_scale: 1.5,
            point_size: 0.32,
            point_opacity: 0.95,
            nebula: NebulaFloorConfig::default(),
            dust: vec![DustDiskConfig::default(), DustDiskConfig::under()],
            halos: vec![GroundHaloConfig::default(), GroundHaloConfig::inner()],
            galaxy: GalaxyBandConfig::default(),
            star: StarTopperConfig::default(),
            snow: SnowConfig::default(),
            sparkles: SparklesConfig::background_layers(),
            fog: FogConfig::default(),
            postfx: PostFxConfig::default(),
        }
    }
}

/// The whole 3D scene.
pub struct Scene {
    config: SceneConfig,
    field: ParticleField,
    rotation: TreeRotation,
    camera: OrbitCamera,

    /// Decorations that turn and scale with the tree.
    tree_decor: Vec<Box<dyn Decoration>>,

    /// Decorations that stay put in the world.
    world_decor: Vec<Box<dyn Decoration>>,

    elapsed: f32,

    /// Made on the first paint, since they need the `egui` context.
    textures: Option<SpriteTextures>,

    grain_rng: StdRng,

    /// Reused between frames.
    primitives: Primitives,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("particles", &self.field.len())
            .field("rotation", &self.rotation.angle())
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Generate a new scene from scratch.
    #[instrument(skip_all)]
    pub fn new(field_config: &FieldConfig, config: &SceneConfig) -> Self {
        let seed = config.seed;
        let mut rng = StdRng::seed_from_u64(seed);
        let field = ParticleField::generate(field_config, &mut rng);

        // An empty field still gets a star where the top of the tree would be
        let top_y = field.max_y().unwrap_or(field_config.height / 2.);

        let mut tree_decor: Vec<Box<dyn Decoration>> = vec![
            Box::new(NebulaFloor::new(config.nebula.clone(), seed.wrapping_add(1))),
            Box::new(GalaxyBand::new(config.galaxy.clone(), seed.wrapping_add(2))),
            Box::new(StarTopper::new(config.star.clone(), top_y, seed.wrapping_add(3))),
        ];
        tree_decor.extend(config.dust.iter().enumerate().map(|(i, dust)| {
            Box::new(DustDisk::new(dust.clone(), seed.wrapping_add(10 + i as u64)))
                as Box<dyn Decoration>
        }));
        tree_decor.extend(config.halos.iter().enumerate().map(|(i, halo)| {
            Box::new(GroundHalo::new(halo.clone(), seed.wrapping_add(20 + i as u64)))
                as Box<dyn Decoration>
        }));

        let mut world_decor: Vec<Box<dyn Decoration>> =
            vec![Box::new(Snow::new(config.snow.clone(), seed.wrapping_add(4)))];
        world_decor.extend(config.sparkles.iter().enumerate().map(|(i, layer)| {
            Box::new(Sparkles::new(layer.clone(), seed.wrapping_add(30 + i as u64)))
                as Box<dyn Decoration>
        }));

        debug!(
            particles = field.len(),
            tree_decor = tree_decor.len(),
            world_decor = world_decor.len(),
            "Built scene"
        );

        Self {
            config: config.clone(),
            field,
            rotation: TreeRotation::new(config.rotation),
            camera: OrbitCamera::new(&config.camera),
            tree_decor,
            world_decor,
            elapsed: 0.,
            textures: None,
            grain_rng: StdRng::seed_from_u64(seed.wrapping_add(40)),
            primitives: Primitives::default(),
        }
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn rotation(&self) -> &TreeRotation {
        &self.rotation
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Seconds since the scene was built.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance everything by `dt` seconds, moving the particles towards `mode` and easing the tree
    /// towards `rotation_target` if there is one.
    pub fn update(&mut self, mode: Mode, dt: f32, rotation_target: Option<f32>) {
        self.field.step(mode, dt);
        self.rotation.advance(dt, rotation_target);

        if dt.is_finite() && dt > 0. {
            self.elapsed += dt;
        }
        for decoration in self.tree_decor.iter_mut().chain(&mut self.world_decor) {
            decoration.update(dt, self.elapsed);
        }
    }

    /// Orbit the camera by a drag of `delta` pixels.
    pub fn drag(&mut self, delta: Vec2, viewport_height: f32) {
        self.camera.drag(delta, viewport_height);
    }

    /// Where the tree group sits in the world this frame.
    fn tree_transform(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            Vec3::splat(self.config.tree_scale),
            Quat::from_rotation_y(self.rotation.angle()),
            Vec3::from(self.config.tree_offset),
        )
    }

    /// Paint the scene over the whole clip rect of `painter`. Post-processing is only drawn when
    /// `postfx` is set.
    pub fn paint(&mut self, painter: &egui::Painter, postfx: bool) -> Result<(), SceneError> {
        let rect = painter.clip_rect();
        let projector = Projector::new(
            &self.camera,
            rect,
            self.config.camera.near,
            self.config.camera.far,
        )?;
        let tree = self.tree_transform();
        let scale = self.config.tree_scale;

        let textures = &*self
            .textures
            .get_or_insert_with(|| SpriteTextures::new(painter.ctx()));

        paint_background(painter, rect, &self.config.fog);

        let glow = postfx.then(|| self.config.postfx.glow());
        let fogged = PrimitivePainter {
            projector: &projector,
            textures,
            fog: Some(self.config.fog),
            glow,
        };
        let unfogged = PrimitivePainter { fog: None, ..fogged };

        // The floor, the galaxy and the star
        self.primitives.clear();
        for decoration in &self.tree_decor {
            decoration.emit(&mut self.primitives);
        }
        self.primitives.transform(scale, |p| tree.transform_point3(p));
        fogged.paint(painter, &self.primitives);

        // The tree itself
        self.primitives.clear();
        let (size, alpha) = (self.config.point_size * scale, self.config.point_opacity);
        self.primitives.sprites.extend(
            self.field
                .current()
                .iter()
                .zip(self.field.colours())
                .map(|(&position, &colour)| Sprite {
                    position: tree.transform_point3(position),
                    size,
                    colour,
                    alpha,
                    blend: Blend::Additive,
                    shape: SpriteShape::Dot,
                }),
        );
        unfogged.paint(painter, &self.primitives);

        // Snow and sparkles
        self.primitives.clear();
        for decoration in &self.world_decor {
            decoration.emit(&mut self.primitives);
        }
        fogged.paint(painter, &self.primitives);

        if postfx {
            let config = &self.config.postfx;
            painter.add(egui::Shape::mesh(config.vignette_mesh(rect)));
            painter.add(egui::Shape::mesh(config.grain_mesh(rect, &mut self.grain_rng)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn small_field() -> FieldConfig {
        FieldConfig {
            count: 200,
            ..FieldConfig::default()
        }
    }

    fn paint_once(scene: &mut Scene, postfx: bool) -> Result<(), SceneError> {
        let ctx = egui::Context::default();
        let mut result = Ok(());
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                result = scene.paint(ui.painter(), postfx);
            });
        });
        result
    }

    #[test]
    fn the_same_seed_builds_the_same_tree() {
        let a = Scene::new(&small_field(), &SceneConfig::default());
        let b = Scene::new(&small_field(), &SceneConfig::default());
        assert_eq!(a.field().assembled(), b.field().assembled());

        let other = Scene::new(
            &small_field(),
            &SceneConfig {
                seed: 7,
                ..SceneConfig::default()
            },
        );
        assert_ne!(a.field().assembled(), other.field().assembled());
    }

    #[test]
    fn exploding_moves_the_particles_out() {
        let mut scene = Scene::new(&small_field(), &SceneConfig::default());
        for _ in 0..600 {
            scene.update(Mode::Exploded, 1. / 60., None);
        }

        assert!(scene.field().max_distance_to(Mode::Exploded) < 1e-2);
        assert!(approx_eq!(f32, scene.elapsed(), 10., epsilon = 1e-3));
        assert!(approx_eq!(f32, scene.rotation().angle(), 0.8, epsilon = 1e-3));
    }

    #[test]
    fn bad_frames_are_ignored() {
        let mut scene = Scene::new(&small_field(), &SceneConfig::default());
        scene.update(Mode::Exploded, f32::NAN, Some(f32::INFINITY));
        scene.update(Mode::Exploded, -1., None);
        assert_eq!(scene.elapsed(), 0.);
        assert_eq!(scene.rotation().angle(), 0.);
        assert_eq!(scene.field().max_distance_to(Mode::Assembled), 0.);
    }

    #[test]
    fn paints_with_and_without_postfx() {
        let mut scene = Scene::new(&small_field(), &SceneConfig::default());
        scene.update(Mode::Assembled, 1. / 60., None);
        assert_eq!(paint_once(&mut scene, true), Ok(()));
        assert_eq!(paint_once(&mut scene, false), Ok(()));

        let mut empty = Scene::new(
            &FieldConfig {
                count: 0,
                ..FieldConfig::default()
            },
            &SceneConfig::default(),
        );
        assert_eq!(paint_once(&mut empty, true), Ok(()));
    }

    #[test]
    fn broken_cameras_fail_to_paint() {
        let mut config = SceneConfig::default();
        config.camera.position = [f32::NAN; 3];
        let mut scene = Scene::new(&small_field(), &config);
        assert_eq!(paint_once(&mut scene, true), Err(SceneError::NonFiniteCamera));
    }
}
