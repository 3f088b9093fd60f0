//! This module contains the [`OrbitCamera`], which circles a fixed target when dragged.

use super::SceneError;
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// The config for an [`OrbitCamera`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Where the camera starts.
    pub position: [f32; 3],

    /// The point the camera orbits and looks at.
    pub target: [f32; 3],

    /// The vertical field of view in degrees.
    pub fov_degrees: f32,

    pub near: f32,
    pub far: f32,

    /// How far above or below the target the camera may climb, in radians.
    pub max_elevation: f32,

    /// A full drag across the height of the viewport turns the camera this many times.
    pub drag_turns: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0., 3.6, 72.],
            target: [0., -2.5, 0.],
            fov_degrees: 34.,
            near: 0.1,
            far: 1000.,
            max_elevation: 1.45,
            drag_turns: 1.,
        }
    }
}

/// A camera on a sphere around its target. It can be turned but not zoomed or panned.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitCamera {
    target: Vec3,
    distance: f32,

    /// Around the y axis, with 0 on the +z side of the target.
    azimuth: f32,

    /// Above the xz plane of the target.
    elevation: f32,

    fov: f32,
    near: f32,
    far: f32,
    max_elevation: f32,
    drag_turns: f32,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig) -> Self {
        let target = Vec3::from(config.target);
        let offset = Vec3::from(config.position) - target;
        let distance = offset.length();

        let (azimuth, elevation) = if distance > 0. {
            (
                offset.x.atan2(offset.z),
                (offset.y / distance).clamp(-1., 1.).asin(),
            )
        } else {
            (0., 0.)
        };

        Self {
            target,
            distance,
            azimuth,
            elevation: elevation.clamp(-config.max_elevation, config.max_elevation),
            fov: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
            max_elevation: config.max_elevation,
            drag_turns: config.drag_turns,
        }
    }

    /// Where the camera is.
    pub fn position(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        self.target + Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.distance
    }

    #[inline]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// The vertical field of view in radians.
    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Turn the camera by a pointer drag of `delta` pixels in a viewport `viewport_height` pixels
    /// tall. Dragging right swings the camera left around the target, dragging down lifts it.
    pub fn drag(&mut self, delta: Vec2, viewport_height: f32) {
        if !(viewport_height > 0.) || !delta.is_finite() {
            return;
        }

        let turn = TAU * self.drag_turns / viewport_height;
        self.azimuth = (self.azimuth - delta.x * turn).rem_euclid(TAU);
        self.elevation =
            (self.elevation + delta.y * turn).clamp(-self.max_elevation, self.max_elevation);
    }

    /// The world to view matrix.
    pub fn view(&self) -> Result<Mat4, SceneError> {
        let eye = self.position();
        if !eye.is_finite() || self.distance <= 0. {
            return Err(SceneError::NonFiniteCamera);
        }
        Ok(Mat4::look_at_rh(eye, self.target, Vec3::Y))
    }

    /// The view to clip matrix for a viewport of the given aspect ratio.
    pub fn projection(&self, aspect: f32) -> Result<Mat4, SceneError> {
        if !(aspect.is_finite() && aspect > 0.) {
            return Err(SceneError::EmptyViewport);
        }
        Ok(Mat4::perspective_rh_gl(self.fov, aspect, self.near, self.far))
    }
}
