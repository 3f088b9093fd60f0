//! This module contains the traits that a camera and hand landmark model must implement to be
//! driven by the [`GestureController`](crate::GestureController).

use crate::landmarks::HandLandmarks;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// An error from starting gesture control.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GestureError {
    /// The user refused camera access.
    #[error("camera permission was denied")]
    PermissionDenied,

    /// There is no camera, or it couldn't be opened.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The hand landmark model failed to load.
    #[error("hand landmarker failed to initialize: {0}")]
    LandmarkerInit(String),

    /// A later call to enable or disable replaced this one before it finished.
    #[error("superseded by a later enable or disable")]
    Superseded,
}

/// Where the landmark model should run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Delegate {
    #[default]
    #[strum(serialize = "GPU")]
    Gpu,

    #[strum(serialize = "CPU")]
    Cpu,
}

/// The options passed to [`GestureBackend::create_landmarker`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkerOptions {
    /// Where to fetch the runtime of the model from.
    pub wasm_path: String,

    /// Where to fetch the model itself from.
    pub model_asset_path: String,

    pub delegate: Delegate,

    /// How many hands to look for. Only the first is ever used.
    pub num_hands: usize,
}

impl Default for LandmarkerOptions {
    fn default() -> Self {
        Self {
            wasm_path: "https://cdn.jsdelivr.net/npm/@mediapipe/tasks-vision@0.10.0/wasm"
                .to_string(),
            model_asset_path: "https://storage.googleapis.com/mediapipe-models/hand_landmarker/\
                hand_landmarker/float16/1/hand_landmarker.task"
                .to_string(),
            delegate: Delegate::Gpu,
            num_hands: 1,
        }
    }
}

/// A live video stream from a camera.
pub trait VideoStream: Send + 'static {
    /// Whatever the landmarker needs to look at.
    type Frame;

    /// The playback time of the most recently decoded frame, in seconds. This only changes when a
    /// new frame arrives.
    fn current_time(&self) -> f64;

    /// The most recently decoded frame.
    fn frame(&self) -> Self::Frame;

    /// Stop every track of the stream.
    fn stop(&mut self);
}

/// A hand landmark model in video mode.
pub trait HandLandmarker<F>: Send + 'static {
    /// Find the landmarks of the first hand in the frame, if there is one.
    fn detect_for_video(&mut self, frame: &F, timestamp_ms: f64) -> Option<HandLandmarks>;

    /// Release the model.
    fn close(&mut self);
}

/// Something that can open a camera and load a hand landmark model.
#[async_trait]
pub trait GestureBackend: Send + Sync + 'static {
    /// The camera stream.
    type Stream: VideoStream;

    /// The landmark model.
    type Landmarker: HandLandmarker<<Self::Stream as VideoStream>::Frame>;

    /// Load the landmark model.
    async fn create_landmarker(
        &self,
        options: &LandmarkerOptions,
    ) -> Result<Self::Landmarker, GestureError>;

    /// Ask for the camera and open it.
    async fn open_camera(&self) -> Result<Self::Stream, GestureError>;
}
