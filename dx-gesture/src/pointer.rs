//! This module contains [`PointerHand`], a [`GestureBackend`] that fakes a hand from the mouse or
//! touch pointer.
//!
//! Hovering over the scene shows an open hand with the index fingertip under the pointer. Holding
//! the secondary button pinches the thumb onto the fingertip. Moving off the scene hides the hand.

use crate::{
    backend::{GestureBackend, GestureError, HandLandmarker, LandmarkerOptions, VideoStream},
    landmarks::{HandLandmarks, Landmark, INDEX_TIP, LANDMARK_COUNT, THUMB_TIP},
};
use async_trait::async_trait;
use glam::Vec2;
use std::sync::{Arc, Mutex};
use tracing::debug;
use tracing_unwrap::ResultExt;

/// Where the pointer is, in normalised viewport coordinates with (0, 0) at the top left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    /// The position of the pointer.
    pub position: Vec2,

    /// Whether the pinch button is held.
    pub pinched: bool,
}

#[derive(Debug, Default)]
struct PointerState {
    frames: u64,
    sample: Option<PointerSample>,
    streaming: bool,
}

/// A simulated hand driven by the pointer. Clones share the same pointer.
#[derive(Clone, Debug, Default)]
pub struct PointerHand {
    state: Arc<Mutex<PointerState>>,
}

/// The pretend frame rate of the pointer "camera".
const POINTER_FPS: f64 = 60.;

/// How long each finger is, in normalised coordinates.
const FINGER_LENGTH: f32 = 0.5;

/// How long the thumb is when the hand is open.
const THUMB_LENGTH: f32 = 0.35;

/// Where each joint sits along its finger, from the knuckle out to the tip.
const JOINT_FRACTIONS: [f32; 4] = [0.4, 0.6, 0.8, 1.];

impl PointerHand {
    /// Create a new pointer hand with nothing under the pointer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the latest pointer state. Every call is a new video frame.
    pub fn push(&self, sample: Option<PointerSample>) {
        let mut state = self
            .state
            .lock()
            .expect_or_log("Pointer state mutex should not be poisoned");
        state.frames += 1;
        state.sample = sample;
    }

    /// Is a stream open on this pointer?
    pub fn is_streaming(&self) -> bool {
        self.state
            .lock()
            .expect_or_log("Pointer state mutex should not be poisoned")
            .streaming
    }
}

/// Build an upright right hand with its index fingertip under the pointer.
///
/// Each fingertip is [`FINGER_LENGTH`] from the wrist, so an open hand scores `4 * 0.5 = 2.0`. A
/// pinched hand has the thumb tip almost touching the index fingertip.
pub fn synthetic_hand(pointer: Vec2, pinched: bool) -> HandLandmarks {
    // The camera is mirrored
    let index_tip = Vec2::new(1. - pointer.x, pointer.y);

    // Up the frame is -y, and the index finger points straight up
    let direction = |degrees: f32| {
        let radians = degrees.to_radians();
        Vec2::new(radians.sin(), -radians.cos())
    };
    let wrist = index_tip - direction(0.) * FINGER_LENGTH;

    let mut points = vec![Landmark::from(wrist); LANDMARK_COUNT];

    // Index, middle, ring and pinky fan out to one side
    for (finger, degrees) in [0., 12., 24., 36.].into_iter().enumerate() {
        let base = 5 + finger * 4;
        for (joint, fraction) in JOINT_FRACTIONS.into_iter().enumerate() {
            points[base + joint] =
                Landmark::from(wrist + direction(degrees) * FINGER_LENGTH * fraction);
        }
    }

    points[INDEX_TIP] = Landmark::from(index_tip);

    let thumb_tip = if pinched {
        index_tip + Vec2::new(0.01, 0.)
    } else {
        wrist + direction(-50.) * THUMB_LENGTH
    };
    for (joint, fraction) in JOINT_FRACTIONS.into_iter().enumerate() {
        points[1 + joint] = Landmark::from(wrist + (thumb_tip - wrist) * fraction);
    }

    points[THUMB_TIP] = Landmark::from(thumb_tip);

    // There are always enough points
    HandLandmarks::new(points).unwrap_or_else(|| unreachable!())
}

/// The "camera" of a [`PointerHand`].
#[derive(Debug)]
pub struct PointerStream {
    state: Arc<Mutex<PointerState>>,
}

impl VideoStream for PointerStream {
    type Frame = Option<PointerSample>;

    fn current_time(&self) -> f64 {
        let frames = self
            .state
            .lock()
            .expect_or_log("Pointer state mutex should not be poisoned")
            .frames;
        frames as f64 / POINTER_FPS
    }

    fn frame(&self) -> Self::Frame {
        self.state
            .lock()
            .expect_or_log("Pointer state mutex should not be poisoned")
            .sample
    }

    fn stop(&mut self) {
        self.state
            .lock()
            .expect_or_log("Pointer state mutex should not be poisoned")
            .streaming = false;
        debug!("Stopped pointer stream");
    }
}

/// The "model" of a [`PointerHand`].
#[derive(Debug, Default)]
pub struct PointerLandmarker {
    closed: bool,
}

impl HandLandmarker<Option<PointerSample>> for PointerLandmarker {
    fn detect_for_video(
        &mut self,
        frame: &Option<PointerSample>,
        _timestamp_ms: f64,
    ) -> Option<HandLandmarks> {
        if self.closed {
            return None;
        }
        frame.map(|sample| synthetic_hand(sample.position, sample.pinched))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[async_trait]
impl GestureBackend for PointerHand {
    type Stream = PointerStream;
    type Landmarker = PointerLandmarker;

    async fn create_landmarker(
        &self,
        options: &LandmarkerOptions,
    ) -> Result<Self::Landmarker, GestureError> {
        debug!(
            model = %options.model_asset_path,
            delegate = %options.delegate,
            "Using the pointer in place of a hand landmark model"
        );
        Ok(PointerLandmarker::default())
    }

    async fn open_camera(&self) -> Result<Self::Stream, GestureError> {
        self.state
            .lock()
            .expect_or_log("Pointer state mutex should not be poisoned")
            .streaming = true;

        Ok(PointerStream {
            state: Arc::clone(&self.state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::{classify, open_score, pinch_distance, GestureThresholds},
        controller::{GestureConfig, GestureController, GestureStatus},
        landmarks::INDEX_MCP,
    };
    use dx_shared::{Mode, Store};
    use float_cmp::approx_eq;

    #[test]
    fn synthetic_hands_classify() {
        let thresholds = GestureThresholds::default();

        let open = synthetic_hand(Vec2::new(0.3, 0.6), false);
        assert!(approx_eq!(f32, open_score(&open), 2., epsilon = 1e-5));
        assert_eq!(classify(&open, &thresholds), Some(Mode::Exploded));

        let pinched = synthetic_hand(Vec2::new(0.3, 0.6), true);
        assert!(pinch_distance(&pinched) < 0.05);
        assert_eq!(classify(&pinched, &thresholds), Some(Mode::Assembled));
    }

    #[test]
    fn index_knuckle_tracks_pointer() {
        for x in [0., 0.25, 0.5, 0.9] {
            let hand = synthetic_hand(Vec2::new(x, 0.5), false);
            assert!(approx_eq!(f32, hand[INDEX_MCP].x, 1. - x, epsilon = 1e-5));
        }
    }

    #[tokio::test]
    async fn pointer_drives_the_controller() {
        let pointer = PointerHand::new();
        let store = Store::new();
        let controller =
            GestureController::new(pointer.clone(), GestureConfig::default(), store.clone());

        controller.enable().await.unwrap();
        assert_eq!(controller.status(), GestureStatus::Active);
        assert!(pointer.is_streaming());

        pointer.push(Some(PointerSample {
            position: Vec2::new(0.5, 0.5),
            pinched: false,
        }));
        controller.process_frame(1. / 60., 0.);
        assert_eq!(store.mode(), Mode::Exploded);

        pointer.push(Some(PointerSample {
            position: Vec2::new(0.5, 0.5),
            pinched: true,
        }));
        controller.process_frame(1. / 60., 16.);
        assert_eq!(store.mode(), Mode::Assembled);

        // Without a new push the frame is stale
        assert!(controller.process_frame(1. / 60., 32.).is_none());

        controller.disable();
        assert!(!pointer.is_streaming());
    }
}
