//! This crate handles hand gesture control: classifying a hand as pinched or open, turning those
//! classifications into edge-triggered mode changes, and driving a camera and landmark model
//! through an enable and disable lifecycle that can be cancelled at any point.

mod backend;
mod classify;
mod controller;
pub mod landmarks;
mod pointer;

pub use self::{
    backend::{
        Delegate, GestureBackend, GestureError, HandLandmarker, LandmarkerOptions, VideoStream,
    },
    classify::{classify, open_score, pinch_distance, GestureThresholds, ModeTracker},
    controller::{GestureConfig, GestureController, GestureReading, GestureStatus},
    landmarks::{HandLandmarks, Landmark},
    pointer::{synthetic_hand, PointerHand, PointerLandmarker, PointerSample, PointerStream},
};
