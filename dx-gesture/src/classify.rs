//! This module turns a hand into a [`Mode`].

use crate::landmarks::{
    HandLandmarks, INDEX_TIP, MIDDLE_TIP, PINKY_TIP, RING_TIP, THUMB_TIP, WRIST,
};
use dx_shared::Mode;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// The thresholds used by [`classify`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// A thumb to index distance below this is a pinch.
    pub pinch: f32,

    /// An open score above this is an open hand.
    pub open: f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            pinch: 0.05,
            open: 1.8,
        }
    }
}

/// The distance between the tips of the thumb and index finger.
pub fn pinch_distance(hand: &HandLandmarks) -> f32 {
    hand[THUMB_TIP].distance(hand[INDEX_TIP])
}

/// The sum of the distances from the four fingertips to the wrist.
pub fn open_score(hand: &HandLandmarks) -> f32 {
    let wrist = hand[WRIST];
    [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP]
        .into_iter()
        .map(|tip| hand[tip].distance(wrist))
        .sum()
}

/// Classify a hand. A pinch means [`Mode::Assembled`], an open hand means [`Mode::Exploded`], and
/// anything in between is `None`.
pub fn classify(hand: &HandLandmarks, thresholds: &GestureThresholds) -> Option<Mode> {
    let pinch = pinch_distance(hand);
    if pinch < thresholds.pinch {
        return Some(Mode::Assembled);
    }

    let open = open_score(hand);
    trace!(pinch, open, "Classifying hand");

    (open > thresholds.open).then_some(Mode::Exploded)
}

/// Turns a stream of classifications into edge-triggered mode changes.
///
/// An ambiguous classification keeps the last mode. If nothing has been classified yet, it uses
/// the configured default instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeTracker {
    ambiguous_default: Mode,
    last: Option<Mode>,
}

impl ModeTracker {
    /// Create a tracker that hasn't seen anything yet.
    pub fn new(ambiguous_default: Mode) -> Self {
        Self {
            ambiguous_default,
            last: None,
        }
    }

    /// The last mode emitted, if any.
    pub fn last(&self) -> Option<Mode> {
        self.last
    }

    /// Forget everything seen so far.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Observe one classification. Returns the new mode only if it differs from the last one
    /// emitted.
    pub fn observe(&mut self, classified: Option<Mode>) -> Option<Mode> {
        let next = classified.or(self.last).unwrap_or(self.ambiguous_default);

        if self.last == Some(next) {
            None
        } else {
            self.last = Some(next);
            Some(next)
        }
    }
}
