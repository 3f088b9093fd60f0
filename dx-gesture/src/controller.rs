//! This module contains the [`GestureController`], which owns the camera and landmark model while
//! gesture control is enabled and turns each new video frame into mode changes, a rotation target
//! and a cursor position.

use crate::{
    backend::{GestureBackend, GestureError, HandLandmarker, LandmarkerOptions, VideoStream},
    classify::{classify, GestureThresholds, ModeTracker},
    landmarks::{HandLandmarks, INDEX_MCP, INDEX_TIP},
};
use dx_particles::{convergence_factor, rate_from_frame_lerp, smooth_towards, REFERENCE_FPS};
use dx_shared::{Mode, Store};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tracing::{debug, error, info, info_span, trace, Instrument};
use tracing_unwrap::ResultExt;

/// The config for a [`GestureController`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub thresholds: GestureThresholds,

    /// The mode to use when the very first hand seen is neither pinched nor open.
    pub ambiguous_default: Mode,

    /// The rotation target spans this many radians as the hand crosses the frame.
    pub rotation_range: f32,

    /// How quickly the rotation follows the hand, per second.
    pub rotation_rate: f32,

    /// How quickly the cursor follows the index fingertip, per second.
    pub cursor_rate: f32,

    pub landmarker: LandmarkerOptions,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            thresholds: GestureThresholds::default(),
            ambiguous_default: Mode::Exploded,
            rotation_range: 10.,
            rotation_rate: rate_from_frame_lerp(0.15, REFERENCE_FPS),
            cursor_rate: rate_from_frame_lerp(0.22, REFERENCE_FPS),
            landmarker: LandmarkerOptions::default(),
        }
    }
}

/// Where the controller is in its lifecycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GestureStatus {
    /// Not enabled.
    #[default]
    Disabled,

    /// Waiting for the model or the camera.
    Initializing,

    /// Processing frames.
    Active,

    /// The last enable failed. Gesture control stays inert until it's enabled again.
    Failed(String),
}

/// What the controller made of one fresh video frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureReading {
    /// The new mode, if this frame changed it.
    pub changed: Option<Mode>,

    /// The smoothed rotation target.
    pub rotation: f32,

    /// The smoothed cursor position in normalised viewport coordinates, once a hand has been seen.
    pub cursor: Option<Vec2>,

    /// The hand in this frame, if there was one.
    pub hand: Option<HandLandmarks>,
}

/// The model and camera, as far as they've been acquired. Dropping this releases whatever it holds,
/// exactly once.
struct Session<B: GestureBackend> {
    landmarker: Option<B::Landmarker>,
    stream: Option<B::Stream>,
}

impl<B: GestureBackend> Session<B> {
    fn parts_mut(&mut self) -> Option<(&mut B::Landmarker, &mut B::Stream)> {
        self.landmarker.as_mut().zip(self.stream.as_mut())
    }
}

impl<B: GestureBackend> Drop for Session<B> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("Stopped camera stream");
        }
        if let Some(mut landmarker) = self.landmarker.take() {
            landmarker.close();
            debug!("Closed hand landmarker");
        }
    }
}

struct Shared<B: GestureBackend> {
    status: GestureStatus,
    session: Option<Session<B>>,
    tracker: ModeTracker,
    rotation: f32,
    cursor: Option<Vec2>,
    hand: Option<HandLandmarks>,
    last_video_time: Option<f64>,

    /// Frame time that has passed since the last fresh video frame.
    pending_dt: f32,
}

impl<B: GestureBackend> Shared<B> {
    /// Release the session and forget everything about the last hand, but keep the rotation.
    fn reset(&mut self) {
        self.session = None;
        self.tracker.reset();
        self.cursor = None;
        self.hand = None;
        self.last_video_time = None;
        self.pending_dt = 0.;
    }
}

struct Inner<B: GestureBackend> {
    backend: B,
    config: GestureConfig,
    store: Store,

    /// Bumped by every enable and disable. An enable only installs its session if this still
    /// matches the value it started with.
    generation: AtomicU64,

    shared: Mutex<Shared<B>>,
}

impl<B: GestureBackend> Inner<B> {
    fn check(&self, generation: u64) -> Result<(), GestureError> {
        if self.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            Err(GestureError::Superseded)
        }
    }

    async fn initialize(&self, generation: u64) -> Result<(), GestureError> {
        let result = self.acquire(generation).await;

        match &result {
            Ok(()) => info!("Gesture control is active"),
            Err(GestureError::Superseded) => debug!("Gesture enable was superseded"),
            Err(error) => {
                error!(%error, "Failed to enable gesture control");
                let mut shared = self.shared.lock().expect_or_log("Mutex should not be poisoned");
                if self.check(generation).is_ok() {
                    shared.status = GestureStatus::Failed(error.to_string());
                }
            }
        }

        result
    }

    async fn acquire(&self, generation: u64) -> Result<(), GestureError> {
        let landmarker = self
            .backend
            .create_landmarker(&self.config.landmarker)
            .await?;
        let mut session = Session::<B> {
            landmarker: Some(landmarker),
            stream: None,
        };
        self.check(generation)?;

        session.stream = Some(self.backend.open_camera().await?);

        // Checked under the lock so that a disable can't land between the check and the install
        let mut shared = self.shared.lock().expect_or_log("Mutex should not be poisoned");
        self.check(generation)?;

        shared.session = Some(session);
        shared.status = GestureStatus::Active;
        Ok(())
    }
}

/// Drives gesture control against a [`GestureBackend`]. Cloning gives another handle to the same
/// controller. The session is released when the last handle is dropped.
pub struct GestureController<B: GestureBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: GestureBackend> Clone for GestureController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: GestureBackend> fmt::Debug for GestureController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureController")
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl<B: GestureBackend> GestureController<B> {
    /// Create a new disabled controller that writes mode changes into `store`.
    pub fn new(backend: B, config: GestureConfig, store: Store) -> Self {
        let tracker = ModeTracker::new(config.ambiguous_default);

        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                store,
                generation: AtomicU64::new(0),
                shared: Mutex::new(Shared {
                    status: GestureStatus::Disabled,
                    session: None,
                    tracker,
                    rotation: 0.,
                    cursor: None,
                    hand: None,
                    last_video_time: None,
                    pending_dt: 0.,
                }),
            }),
        }
    }

    /// Start enabling gesture control. Any existing session is released straight away.
    ///
    /// The returned future loads the model and then opens the camera. If [`Self::disable`] or
    /// another `enable` is called before it finishes, it releases whatever it acquired, installs
    /// nothing, and resolves to [`GestureError::Superseded`].
    pub fn enable(&self) -> impl Future<Output = Result<(), GestureError>> + Send + 'static {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut shared = self
                .inner
                .shared
                .lock()
                .expect_or_log("Mutex should not be poisoned");
            shared.reset();
            shared.status = GestureStatus::Initializing;
        }

        info!(generation, "Enabling gesture control");
        let inner = Arc::clone(&self.inner);
        async move { inner.initialize(generation).await }
            .instrument(info_span!("gesture_enable", generation))
    }

    /// Stop gesture control, cancel any enable in flight, and release the camera and model.
    /// Calling this when already disabled does nothing.
    pub fn disable(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut shared = self
            .inner
            .shared
            .lock()
            .expect_or_log("Mutex should not be poisoned");
        let had_session = shared.session.is_some();
        shared.reset();
        shared.status = GestureStatus::Disabled;

        debug!(generation, had_session, "Disabled gesture control");
    }

    /// The current status.
    pub fn status(&self) -> GestureStatus {
        self.inner
            .shared
            .lock()
            .expect_or_log("Mutex should not be poisoned")
            .status
            .clone()
    }

    /// The smoothed rotation target.
    pub fn rotation(&self) -> f32 {
        self.inner
            .shared
            .lock()
            .expect_or_log("Mutex should not be poisoned")
            .rotation
    }

    /// The smoothed cursor position, if a hand has been seen since enabling.
    pub fn cursor(&self) -> Option<Vec2> {
        self.inner
            .shared
            .lock()
            .expect_or_log("Mutex should not be poisoned")
            .cursor
    }

    /// The hand in the last fresh frame.
    pub fn hand(&self) -> Option<HandLandmarks> {
        self.inner
            .shared
            .lock()
            .expect_or_log("Mutex should not be poisoned")
            .hand
            .clone()
    }

    /// Process the current video frame, if it's new. `dt` is the time since the last call in
    /// seconds, and time from skipped calls is carried over to the next fresh frame.
    ///
    /// Returns `None` without touching anything if there's no active session or the frame has
    /// already been seen. A mode change is written to the store after the controller's own lock
    /// is released.
    pub fn process_frame(&self, dt: f32, now_ms: f64) -> Option<GestureReading> {
        let config = &self.inner.config;

        let reading = {
            let mut guard = self
                .inner
                .shared
                .lock()
                .expect_or_log("Mutex should not be poisoned");
            let shared = &mut *guard;

            let (landmarker, stream) = shared.session.as_mut()?.parts_mut()?;

            if dt.is_finite() && dt > 0. {
                shared.pending_dt += dt;
            }

            let time = stream.current_time();
            if shared.last_video_time == Some(time) {
                trace!(time, "Skipping stale video frame");
                return None;
            }
            shared.last_video_time = Some(time);

            let dt = std::mem::take(&mut shared.pending_dt);
            let frame = stream.frame();
            let hand = landmarker.detect_for_video(&frame, now_ms);

            let mut changed = None;
            if let Some(hand) = &hand {
                changed = shared.tracker.observe(classify(hand, &config.thresholds));

                let target = (hand[INDEX_MCP].x - 0.5) * config.rotation_range;
                shared.rotation =
                    smooth_towards(shared.rotation, target, config.rotation_rate, dt);

                // The preview is mirrored, so the cursor is too
                let tip = hand[INDEX_TIP];
                let cursor_target = Vec2::new(1. - tip.x, tip.y);
                shared.cursor = Some(match shared.cursor {
                    Some(cursor) => {
                        cursor
                            + (cursor_target - cursor) * convergence_factor(config.cursor_rate, dt)
                    }
                    None => cursor_target,
                });
            }
            shared.hand = hand.clone();

            GestureReading {
                changed,
                rotation: shared.rotation,
                cursor: shared.cursor,
                hand,
            }
        };

        if let Some(mode) = reading.changed {
            debug!(?mode, "Gesture changed mode");
            self.inner.store.set_mode(mode);
        }

        Some(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::synthetic_hand;
    use async_trait::async_trait;
    use float_cmp::approx_eq;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{Notify, Semaphore};

    #[derive(Debug, Default)]
    struct Counters {
        landmarkers: AtomicUsize,
        closes: AtomicUsize,
        cameras: AtomicUsize,
        stops: AtomicUsize,
    }

    impl Counters {
        fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    /// Holds an async call until the test lets it through.
    #[derive(Debug)]
    struct Gate {
        entered: Notify,
        release: Semaphore,
    }

    impl Gate {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entered: Notify::new(),
                release: Semaphore::new(0),
            })
        }

        async fn pass(&self) {
            self.entered.notify_one();
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }

        fn open(&self) {
            self.release.add_permits(1);
        }
    }

    #[derive(Debug, Default)]
    struct Feed {
        time: f64,
        hand: Option<HandLandmarks>,
    }

    #[derive(Default)]
    struct MockBackend {
        counters: Arc<Counters>,
        feed: Arc<Mutex<Feed>>,
        landmarker_gate: Option<Arc<Gate>>,
        camera_gate: Option<Arc<Gate>>,
        landmarker_error: Option<GestureError>,
        camera_error: Option<GestureError>,
    }

    struct MockLandmarker(Arc<Counters>);

    struct MockStream {
        counters: Arc<Counters>,
        feed: Arc<Mutex<Feed>>,
    }

    impl HandLandmarker<Option<HandLandmarks>> for MockLandmarker {
        fn detect_for_video(
            &mut self,
            frame: &Option<HandLandmarks>,
            _timestamp_ms: f64,
        ) -> Option<HandLandmarks> {
            frame.clone()
        }

        fn close(&mut self) {
            self.0.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl VideoStream for MockStream {
        type Frame = Option<HandLandmarks>;

        fn current_time(&self) -> f64 {
            self.feed.lock().unwrap().time
        }

        fn frame(&self) -> Self::Frame {
            self.feed.lock().unwrap().hand.clone()
        }

        fn stop(&mut self) {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl GestureBackend for MockBackend {
        type Stream = MockStream;
        type Landmarker = MockLandmarker;

        async fn create_landmarker(
            &self,
            _options: &LandmarkerOptions,
        ) -> Result<Self::Landmarker, GestureError> {
            if let Some(gate) = &self.landmarker_gate {
                gate.pass().await;
            }
            if let Some(error) = self.landmarker_error.clone() {
                return Err(error);
            }
            self.counters.landmarkers.fetch_add(1, Ordering::SeqCst);
            Ok(MockLandmarker(Arc::clone(&self.counters)))
        }

        async fn open_camera(&self) -> Result<Self::Stream, GestureError> {
            if let Some(gate) = &self.camera_gate {
                gate.pass().await;
            }
            if let Some(error) = self.camera_error.clone() {
                return Err(error);
            }
            self.counters.cameras.fetch_add(1, Ordering::SeqCst);
            Ok(MockStream {
                counters: Arc::clone(&self.counters),
                feed: Arc::clone(&self.feed),
            })
        }
    }

    struct Harness {
        controller: GestureController<MockBackend>,
        counters: Arc<Counters>,
        feed: Arc<Mutex<Feed>>,
        store: Store,
    }

    impl Harness {
        fn new(backend: MockBackend) -> Self {
            let counters = Arc::clone(&backend.counters);
            let feed = Arc::clone(&backend.feed);
            let store = Store::new();
            let controller =
                GestureController::new(backend, GestureConfig::default(), store.clone());

            Self {
                controller,
                counters,
                feed,
                store,
            }
        }

        /// Show a new frame with the given hand.
        fn show(&self, hand: Option<HandLandmarks>) {
            let mut feed = self.feed.lock().unwrap();
            feed.time += 1. / 30.;
            feed.hand = hand;
        }

        fn open_hand() -> HandLandmarks {
            synthetic_hand(Vec2::new(0.5, 0.4), false)
        }

        fn pinched_hand() -> HandLandmarks {
            synthetic_hand(Vec2::new(0.5, 0.4), true)
        }
    }

    #[tokio::test]
    async fn disable_during_landmarker_init_installs_nothing() {
        let gate = Gate::new();
        let harness = Harness::new(MockBackend {
            landmarker_gate: Some(Arc::clone(&gate)),
            ..MockBackend::default()
        });

        let task = tokio::spawn(harness.controller.enable());
        gate.entered.notified().await;
        assert_eq!(harness.controller.status(), GestureStatus::Initializing);

        harness.controller.disable();
        gate.open();

        assert_eq!(task.await.unwrap(), Err(GestureError::Superseded));
        assert_eq!(Counters::get(&harness.counters.landmarkers), 1);
        assert_eq!(Counters::get(&harness.counters.closes), 1);
        assert_eq!(Counters::get(&harness.counters.cameras), 0);
        assert_eq!(Counters::get(&harness.counters.stops), 0);
        assert_eq!(harness.controller.status(), GestureStatus::Disabled);

        harness.show(Some(Harness::pinched_hand()));
        assert!(harness.controller.process_frame(0.1, 0.).is_none());
        assert_eq!(harness.store.revision(), 0);
    }

    #[tokio::test]
    async fn disable_during_camera_open_releases_both() {
        let gate = Gate::new();
        let harness = Harness::new(MockBackend {
            camera_gate: Some(Arc::clone(&gate)),
            ..MockBackend::default()
        });

        let task = tokio::spawn(harness.controller.enable());
        gate.entered.notified().await;

        harness.controller.disable();
        harness.controller.disable();
        gate.open();

        assert_eq!(task.await.unwrap(), Err(GestureError::Superseded));
        assert_eq!(Counters::get(&harness.counters.closes), 1);
        assert_eq!(Counters::get(&harness.counters.cameras), 1);
        assert_eq!(Counters::get(&harness.counters.stops), 1);

        harness.show(Some(Harness::open_hand()));
        assert!(harness.controller.process_frame(0.1, 0.).is_none());
        assert_eq!(harness.store.revision(), 0);
        assert_eq!(harness.controller.status(), GestureStatus::Disabled);
    }

    #[tokio::test]
    async fn second_enable_supersedes_the_first() {
        let gate = Gate::new();
        let harness = Harness::new(MockBackend {
            camera_gate: Some(Arc::clone(&gate)),
            ..MockBackend::default()
        });

        let first = tokio::spawn(harness.controller.enable());
        gate.entered.notified().await;

        let second = tokio::spawn(harness.controller.enable());
        gate.open();
        gate.open();

        assert_eq!(first.await.unwrap(), Err(GestureError::Superseded));
        assert_eq!(second.await.unwrap(), Ok(()));
        assert_eq!(Counters::get(&harness.counters.landmarkers), 2);
        assert_eq!(Counters::get(&harness.counters.closes), 1);
        assert_eq!(Counters::get(&harness.counters.stops), 1);
        assert_eq!(harness.controller.status(), GestureStatus::Active);

        harness.show(Some(Harness::pinched_hand()));
        assert!(harness.controller.process_frame(0.1, 0.).is_some());
    }

    #[tokio::test]
    async fn camera_failure_rolls_back_landmarker() {
        let harness = Harness::new(MockBackend {
            camera_error: Some(GestureError::PermissionDenied),
            ..MockBackend::default()
        });

        assert_eq!(
            harness.controller.enable().await,
            Err(GestureError::PermissionDenied)
        );
        assert_eq!(Counters::get(&harness.counters.closes), 1);
        assert_eq!(Counters::get(&harness.counters.stops), 0);
        assert_eq!(
            harness.controller.status(),
            GestureStatus::Failed(GestureError::PermissionDenied.to_string())
        );

        harness.show(Some(Harness::open_hand()));
        assert!(harness.controller.process_frame(0.1, 0.).is_none());
    }

    #[tokio::test]
    async fn landmarker_failure_never_opens_camera() {
        let harness = Harness::new(MockBackend {
            landmarker_error: Some(GestureError::LandmarkerInit("no model".to_string())),
            ..MockBackend::default()
        });

        assert!(matches!(
            harness.controller.enable().await,
            Err(GestureError::LandmarkerInit(_))
        ));
        assert_eq!(Counters::get(&harness.counters.cameras), 0);
        assert_eq!(Counters::get(&harness.counters.closes), 0);
        assert!(matches!(
            harness.controller.status(),
            GestureStatus::Failed(_)
        ));
    }

    #[tokio::test]
    async fn identical_frames_write_once() {
        let harness = Harness::new(MockBackend::default());
        harness.controller.enable().await.unwrap();
        assert_eq!(harness.controller.status(), GestureStatus::Active);

        let writes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&writes);
        harness.store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut changes = 0;
        for _ in 0..10 {
            harness.show(Some(Harness::open_hand()));
            let reading = harness.controller.process_frame(1. / 30., 0.).unwrap();
            changes += reading.changed.iter().count();
        }

        assert_eq!(changes, 1);
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(harness.store.mode(), Mode::Exploded);

        harness.show(Some(Harness::pinched_hand()));
        harness.controller.process_frame(1. / 30., 0.);
        assert_eq!(harness.store.mode(), Mode::Assembled);
        assert_eq!(writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_frames_are_skipped() {
        let harness = Harness::new(MockBackend::default());
        harness.controller.enable().await.unwrap();

        harness.show(Some(Harness::open_hand()));
        assert!(harness.controller.process_frame(0.01, 0.).is_some());
        assert!(harness.controller.process_frame(0.01, 10.).is_none());
        assert!(harness.controller.process_frame(0.01, 20.).is_none());

        harness.show(Some(Harness::open_hand()));
        assert!(harness.controller.process_frame(0.01, 30.).is_some());
    }

    #[tokio::test]
    async fn no_hand_keeps_mode() {
        let harness = Harness::new(MockBackend::default());
        harness.controller.enable().await.unwrap();

        harness.show(Some(Harness::pinched_hand()));
        harness.controller.process_frame(0.1, 0.);
        harness.store.set_mode(Mode::Exploded);
        let revision = harness.store.revision();

        for _ in 0..5 {
            harness.show(None);
            let reading = harness.controller.process_frame(0.1, 0.).unwrap();
            assert_eq!(reading.changed, None);
            assert!(reading.hand.is_none());
        }
        assert_eq!(harness.store.revision(), revision);
    }

    #[tokio::test]
    async fn rotation_and_cursor_follow_the_hand() {
        let harness = Harness::new(MockBackend::default());
        harness.controller.enable().await.unwrap();

        // Pointer on the left of the screen means a landmark on the right of the frame
        let hand = synthetic_hand(Vec2::new(0., 0.3), false);
        assert!(approx_eq!(f32, hand[INDEX_MCP].x, 1., epsilon = 1e-5));

        harness.show(Some(hand.clone()));
        let reading = harness.controller.process_frame(1. / 60., 0.).unwrap();
        assert!(approx_eq!(f32, reading.rotation, 5. * 0.15, epsilon = 1e-4));

        let cursor = reading.cursor.unwrap();
        assert!(approx_eq!(f32, cursor.x, 0., epsilon = 1e-5));
        assert!(approx_eq!(f32, cursor.y, 0.3, epsilon = 1e-5));

        for _ in 0..600 {
            harness.show(Some(hand.clone()));
            harness.controller.process_frame(1. / 60., 0.);
        }
        assert!(approx_eq!(
            f32,
            harness.controller.rotation(),
            5.,
            epsilon = 1e-3
        ));
    }

    #[tokio::test]
    async fn re_enable_replaces_session_and_drop_releases() {
        let harness = Harness::new(MockBackend::default());
        harness.controller.enable().await.unwrap();
        harness.controller.enable().await.unwrap();

        assert_eq!(Counters::get(&harness.counters.landmarkers), 2);
        assert_eq!(Counters::get(&harness.counters.closes), 1);
        assert_eq!(Counters::get(&harness.counters.stops), 1);

        let counters = Arc::clone(&harness.counters);
        drop(harness);
        assert_eq!(Counters::get(&counters.closes), 2);
        assert_eq!(Counters::get(&counters.stops), 2);
    }
}
