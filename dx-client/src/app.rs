//! This module handles the [`App`] type for the `eframe`-based GUI.

use crate::{
    config::AppConfig,
    fallback,
    music::MusicPlayer,
    overlay::{self, OverlayAction},
    scene::{Scene, SceneError},
    surface::{SurfaceLifecycle, SurfaceWatcher},
};
use async_channel::Receiver;
use dx_gesture::{GestureController, GestureStatus, PointerHand, PointerSample};
use dx_shared::{Store, StoreEvent};
use eframe::egui::Context;
use egui::{PointerButton, Sense};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, instrument, trace};

/// The ID of the canvas that the web build draws into.
pub const CANVAS_ID: &str = "main_canvas_id";

/// The app type itself.
pub struct App {
    config: AppConfig,

    /// The session state shared with the gesture controller.
    store: Store,

    /// Every change to the store, in order.
    store_events: Receiver<StoreEvent>,

    /// The scene, once it's been built.
    scene: Option<Scene>,

    /// The canvas key the scene was built against.
    scene_key: u64,

    /// The pointer standing in for a camera and hand landmark model.
    pointer: PointerHand,

    gesture: GestureController<PointerHand>,

    music: MusicPlayer,

    surface: SurfaceLifecycle,
    surface_watcher: Option<SurfaceWatcher>,

    /// Set when rendering fails. The app shows this and nothing else from then on.
    failure: Option<String>,

    /// An async runtime used to start gesture control.
    async_runtime: prokio::Runtime,
}

impl App {
    /// Create a new [`App`] with the given config.
    pub fn new(_cc: &eframe::CreationContext, config: AppConfig) -> Self {
        let store = Store::new();
        let store_events = store.events();
        store.subscribe(|event| trace!(?event, "Store changed"));

        let pointer = PointerHand::new();
        let gesture =
            GestureController::new(pointer.clone(), config.gesture.clone(), store.clone());
        let music = MusicPlayer::for_platform(&config.music);

        info!("Starting Dreamy Xmas");

        Self {
            config,
            store,
            store_events,
            scene: None,
            scene_key: 0,
            pointer,
            gesture,
            music,
            surface: SurfaceLifecycle::new(),
            surface_watcher: SurfaceWatcher::attach(CANVAS_ID),
            failure: None,
            async_runtime: prokio::Runtime::default(),
        }
    }

    /// Start enabling gesture control in the background.
    fn start_gesture(&self) {
        let enable = self.gesture.enable();
        self.async_runtime.spawn_pinned(move || async move {
            if let Err(error) = enable.await {
                debug!(%error, "Gesture control didn't start");
            }
        });
    }

    /// Respond to everything that has changed in the store since the last call.
    #[instrument(skip_all)]
    fn respond_to_store_events(&mut self) {
        while let Ok(event) = self.store_events.try_recv() {
            debug!(?event, "Responding to store event");

            match event {
                StoreEvent::GestureEnabled(true) => self.start_gesture(),
                StoreEvent::GestureEnabled(false) => self.gesture.disable(),
                StoreEvent::Entered(_) | StoreEvent::AudioPlaying(_) => {}
                StoreEvent::ModeChanged(mode) => debug!(?mode, "Mode changed"),
            }
        }

        self.music.sync(&self.store.snapshot());
    }

    /// Apply the latest context events and drop the scene if it was built for an old context.
    fn respond_to_surface_events(&mut self) {
        if let Some(watcher) = &self.surface_watcher {
            for event in watcher.drain() {
                self.surface.handle(event);
            }
        }

        if self.scene.is_some() && self.scene_key != self.surface.canvas_key() {
            info!(canvas_key = self.surface.canvas_key(), "Rebuilding scene");
            self.scene = None;
        }
    }

    /// Feed the pointer to the pointer hand while it has a stream open.
    fn push_pointer(&self, ctx: &Context) {
        if !self.pointer.is_streaming() {
            return;
        }

        let screen = ctx.screen_rect();
        let sample = ctx.input(|i| {
            i.pointer.hover_pos().map(|pos| PointerSample {
                position: glam::Vec2::new(
                    (pos.x - screen.min.x) / screen.width(),
                    (pos.y - screen.min.y) / screen.height(),
                ),
                pinched: i.pointer.button_down(PointerButton::Secondary),
            })
        });
        self.pointer.push(sample);
    }

    /// Draw the scene underneath everything else and return any background click.
    fn display_scene(&mut self, ctx: &Context) -> Option<OverlayAction> {
        let Some(scene) = self.scene.as_mut() else {
            return None;
        };
        let postfx = self.surface.postfx_enabled();
        let mut action = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
                let painter = ui.painter_at(rect);

                let result = panic::catch_unwind(AssertUnwindSafe(|| scene.paint(&painter, postfx)))
                    .unwrap_or_else(|payload| {
                        Err(SceneError::Panic(fallback::panic_message(payload.as_ref())))
                    });

                match result {
                    Ok(()) | Err(SceneError::EmptyViewport) => {}
                    Err(error) => {
                        error!(%error, "Failed to render scene");
                        self.failure = Some(error.to_string());
                    }
                }

                if response.dragged() {
                    let delta = response.drag_delta();
                    scene.drag(glam::Vec2::new(delta.x, delta.y), rect.height());
                }
                if response.clicked() {
                    action = Some(OverlayAction::BackgroundClick);
                }
            });

        action
    }

    /// Draw the overlay for the current state and return what the user clicked.
    fn display_overlay(&self, ctx: &Context) -> Vec<OverlayAction> {
        let state = self.store.snapshot();
        let config = &self.config.overlay;

        let actions = if state.entered {
            overlay::hud(ctx, &state, config)
        } else {
            overlay::landing(ctx, config).into_iter().collect()
        };
        overlay::greeting(ctx, config);

        if state.gesture_enabled {
            let status = self.gesture.status();
            if status == GestureStatus::Active {
                if let Some(cursor) = self.gesture.cursor() {
                    overlay::finger_cursor(ctx, egui::pos2(cursor.x, cursor.y));
                }
            }
            overlay::gesture_preview(ctx, &status, self.gesture.hand().as_ref());
        }

        actions
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let Some(detail) = &self.failure {
            fallback::show(ctx, detail);
            return;
        }

        self.respond_to_surface_events();
        self.respond_to_store_events();

        if self.scene.is_none() {
            // Show the loading text for a frame, then build the scene before the next one
            overlay::loading(ctx);
            self.scene = Some(Scene::new(&self.config.field, &self.config.scene));
            self.scene_key = self.surface.canvas_key();
            ctx.request_repaint();
            return;
        }

        let (dt, now_ms) = ctx.input(|i| (i.unstable_dt, i.time * 1000.));

        self.push_pointer(ctx);
        self.gesture.process_frame(dt, now_ms);
        if let Some(scene) = self.scene.as_mut() {
            scene.update(self.store.mode(), dt, Some(self.gesture.rotation()));
        }

        let mut actions: Vec<OverlayAction> = self.display_scene(ctx).into_iter().collect();
        actions.extend(self.display_overlay(ctx));

        // Buttons sit above the scene, so a click on one never reaches the background too
        for action in actions {
            action.apply(&self.store);
        }
        self.respond_to_store_events();

        // Everything is animated
        ctx.request_repaint();
    }
}
