//! This module draws everything on top of the scene: the landing card, the HUD, the greeting, the
//! finger cursor and the gesture preview.
//!
//! The widgets never touch the [`Store`] themselves. They return [`OverlayAction`]s and the app
//! applies them.

use dx_gesture::{landmarks::LANDMARK_COUNT, GestureStatus, HandLandmarks};
use dx_shared::{Mode, SessionState, Store};
use egui::{
    pos2, vec2, Align2, Color32, Context, FontId, Id, LayerId, Order, Pos2, RichText, Rounding,
    Sense, Stroke, Ui,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The words in the overlay that are worth changing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub title: String,

    /// The big line of the greeting.
    pub greeting_heading: String,

    /// The lines under the heading.
    pub greeting_lines: Vec<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            title: "DREAMY XMAS".to_string(),
            greeting_heading: "Merry Christmas".to_string(),
            greeting_lines: [
                "to syy:",
                "Christmas is winter's letter",
                "and you are my surprise",
                "from yzy",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Something the user asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayAction {
    /// The ENTER button.
    Enter,

    /// The GESTURE MODE button on the landing card.
    EnterWithGesture,

    /// A click that landed on the scene rather than a button.
    BackgroundClick,

    ToggleAudio,
    ToggleMode,
    ToggleGesture,
}

impl OverlayAction {
    /// Carry out the action on the store.
    pub fn apply(self, store: &Store) {
        debug!(action = ?self, "Applying overlay action");
        match self {
            Self::Enter => {
                store.enter();
                store.set_audio_playing(true);
            }
            Self::EnterWithGesture => {
                store.toggle_gesture();
                store.enter();
                store.set_audio_playing(true);
            }
            Self::BackgroundClick => {
                if !store.entered() {
                    store.enter();
                } else {
                    store.toggle_mode();
                }
            }
            Self::ToggleAudio => {
                store.toggle_audio();
            }
            Self::ToggleMode => {
                store.toggle_mode();
            }
            Self::ToggleGesture => {
                store.toggle_gesture();
            }
        }
    }
}

const PINK: Color32 = Color32::from_rgb(255, 105, 180);
const DEEP_PINK: Color32 = Color32::from_rgb(255, 20, 147);
const PALE_PINK: Color32 = Color32::from_rgb(255, 228, 240);
const ICE: Color32 = Color32::from_rgb(0xe9, 0xff, 0xff);

/// Scale the alpha of a colour, which must be opaque.
fn faded(colour: Color32, alpha: f32) -> Color32 {
    colour.gamma_multiply(alpha)
}

/// A rounded, dark, translucent button with a pink edge.
fn pill_button(ui: &mut Ui, text: &str, lit: bool) -> bool {
    let (fill, stroke, colour) = if lit {
        (faded(DEEP_PINK, 0.15), faded(DEEP_PINK, 0.45), Color32::WHITE)
    } else {
        (
            Color32::from_black_alpha(90),
            faded(DEEP_PINK, 0.25),
            faded(PALE_PINK, 0.9),
        )
    };

    ui.add(
        egui::Button::new(RichText::new(text).size(16.).color(colour))
            .fill(fill)
            .stroke(Stroke::new(1., stroke))
            .min_size(vec2(120., 44.)),
    )
    .clicked()
}

/// The card shown until the user enters. Returns what the user clicked, if anything.
pub fn landing(ctx: &Context, config: &OverlayConfig) -> Option<OverlayAction> {
    let screen = ctx.screen_rect();
    ctx.layer_painter(LayerId::new(Order::Background, Id::new("dx-landing-dim")))
        .rect_filled(screen, 0., Color32::from_black_alpha(102));

    let width = 720_f32.min(screen.width() * 0.92);
    let mut action = None;

    let card = egui::Area::new(Id::new("dx-landing"))
        .anchor(Align2::CENTER_CENTER, [0., 0.])
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(Color32::from_white_alpha(13))
                .stroke(Stroke::new(1., Color32::from_white_alpha(26)))
                .rounding(Rounding::same(24.))
                .inner_margin(40.)
                .show(ui, |ui| {
                    ui.set_width(width - 80.);

                    ui.label(
                        RichText::new(&config.title)
                            .size(46.)
                            .color(PALE_PINK)
                            .family(egui::FontFamily::Proportional),
                    );
                    ui.add_space(20.);
                    ui.label(
                        RichText::new(
                            "Pink dreams × tech vibes. After entering, click the screen to \
                             assemble or explode the tree. In gesture mode, move your hand to \
                             rotate and pinch to gather. Without a camera, hover to aim and hold \
                             the right button to pinch.",
                        )
                        .size(16.)
                        .color(faded(PALE_PINK, 0.7)),
                    );
                    ui.add_space(28.);

                    ui.horizontal(|ui| {
                        if pill_button(ui, "ENTER", true) {
                            action = Some(OverlayAction::Enter);
                        }
                        ui.add_space(12.);
                        if pill_button(ui, "GESTURE MODE", false) {
                            action = Some(OverlayAction::EnterWithGesture);
                        }
                    });
                    ui.add_space(22.);

                    ui.label(
                        RichText::new(
                            "TIP: IF THE MUSIC IS SILENT, TAP THE SPEAKER AT THE TOP RIGHT AGAIN",
                        )
                        .size(11.)
                        .color(Color32::from_white_alpha(102)),
                    );
                });
        });

    card_action(action, card.response.clicked())
}

/// What a click on the landing card does. A button wins, and anywhere else on the card counts as
/// the background.
fn card_action(button: Option<OverlayAction>, card_clicked: bool) -> Option<OverlayAction> {
    button.or(card_clicked.then_some(OverlayAction::BackgroundClick))
}

/// The title, music button, hint and mode buttons shown once the user has entered.
pub fn hud(ctx: &Context, state: &SessionState, config: &OverlayConfig) -> Vec<OverlayAction> {
    let mut actions = Vec::new();

    egui::Area::new(Id::new("dx-hud-title"))
        .anchor(Align2::LEFT_TOP, [28., 28.])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(RichText::new(&config.title).size(32.).color(PALE_PINK));
            ui.add_space(6.);
            ui.label(
                RichText::new("CLICK ANYWHERE TO TOGGLE")
                    .size(12.)
                    .color(faded(PALE_PINK, 0.45)),
            );
        });

    egui::Area::new(Id::new("dx-hud-music"))
        .anchor(Align2::RIGHT_TOP, [-28., 28.])
        .show(ctx, |ui| {
            let icon = if state.audio_playing { "🔊" } else { "🔇" };
            let clicked = ui
                .add(
                    egui::Button::new(RichText::new(icon).size(20.))
                        .fill(Color32::from_white_alpha(13))
                        .stroke(Stroke::new(1., Color32::from_white_alpha(26)))
                        .min_size(vec2(48., 48.)),
                )
                .on_hover_text("Toggle music")
                .clicked();
            if clicked {
                actions.push(OverlayAction::ToggleAudio);
            }
        });

    // Pulses like a slow heartbeat
    let time = ctx.input(|i| i.time);
    let pulse = 0.25 + 0.1 * (time * 2.).sin() as f32;
    let hint = if state.gesture_enabled {
        "MOVE YOUR HAND TO ROTATE"
    } else {
        "CLICK TO EXPLODE / ASSEMBLE"
    };
    ctx.layer_painter(LayerId::new(Order::Middle, Id::new("dx-hud-hint")))
        .text(
            ctx.screen_rect().center(),
            Align2::CENTER_CENTER,
            hint,
            FontId::proportional(12.),
            faded(PALE_PINK, pulse),
        );

    egui::Area::new(Id::new("dx-hud-controls"))
        .anchor(Align2::LEFT_BOTTOM, [28., -28.])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = match state.mode {
                    Mode::Assembled => "EXPLODE",
                    Mode::Exploded => "ASSEMBLE",
                };
                if pill_button(ui, label, false) {
                    actions.push(OverlayAction::ToggleMode);
                }
                ui.add_space(12.);

                let label = if state.gesture_enabled {
                    "GESTURE ON"
                } else {
                    "GESTURE OFF"
                };
                if pill_button(ui, label, state.gesture_enabled) {
                    actions.push(OverlayAction::ToggleGesture);
                }
            });
        });

    actions
}

/// The greeting on the right of the screen.
pub fn greeting(ctx: &Context, config: &OverlayConfig) {
    let screen = ctx.screen_rect();

    egui::Area::new(Id::new("dx-greeting"))
        .anchor(
            Align2::RIGHT_CENTER,
            [-92., screen.height() * (0.44 - 0.5)],
        )
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(Color32::from_white_alpha(31))
                .rounding(Rounding::same(14.))
                .inner_margin(egui::Margin::symmetric(16., 10.))
                .show(ui, |ui| {
                    ui.label(
                        RichText::new(&config.greeting_heading)
                            .size(34.)
                            .italics()
                            .color(ICE),
                    );
                });
            ui.add_space(10.);

            for line in &config.greeting_lines {
                ui.label(RichText::new(line).size(22.).strong().color(Color32::WHITE));
            }
        });
}

/// The pink dot that follows the index fingertip. `position` is normalised to the viewport.
pub fn finger_cursor(ctx: &Context, position: Pos2) {
    let screen = ctx.screen_rect();
    let centre = pos2(
        screen.min.x + position.x * screen.width(),
        screen.min.y + position.y * screen.height(),
    );

    let painter = ctx.layer_painter(LayerId::new(Order::Tooltip, Id::new("dx-finger-cursor")));
    painter.circle_filled(centre, 22., faded(PINK, 0.12));
    painter.circle_filled(centre, 15., faded(PINK, 0.25));
    painter.circle_filled(centre, 10., faded(PINK, 0.85));
}

/// The bones of a hand, as pairs of landmark indices.
const HAND_BONES: [(usize, usize); 20] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// The small mirrored preview in the bottom right, showing the tracked hand.
pub fn gesture_preview(ctx: &Context, status: &GestureStatus, hand: Option<&HandLandmarks>) {
    egui::Area::new(Id::new("dx-gesture-preview"))
        .anchor(Align2::RIGHT_BOTTOM, [-16., -16.])
        .interactable(false)
        .show(ctx, |ui| {
            let (rect, _) = ui.allocate_exact_size(vec2(144., 112.), Sense::hover());
            let painter = ui.painter_at(rect);

            painter.rect(
                rect,
                Rounding::same(12.),
                Color32::from_black_alpha(128),
                Stroke::new(2., faded(PINK, 0.5)),
            );

            let message = match status {
                GestureStatus::Initializing => Some("Loading AI..."),
                GestureStatus::Failed(_) => Some("Camera unavailable"),
                GestureStatus::Disabled | GestureStatus::Active => None,
            };
            if let Some(message) = message {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    message,
                    FontId::proportional(11.),
                    Color32::from_white_alpha(179),
                );
                return;
            }

            let Some(hand) = hand.filter(|hand| hand.points().len() >= LANDMARK_COUNT) else {
                return;
            };

            // Mirrored like a selfie camera
            let to_screen = |i: usize| {
                let landmark = hand[i];
                pos2(
                    rect.min.x + (1. - landmark.x) * rect.width(),
                    rect.min.y + landmark.y * rect.height(),
                )
            };
            for (a, b) in HAND_BONES {
                painter.line_segment(
                    [to_screen(a), to_screen(b)],
                    Stroke::new(1.5, faded(PALE_PINK, 0.7)),
                );
            }
            for i in 0..LANDMARK_COUNT {
                painter.circle_filled(to_screen(i), 2., PINK);
            }
        });
}

/// The text shown while the scene is being built.
pub fn loading(ctx: &Context) {
    ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("dx-loading")))
        .text(
            ctx.screen_rect().center(),
            Align2::CENTER_CENTER,
            "Loading Magic...",
            FontId::proportional(18.),
            faded(PALE_PINK, 0.8),
        );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entering_starts_the_music() {
        let store = Store::new();
        OverlayAction::Enter.apply(&store);

        let state = store.snapshot();
        assert!(state.entered);
        assert!(state.audio_playing);
        assert!(!state.gesture_enabled);
    }

    #[test]
    fn gesture_mode_flips_gestures_and_enters() {
        let store = Store::new();
        OverlayAction::EnterWithGesture.apply(&store);

        let state = store.snapshot();
        assert!(state.entered);
        assert!(state.audio_playing);
        assert!(state.gesture_enabled);
    }

    #[test]
    fn background_clicks_enter_then_toggle() {
        let store = Store::new();

        OverlayAction::BackgroundClick.apply(&store);
        assert!(store.entered());
        assert_eq!(store.mode(), Mode::Assembled);

        OverlayAction::BackgroundClick.apply(&store);
        assert_eq!(store.mode(), Mode::Exploded);
        OverlayAction::BackgroundClick.apply(&store);
        assert_eq!(store.mode(), Mode::Assembled);
    }

    #[test]
    fn clicking_the_card_enters() {
        assert_eq!(card_action(None, false), None);
        assert_eq!(card_action(None, true), Some(OverlayAction::BackgroundClick));
        assert_eq!(
            card_action(Some(OverlayAction::EnterWithGesture), true),
            Some(OverlayAction::EnterWithGesture)
        );

        let store = Store::new();
        if let Some(action) = card_action(None, true) {
            action.apply(&store);
        }
        assert!(store.entered());
        assert_eq!(store.mode(), Mode::Assembled);
    }

    #[test]
    fn landing_without_input_does_nothing() {
        let ctx = Context::default();
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                assert_eq!(landing(ctx, &OverlayConfig::default()), None);
            });
        }
    }

    #[test]
    fn hud_toggles() {
        let store = Store::new();
        store.enter();

        OverlayAction::ToggleAudio.apply(&store);
        assert!(store.audio_playing());
        OverlayAction::ToggleGesture.apply(&store);
        assert!(store.gesture_enabled());
        OverlayAction::ToggleMode.apply(&store);
        assert_eq!(store.mode(), Mode::Exploded);

        // None of them leave the session
        assert!(store.entered());
    }

    #[test]
    fn default_greeting() {
        let config = OverlayConfig::default();
        assert_eq!(config.greeting_heading, "Merry Christmas");
        assert_eq!(config.greeting_lines.len(), 4);
        assert_eq!(config.greeting_lines[0], "to syy:");
    }
}
