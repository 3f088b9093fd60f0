//! This module shows a plain error screen when the scene can't be drawn.

use egui::{Color32, Context, RichText};
use std::any::Any;

/// Get a readable message out of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fill the window with the error and nothing else.
pub fn show(ctx: &Context, detail: &str) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none().fill(Color32::BLACK).inner_margin(16.))
        .show(ctx, |ui| {
            ui.heading(RichText::new("The page ran into an error").color(Color32::WHITE));
            ui.add_space(8.);
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.label(
                    RichText::new(detail)
                        .monospace()
                        .color(Color32::from_white_alpha(217)),
                );
            });
        });
}
