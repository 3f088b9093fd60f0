//! This crate implements `Dreamy Xmas`, an interactive particle Christmas tree with a greeting,
//! music, and optional hand gesture control.

// The client primarily runs on Wasm, where async tasks never move between threads
#![allow(clippy::future_not_send)]

mod app;
mod config;
mod fallback;
mod music;
mod overlay;
mod scene;
mod surface;

use self::{app::App, config::AppConfig};

#[cfg(not(target_family = "wasm"))]
fn main() -> color_eyre::Result<()> {
    use tracing_subscriber::EnvFilter;

    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load();
    let options = eframe::NativeOptions {
        follow_system_theme: true,
        ..Default::default()
    };

    eframe::run_native(
        "Dreamy Xmas",
        options,
        Box::new(move |cc| Box::new(App::new(cc, config))),
    )
    .map_err(|error| color_eyre::eyre::eyre!("Unable to run native eframe app: {error}"))
}

#[cfg(target_family = "wasm")]
fn main() {
    use tracing_unwrap::ResultExt;

    cfg_if::cfg_if! {
        if #[cfg(debug_assertions)] {
            const MAX_TRACING_LEVEL: tracing::Level = tracing::Level::DEBUG;
        } else {
            const MAX_TRACING_LEVEL: tracing::Level = tracing::Level::INFO;
        }
    }

    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(MAX_TRACING_LEVEL)
            .build(),
    );

    let config = AppConfig::load();
    let options = eframe::WebOptions {
        follow_system_theme: true,
        ..Default::default()
    };

    prokio::Runtime::default().spawn_pinned(move || async move {
        eframe::web::WebRunner::new()
            .start(
                app::CANVAS_ID,
                options,
                Box::new(move |cc| Box::new(App::new(cc, config))),
            )
            .await
            .expect_or_log("Unable to start WASM eframe app");
    });
}
