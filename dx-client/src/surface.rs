//! This module tracks whether the rendering surface still has its graphics context.
//!
//! While the context is lost, the scene keeps running but post-processing is skipped. When it comes
//! back, the canvas key moves on and the app rebuilds the scene from scratch.

use async_channel::Receiver;
use tracing::{debug, warn};

/// Something that happened to the graphics context of the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    ContextLost,
    ContextRestored,
}

/// The state of the graphics context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceLifecycle {
    lost: bool,
    canvas_key: u64,
}

impl SurfaceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event and return whether anything changed.
    pub fn handle(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::ContextLost if !self.lost => {
                warn!("Graphics context lost");
                self.lost = true;
                true
            }
            SurfaceEvent::ContextRestored if self.lost => {
                self.lost = false;
                self.canvas_key += 1;
                debug!(canvas_key = self.canvas_key, "Graphics context restored");
                true
            }
            event => {
                debug!(?event, "Ignoring repeated surface event");
                false
            }
        }
    }

    /// Is the context currently lost?
    #[inline]
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Should post-processing be drawn?
    #[inline]
    pub fn postfx_enabled(&self) -> bool {
        !self.lost
    }

    /// Bumped on every restore. Anything built against an older key should be rebuilt.
    #[inline]
    pub fn canvas_key(&self) -> u64 {
        self.canvas_key
    }
}

/// Listens for context events on the canvas.
pub struct SurfaceWatcher {
    rx: Receiver<SurfaceEvent>,

    #[cfg(target_family = "wasm")]
    _listeners: web::Listeners,
}

impl std::fmt::Debug for SurfaceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceWatcher")
            .field("pending", &self.rx.len())
            .finish_non_exhaustive()
    }
}

impl SurfaceWatcher {
    /// Start listening on the canvas with the given element ID.
    #[cfg(target_family = "wasm")]
    pub fn attach(canvas_id: &str) -> Option<Self> {
        let (tx, rx) = async_channel::unbounded();
        let listeners = web::Listeners::attach(canvas_id, tx)?;
        debug!(canvas_id, "Watching canvas for context loss");
        Some(Self {
            rx,
            _listeners: listeners,
        })
    }

    /// Native windows don't report context loss.
    #[cfg(not(target_family = "wasm"))]
    pub fn attach(canvas_id: &str) -> Option<Self> {
        debug!(canvas_id, "Context loss isn't reported natively");
        None
    }

    /// Take every event that has arrived since the last call.
    pub fn drain(&self) -> impl Iterator<Item = SurfaceEvent> + '_ {
        std::iter::from_fn(|| self.rx.try_recv().ok())
    }
}

#[cfg(target_family = "wasm")]
mod web {
    use super::SurfaceEvent;
    use async_channel::Sender;
    use tracing::error;
    use wasm_bindgen::{closure::Closure, JsCast};
    use web_sys::{Element, Event};

    type Callback = Closure<dyn FnMut(Event)>;

    /// The event listeners on the canvas. Dropping this removes them.
    pub(super) struct Listeners {
        canvas: Element,
        handlers: Vec<(&'static str, Callback)>,
    }

    impl Listeners {
        pub(super) fn attach(canvas_id: &str, tx: Sender<SurfaceEvent>) -> Option<Self> {
            let canvas = web_sys::window()?
                .document()?
                .get_element_by_id(canvas_id)?;

            let handler = |surface_event: SurfaceEvent| -> Callback {
                let tx = tx.clone();
                Closure::new(move |event: Event| {
                    // Without this the browser never tries to restore the context
                    if surface_event == SurfaceEvent::ContextLost {
                        event.prevent_default();
                    }
                    if tx.try_send(surface_event).is_err() {
                        error!(?surface_event, "Surface event channel closed");
                    }
                })
            };

            let handlers = vec![
                ("webglcontextlost", handler(SurfaceEvent::ContextLost)),
                ("webglcontextrestored", handler(SurfaceEvent::ContextRestored)),
            ];

            for (name, callback) in &handlers {
                if let Err(e) = canvas
                    .add_event_listener_with_callback(name, callback.as_ref().unchecked_ref())
                {
                    error!(?e, name, "Failed to add canvas event listener");
                    return None;
                }
            }

            Some(Self { canvas, handlers })
        }
    }

    impl Drop for Listeners {
        fn drop(&mut self) {
            for (name, callback) in &self.handlers {
                let _ = self
                    .canvas
                    .remove_event_listener_with_callback(name, callback.as_ref().unchecked_ref());
            }
        }
    }
}
