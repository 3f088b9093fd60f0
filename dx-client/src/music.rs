//! This module handles the looping background music.

use dx_shared::SessionState;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// The config for the background music.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Where to fetch the track from.
    pub src: String,

    /// The volume in `[0, 1]`.
    pub volume: f64,

    pub looped: bool,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            src: "/christmas_loop.mp3".to_string(),
            volume: 0.55,
            looped: true,
        }
    }
}

/// An error from trying to play music.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AudioError {
    /// There's no way to play audio here.
    #[error("audio is unavailable: {0}")]
    Unavailable(String),

    /// The browser refused to start playback, usually because the user hasn't interacted yet.
    #[error("playback was rejected: {0}")]
    Rejected(String),
}

/// Something that can play and pause the track.
pub trait Music {
    /// Start or resume playback.
    fn play(&mut self) -> Result<(), AudioError>;

    /// Pause playback.
    fn pause(&mut self);
}

/// Keeps a [`Music`] in step with the session, so that it plays exactly while the user has entered
/// and wants audio.
pub struct MusicPlayer {
    music: Box<dyn Music>,

    /// Whether the session wanted music at the last sync.
    wanted: bool,

    playing: bool,
}

impl std::fmt::Debug for MusicPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicPlayer")
            .field("wanted", &self.wanted)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}

impl MusicPlayer {
    pub fn new(music: Box<dyn Music>) -> Self {
        Self {
            music,
            wanted: false,
            playing: false,
        }
    }

    /// Use the music for this platform.
    pub fn for_platform(config: &MusicConfig) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_family = "wasm")] {
                let music: Box<dyn Music> = match web::WebMusic::new(config) {
                    Ok(music) => Box::new(music),
                    Err(error) => {
                        tracing::warn!(%error, "Falling back to silence");
                        Box::new(SilentMusic::default())
                    }
                };
            } else {
                let music: Box<dyn Music> = Box::new(SilentMusic::default());
                debug!(src = %config.src, "Music is silent on native");
            }
        }
        Self::new(music)
    }

    /// Has playback been started and not paused since?
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Play or pause to match the session. Only changes of the wanted state touch the music.
    #[instrument(skip_all)]
    pub fn sync(&mut self, state: &SessionState) {
        let wanted = state.entered && state.audio_playing;
        if wanted == self.wanted {
            return;
        }
        self.wanted = wanted;

        if wanted {
            // A rejected play is retried the next time audio is switched back on
            match self.music.play() {
                Ok(()) => self.playing = true,
                Err(error) => debug!(%error, "Ignoring failure to play music"),
            }
        } else {
            self.music.pause();
            self.playing = false;
        }
    }
}

/// Music that makes no sound.
#[derive(Debug, Default)]
pub struct SilentMusic {
    told: bool,
}

impl Music for SilentMusic {
    fn play(&mut self) -> Result<(), AudioError> {
        if !self.told {
            tracing::info!("No audio output, so the music will be silent");
            self.told = true;
        }
        Ok(())
    }

    fn pause(&mut self) {}
}

#[cfg(target_family = "wasm")]
mod web {
    use super::{AudioError, Music, MusicConfig};
    use tracing::debug;
    use web_sys::HtmlAudioElement;

    /// An `<audio>` element playing the track.
    pub(super) struct WebMusic {
        audio: HtmlAudioElement,
    }

    impl WebMusic {
        pub(super) fn new(config: &MusicConfig) -> Result<Self, AudioError> {
            let audio = HtmlAudioElement::new_with_src(&config.src)
                .map_err(|e| AudioError::Unavailable(format!("{e:?}")))?;
            audio.set_loop(config.looped);
            audio.set_volume(config.volume);
            Ok(Self { audio })
        }
    }

    impl Music for WebMusic {
        fn play(&mut self) -> Result<(), AudioError> {
            let promise = self
                .audio
                .play()
                .map_err(|e| AudioError::Rejected(format!("{e:?}")))?;

            // Autoplay rejection only shows up when the promise settles
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    debug!(?e, "Browser rejected music playback");
                }
            });
            Ok(())
        }

        fn pause(&mut self) {
            if let Err(e) = self.audio.pause() {
                debug!(?e, "Failed to pause music");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recording {
        calls: Arc<Mutex<Vec<&'static str>>>,
        reject_next: Arc<Mutex<bool>>,
    }

    impl Music for Recording {
        fn play(&mut self) -> Result<(), AudioError> {
            self.calls.lock().unwrap().push("play");
            if std::mem::take(&mut *self.reject_next.lock().unwrap()) {
                Err(AudioError::Rejected("no gesture yet".to_string()))
            } else {
                Ok(())
            }
        }

        fn pause(&mut self) {
            self.calls.lock().unwrap().push("pause");
        }
    }

    fn state(entered: bool, audio_playing: bool) -> SessionState {
        SessionState {
            entered,
            audio_playing,
            ..Default::default()
        }
    }

    #[test]
    fn plays_only_after_entering() {
        let music = Recording::default();
        let mut player = MusicPlayer::new(Box::new(music.clone()));

        player.sync(&state(false, true));
        assert!(music.calls.lock().unwrap().is_empty());

        player.sync(&state(true, true));
        player.sync(&state(true, true));
        assert!(player.is_playing());

        player.sync(&state(true, false));
        assert!(!player.is_playing());

        assert_eq!(*music.calls.lock().unwrap(), vec!["play", "pause"]);
    }

    #[test]
    fn rejection_is_swallowed_and_retried() {
        let music = Recording::default();
        *music.reject_next.lock().unwrap() = true;
        let mut player = MusicPlayer::new(Box::new(music.clone()));

        player.sync(&state(true, true));
        assert!(!player.is_playing());

        // Only toggling audio off and on again retries
        player.sync(&state(true, true));
        player.sync(&state(true, false));
        player.sync(&state(true, true));
        assert!(player.is_playing());

        assert_eq!(*music.calls.lock().unwrap(), vec!["play", "pause", "play"]);
    }
}
