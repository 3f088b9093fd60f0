//! This module provides the [`Store`] for the session state.

use crate::Mode;
use async_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};
use tracing::{debug, trace};
use tracing_unwrap::ResultExt;

/// The state of the current session. None of these fields depend on each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Has the user dismissed the landing card?
    pub entered: bool,

    /// The current display mode.
    pub mode: Mode,

    /// Has the user asked for gesture control?
    pub gesture_enabled: bool,

    /// Should the background music be playing?
    pub audio_playing: bool,
}

/// A single change to the [`SessionState`], carrying the new value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// [`SessionState::entered`] changed.
    Entered(bool),

    /// [`SessionState::mode`] changed.
    ModeChanged(Mode),

    /// [`SessionState::gesture_enabled`] changed.
    GestureEnabled(bool),

    /// [`SessionState::audio_playing`] changed.
    AudioPlaying(bool),
}

/// A handle to an observer registered with [`Store::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A callback that wants to know about every [`StoreEvent`].
type Observer = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Everyone who is listening to the store.
#[derive(Default)]
struct Observers {
    /// The ID to give to the next subscriber.
    next_id: u64,

    /// Callbacks registered with [`Store::subscribe`].
    callbacks: Vec<(SubscriptionId, Observer)>,

    /// Channels handed out by [`Store::events`]. Closed channels get dropped on the next event.
    channels: Vec<Sender<StoreEvent>>,
}

/// The shared session store.
///
/// Cloning a [`Store`] gives another handle to the same state. Observers are called synchronously
/// on the thread that made the change, after the state lock has been released, so they are free to
/// read from the store. They are only called when a value actually changes.
#[derive(Clone, Default)]
pub struct Store {
    /// The state itself.
    state: Arc<RwLock<SessionState>>,

    /// The observers of the state.
    observers: Arc<RwLock<Observers>>,

    /// The number of changes that have been applied to the state.
    revision: Arc<AtomicU64>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.snapshot())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Create a new store with the default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new store with the given initial state.
    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    /// Get a copy of the whole state.
    pub fn snapshot(&self) -> SessionState {
        *self
            .state
            .read()
            .expect_or_log("Should be able to read from the session state")
    }

    /// The number of changes applied since the store was created.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Has the user entered?
    pub fn entered(&self) -> bool {
        self.snapshot().entered
    }

    /// Mark the session as entered.
    pub fn enter(&self) -> bool {
        self.set_entered(true)
    }

    /// Set whether the session has been entered. Returns whether anything changed.
    pub fn set_entered(&self, entered: bool) -> bool {
        self.update(|state| {
            if state.entered == entered {
                return None;
            }
            state.entered = entered;
            Some(StoreEvent::Entered(entered))
        })
    }

    /// The current mode.
    pub fn mode(&self) -> Mode {
        self.snapshot().mode
    }

    /// Set the mode. Returns whether anything changed.
    pub fn set_mode(&self, mode: Mode) -> bool {
        self.update(|state| {
            if state.mode == mode {
                return None;
            }
            state.mode = mode;
            Some(StoreEvent::ModeChanged(mode))
        })
    }

    /// Switch to the other mode and return the new one.
    pub fn toggle_mode(&self) -> Mode {
        let mut new_mode = Mode::default();
        self.update(|state| {
            state.mode = state.mode.toggled();
            new_mode = state.mode;
            Some(StoreEvent::ModeChanged(state.mode))
        });
        new_mode
    }

    /// Is gesture control enabled?
    pub fn gesture_enabled(&self) -> bool {
        self.snapshot().gesture_enabled
    }

    /// Enable or disable gesture control. Returns whether anything changed.
    pub fn set_gesture_enabled(&self, enabled: bool) -> bool {
        self.update(|state| {
            if state.gesture_enabled == enabled {
                return None;
            }
            state.gesture_enabled = enabled;
            Some(StoreEvent::GestureEnabled(enabled))
        })
    }

    /// Flip gesture control and return the new value.
    pub fn toggle_gesture(&self) -> bool {
        let mut enabled = false;
        self.update(|state| {
            state.gesture_enabled = !state.gesture_enabled;
            enabled = state.gesture_enabled;
            Some(StoreEvent::GestureEnabled(enabled))
        });
        enabled
    }

    /// Should the music be playing?
    pub fn audio_playing(&self) -> bool {
        self.snapshot().audio_playing
    }

    /// Set whether the music should be playing. Returns whether anything changed.
    pub fn set_audio_playing(&self, playing: bool) -> bool {
        self.update(|state| {
            if state.audio_playing == playing {
                return None;
            }
            state.audio_playing = playing;
            Some(StoreEvent::AudioPlaying(playing))
        })
    }

    /// Flip the music and return the new value.
    pub fn toggle_audio(&self) -> bool {
        let mut playing = false;
        self.update(|state| {
            state.audio_playing = !state.audio_playing;
            playing = state.audio_playing;
            Some(StoreEvent::AudioPlaying(playing))
        });
        playing
    }

    /// Register a callback to be run after every change.
    pub fn subscribe(
        &self,
        observer: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut observers = self
            .observers
            .write()
            .expect_or_log("Should be able to write to the store observers");

        let id = SubscriptionId(observers.next_id);
        observers.next_id += 1;
        observers.callbacks.push((id, Arc::new(observer)));
        id
    }

    /// Remove a callback registered with [`Self::subscribe`]. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .observers
            .write()
            .expect_or_log("Should be able to write to the store observers");

        let before = observers.callbacks.len();
        observers.callbacks.retain(|(other, _)| *other != id);
        observers.callbacks.len() != before
    }

    /// Get a channel that receives every future [`StoreEvent`].
    ///
    /// Events are pushed onto the channel synchronously, so they can be drained with
    /// [`Receiver::try_recv`] once per frame.
    pub fn events(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = async_channel::unbounded();
        self.observers
            .write()
            .expect_or_log("Should be able to write to the store observers")
            .channels
            .push(tx);
        rx
    }

    /// Apply `change` to the state and notify everyone if it returned an event.
    fn update(&self, change: impl FnOnce(&mut SessionState) -> Option<StoreEvent>) -> bool {
        let event = {
            let mut state = self
                .state
                .write()
                .expect_or_log("Should be able to write to the session state");
            change(&mut state)
        };

        let Some(event) = event else {
            trace!("Store update was a no-op");
            return false;
        };

        self.revision.fetch_add(1, Ordering::SeqCst);
        debug!(?event, "Session state changed");
        self.notify(&event);
        true
    }

    /// Call every observer with the given event.
    fn notify(&self, event: &StoreEvent) {
        let callbacks: Vec<Observer> = {
            let mut observers = self
                .observers
                .write()
                .expect_or_log("Should be able to write to the store observers");

            observers
                .channels
                .retain(|tx| tx.try_send(*event).is_ok());

            observers
                .callbacks
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };

        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{atomic::AtomicUsize, Mutex};

    #[test]
    fn starts_with_default_state() {
        let store = Store::new();
        assert_eq!(store.snapshot(), SessionState::default());
        assert!(!store.entered());
        assert_eq!(store.mode(), Mode::Assembled);
        assert!(!store.gesture_enabled());
        assert!(!store.audio_playing());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn toggle_mode_twice_returns_to_original() {
        let store = Store::new();
        assert_eq!(store.toggle_mode(), Mode::Exploded);
        assert_eq!(store.toggle_mode(), Mode::Assembled);
        assert_eq!(store.mode(), Mode::Assembled);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn fields_are_independent() {
        let store = Store::new();
        store.enter();
        store.toggle_gesture();

        assert_eq!(
            store.snapshot(),
            SessionState {
                entered: true,
                mode: Mode::Assembled,
                gesture_enabled: true,
                audio_playing: false,
            }
        );

        store.toggle_audio();
        store.set_mode(Mode::Exploded);
        assert!(store.entered());
        assert!(store.gesture_enabled());
        assert!(store.audio_playing());
        assert_eq!(store.mode(), Mode::Exploded);
    }

    #[test]
    fn observers_only_hear_about_real_changes() {
        let store = Store::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        store.subscribe({
            let events = Arc::clone(&events);
            move |event| events.lock().unwrap().push(*event)
        });

        assert!(!store.set_mode(Mode::Assembled));
        assert!(store.set_mode(Mode::Exploded));
        assert!(!store.set_mode(Mode::Exploded));
        assert!(store.set_audio_playing(true));
        assert!(!store.set_audio_playing(true));
        assert!(store.enter());
        assert!(!store.enter());

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                StoreEvent::ModeChanged(Mode::Exploded),
                StoreEvent::AudioPlaying(true),
                StoreEvent::Entered(true),
            ]
        );
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn observers_are_called_synchronously_and_can_read_the_store() {
        let store = Store::new();
        let seen_mode = Arc::new(Mutex::new(None));

        store.subscribe({
            let store = store.clone();
            let seen_mode = Arc::clone(&seen_mode);
            move |_| *seen_mode.lock().unwrap() = Some(store.mode())
        });

        store.toggle_mode();
        assert_eq!(*seen_mode.lock().unwrap(), Some(Mode::Exploded));
    }

    #[test]
    fn unsubscribed_observers_are_not_called() {
        let store = Store::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let id = store.subscribe({
            let calls = Arc::clone(&calls);
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.toggle_gesture();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.toggle_gesture();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_channels_receive_changes_in_order() {
        let store = Store::new();
        let rx = store.events();

        store.enter();
        store.toggle_gesture();
        store.set_mode(Mode::Exploded);

        assert_eq!(rx.try_recv(), Ok(StoreEvent::Entered(true)));
        assert_eq!(rx.try_recv(), Ok(StoreEvent::GestureEnabled(true)));
        assert_eq!(rx.try_recv(), Ok(StoreEvent::ModeChanged(Mode::Exploded)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_event_channels_are_forgotten() {
        let store = Store::new();
        drop(store.events());
        let rx = store.events();

        store.toggle_audio();
        assert_eq!(store.observers.read().unwrap().channels.len(), 1);
        assert_eq!(rx.try_recv(), Ok(StoreEvent::AudioPlaying(true)));
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new();
        let other = store.clone();
        other.toggle_mode();
        assert_eq!(store.mode(), Mode::Exploded);
    }
}
