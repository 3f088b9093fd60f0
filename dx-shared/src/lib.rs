//! This crate provides the [`Mode`] of the particle tree and the [`Store`] that holds the shared
//! session state.
//!
//! The store is an explicit handle rather than a global. The client, the scene and the gesture
//! controller each hold a clone of the same [`Store`] and observe changes through
//! [`Store::subscribe`] or [`Store::events`].

mod mode;
mod store;

pub use self::{
    mode::Mode,
    store::{SessionState, Store, StoreEvent, SubscriptionId},
};
