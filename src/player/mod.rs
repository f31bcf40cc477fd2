//! Playback controller and its state.
//!
//! - [`PlayerController`]: the state machine driving sink, backend and renderer
//! - [`Event`]: the queue items timers, requests and the sink report back with
//! - [`state`]: views, track lists and transport state

mod controller;
pub mod events;
pub mod state;


pub use controller::PlayerController;
pub use events::{Event, LikedRequest};
pub use state::{
    EmptyState, PlayOutcome, PlaybackFailure, PlaybackState, PlaybackStatus, PlayerState,
    Progress, TrackLists, View,
};
