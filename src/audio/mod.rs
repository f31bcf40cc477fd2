//! Audio output seam.
//!
//! The controller only ever talks to an [`AudioSink`]: it sets a source,
//! asks it to play, pause, seek and change volume, and receives
//! [`AudioEvent`]s back through the [`AudioEventSender`] it attaches.

#[cfg(feature = "rodio-output")]
pub mod rodio_sink;
pub mod silent;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;
use crate::player::Event;

#[cfg(feature = "rodio-output")]
pub use rodio_sink::RodioSink;
pub use silent::SilentSink;

/// Notifications an audio sink reports asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// Playback position moved.
    TimeUpdate { position: f64, duration: f64 },
    /// The current source played to the end.
    Ended,
    /// The current source failed after playback started.
    Error(String),
    /// The source could not be fetched or decoded after `play` accepted it.
    /// Handled like a rejected play.
    LoadFailed(String),
    /// The source's real duration became known.
    MetadataLoaded { duration: f64 },
}

/// Handle a sink uses to push [`AudioEvent`]s to the controller.
///
/// Every event is stamped with a source generation, which the controller
/// bumps each time it hands the sink a new source. Events stamped with an
/// older generation are dropped.
#[derive(Debug, Clone)]
pub struct AudioEventSender {
    tx: UnboundedSender<Event>,
    generation: Arc<AtomicU64>,
    pinned: Option<u64>,
}

impl AudioEventSender {
    pub(crate) fn new(tx: UnboundedSender<Event>, generation: Arc<AtomicU64>) -> Self {
        Self {
            tx,
            generation,
            pinned: None,
        }
    }

    /// A sender bound to the source loaded right now. Background tasks that
    /// outlive a source should report through one of these.
    pub fn pinned(&self) -> Self {
        Self {
            pinned: Some(self.generation.load(Ordering::Acquire)),
            ..self.clone()
        }
    }

    /// Whether the source this sender is bound to is still the current one.
    /// Unpinned senders are always current.
    pub fn is_current(&self) -> bool {
        self.pinned
            .map_or(true, |pinned| pinned == self.generation.load(Ordering::Acquire))
    }

    /// Queue an event. Returns false once the controller is gone.
    pub fn emit(&self, event: AudioEvent) -> bool {
        let source = self
            .pinned
            .unwrap_or_else(|| self.generation.load(Ordering::Acquire));
        self.tx.send(Event::Audio { source, event }).is_ok()
    }
}

/// Play/pause/seek/volume primitive driven by the controller.
#[async_trait]
pub trait AudioSink: Send {
    /// Receive the channel for asynchronous notifications.
    fn attach(&mut self, _events: AudioEventSender) {}

    /// Replace the current source. Playback stops; position resets to 0.
    fn set_source(&mut self, url: &str, duration_hint: Option<f64>);

    /// Start or resume the current source. A source that played to the end
    /// starts over.
    ///
    /// Sinks that load in the background may return `Ok` right away and
    /// report a failed load later as [`AudioEvent::LoadFailed`].
    ///
    /// # Errors
    ///
    /// Returns `Playback` if the source is rejected outright.
    async fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Seek to `fraction` (0.0-1.0) of the duration.
    fn seek(&mut self, fraction: f64);

    /// Set output volume, 0.0-1.0.
    fn set_volume(&mut self, volume: f32);

    /// Current position in seconds.
    fn current_time(&self) -> f64;

    /// Source duration in seconds, once known.
    fn duration(&self) -> Option<f64>;
}
