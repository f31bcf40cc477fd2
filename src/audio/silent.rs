//! Audio sink without an output device.
//!
//! Advances a clock while "playing" and reports time updates and the end of
//! the track from the duration hint. Useful headless and in tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{AudioEvent, AudioEventSender, AudioSink};
use crate::error::{PlayerError, Result};

const DEFAULT_TICK: Duration = Duration::from_millis(250);

/// Clock-driven sink that produces no sound.
#[derive(Debug)]
pub struct SilentSink {
    events: Option<AudioEventSender>,
    source: Option<String>,
    duration: Option<f64>,
    position: Arc<Mutex<f64>>,
    ticker: Option<JoinHandle<()>>,
    tick: Duration,
    volume: f32,
}

impl Default for SilentSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SilentSink {
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    /// Sink whose clock advances in steps of `tick`.
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            events: None,
            source: None,
            duration: None,
            position: Arc::new(Mutex::new(0.0)),
            ticker: None,
            tick,
            volume: 1.0,
        }
    }

    /// Currently loaded source URL.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn set_position(&self, seconds: f64) {
        if let Ok(mut pos) = self.position.lock() {
            *pos = seconds;
        }
    }
}

impl Drop for SilentSink {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[async_trait]
impl AudioSink for SilentSink {
    fn attach(&mut self, events: AudioEventSender) {
        self.events = Some(events);
    }

    fn set_source(&mut self, url: &str, duration_hint: Option<f64>) {
        self.stop_ticker();
        self.source = Some(url.to_string());
        self.duration = duration_hint.filter(|d| d.is_finite() && *d > 0.0);
        self.set_position(0.0);

        if let (Some(events), Some(duration)) = (&self.events, self.duration) {
            events.emit(AudioEvent::MetadataLoaded { duration });
        }
    }

    async fn play(&mut self) -> Result<()> {
        let source = self.source.clone().unwrap_or_default();
        if source.is_empty() {
            return Err(PlayerError::Playback("no source loaded".to_string()));
        }
        if self.is_playing() {
            return Ok(());
        }
        if self
            .duration
            .is_some_and(|total| self.current_time() >= total)
        {
            self.set_position(0.0);
        }

        debug!("Silent playback of {}", source);
        let position = Arc::clone(&self.position);
        let events = self.events.as_ref().map(AudioEventSender::pinned);
        let duration = self.duration;
        let tick = self.tick;

        self.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                let now = match position.lock() {
                    Ok(mut pos) => {
                        *pos += tick.as_secs_f64();
                        if let Some(total) = duration {
                            *pos = (*pos).min(total);
                        }
                        *pos
                    }
                    Err(_) => break,
                };
                let Some(events) = events.as_ref() else {
                    continue;
                };
                if let Some(total) = duration {
                    events.emit(AudioEvent::TimeUpdate {
                        position: now,
                        duration: total,
                    });
                    if now >= total {
                        events.emit(AudioEvent::Ended);
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    fn pause(&mut self) {
        self.stop_ticker();
    }

    fn seek(&mut self, fraction: f64) {
        if let Some(duration) = self.duration {
            self.set_position(fraction.clamp(0.0, 1.0) * duration);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn current_time(&self) -> f64 {
        self.position.lock().map(|pos| *pos).unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }
}
