//! Audio sink backed by rodio.
//!
//! The output stream lives on a dedicated audio thread that owns the rodio
//! `Sink` and receives [`AudioCmd`]s over a channel. Sources are fetched over
//! HTTP in a background task, then decoded from memory on that thread, so
//! `play` never waits on the network.

use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use super::{AudioEvent, AudioEventSender, AudioSink};
use crate::error::{PlayerError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for downloading a whole source.
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

enum AudioCmd {
    /// Drop the current source; a new one is on its way.
    Clear,
    Load {
        bytes: Vec<u8>,
        duration_hint: Option<f64>,
        events: Option<AudioEventSender>,
    },
    Play,
    Pause,
    Seek(Duration),
    SetVolume(f32),
    Quit,
}

/// Position and duration shared with the audio thread.
#[derive(Debug, Default, Clone, Copy)]
struct PlaybackInfo {
    position: f64,
    duration: Option<f64>,
}

type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;

/// Sink that plays HTTP audio streams on the default output device.
pub struct RodioSink {
    tx: Sender<AudioCmd>,
    client: Client,
    events: Option<AudioEventSender>,
    source: Option<String>,
    duration_hint: Option<f64>,
    /// Download of the current source, once `play` asked for it. Resolves
    /// to whether the bytes reached the audio thread.
    fetch: Option<tokio::task::JoinHandle<bool>>,
    downloaded: bool,
    playback: PlaybackHandle,
    join: Option<JoinHandle<()>>,
}

impl RodioSink {
    /// Open the default output device and start the audio thread.
    ///
    /// # Errors
    ///
    /// Returns `NoAudioDevice` if no output stream can be opened.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("playdeck/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .build()?;

        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let playback: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let join = spawn_audio_thread(rx, ready_tx, Arc::clone(&playback));
        ready_rx
            .recv()
            .map_err(|_| PlayerError::NoAudioDevice("audio thread exited".to_string()))??;

        Ok(Self {
            tx,
            client,
            events: None,
            source: None,
            duration_hint: None,
            fetch: None,
            downloaded: false,
            playback,
            join: Some(join),
        })
    }

    fn send(&self, cmd: AudioCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("Audio thread is gone");
        }
    }

    fn abort_fetch(&mut self) {
        if let Some(handle) = self.fetch.take() {
            handle.abort();
        }
    }

    /// Download `url` in the background and hand the bytes to the audio thread.
    fn start_fetch(&mut self, url: String) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let events = self.events.as_ref().map(AudioEventSender::pinned);
        let duration_hint = self.duration_hint;

        self.fetch = Some(tokio::spawn(async move {
            match fetch(&client, &url).await {
                Ok(bytes) => tx
                    .send(AudioCmd::Load {
                        bytes,
                        duration_hint,
                        events,
                    })
                    .is_ok(),
                Err(e) => {
                    warn!("Fetching {} failed: {}", url, e);
                    if let Some(events) = events {
                        events.emit(AudioEvent::LoadFailed(e.to_string()));
                    }
                    false
                }
            }
        }));
    }
}

async fn fetch(client: &Client, url: &str) -> Result<Vec<u8>> {
    debug!("Fetching audio {}", url);
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        self.abort_fetch();
        self.send(AudioCmd::Quit);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl AudioSink for RodioSink {
    fn attach(&mut self, events: AudioEventSender) {
        self.events = Some(events);
    }

    fn set_source(&mut self, url: &str, duration_hint: Option<f64>) {
        self.abort_fetch();
        self.downloaded = false;
        self.send(AudioCmd::Clear);
        self.source = Some(url.to_string());
        self.duration_hint = duration_hint;
        if let Ok(mut info) = self.playback.lock() {
            info.position = 0.0;
            info.duration = duration_hint;
        }
    }

    async fn play(&mut self) -> Result<()> {
        let source = self
            .source
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PlayerError::Playback("no source loaded".to_string()))?;

        // A failed download is tried again on the next play.
        if self.fetch.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.fetch.take() {
                self.downloaded = matches!(handle.await, Ok(true));
            }
        }
        if self.fetch.is_none() && !self.downloaded {
            self.start_fetch(source);
        }
        // Starts now if loaded, otherwise as soon as the load lands.
        self.send(AudioCmd::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.send(AudioCmd::Pause);
    }

    fn seek(&mut self, fraction: f64) {
        if let Some(duration) = self.duration() {
            let target = fraction.clamp(0.0, 1.0) * duration;
            self.send(AudioCmd::Seek(Duration::from_secs_f64(target)));
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCmd::SetVolume(volume.clamp(0.0, 1.0)));
    }

    fn current_time(&self) -> f64 {
        self.playback.lock().map(|info| info.position).unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.playback
            .lock()
            .ok()
            .and_then(|info| info.duration)
            .or(self.duration_hint)
    }
}

fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    ready: Sender<Result<()>>,
    playback: PlaybackHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(PlayerError::NoAudioDevice(e.to_string())));
                return;
            }
        };
        // rodio logs to stderr when the stream is dropped, which garbles the terminal.
        stream.log_on_drop(false);
        let _ = ready.send(Ok(()));

        // Sender pinned to the loaded source.
        let mut events: Option<AudioEventSender> = None;
        let mut sink: Option<Sink> = None;
        let mut bytes: Option<Arc<Vec<u8>>> = None;
        // Play was requested, possibly before the source finished loading.
        let mut wanted = false;
        let mut playing = false;
        let mut volume = 1.0f32;

        let decode = |data: &Arc<Vec<u8>>, volume: f32| -> Result<(Sink, Option<f64>)> {
            let source = Decoder::new(Cursor::new(data.as_ref().clone()))
                .map_err(|e| PlayerError::Playback(format!("cannot decode audio: {}", e)))?;
            let duration = source.total_duration().map(|d| d.as_secs_f64());
            let new_sink = Sink::connect_new(stream.mixer());
            new_sink.append(source);
            new_sink.pause();
            new_sink.set_volume(volume);
            Ok((new_sink, duration))
        };

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(AudioCmd::Clear) => {
                    if let Some(old) = sink.take() {
                        old.stop();
                    }
                    bytes = None;
                    events = None;
                    wanted = false;
                    playing = false;
                }
                Ok(AudioCmd::Load {
                    bytes: data,
                    duration_hint,
                    events: sender,
                }) => {
                    if sender.as_ref().is_some_and(|s| !s.is_current()) {
                        debug!("Dropping download of a replaced source");
                        continue;
                    }
                    let data = Arc::new(data);
                    match decode(&data, volume) {
                        Ok((new_sink, duration)) => {
                            let duration = duration.or(duration_hint);
                            if let Ok(mut info) = playback.lock() {
                                info.position = 0.0;
                                info.duration = duration;
                            }
                            if let (Some(sender), Some(duration)) = (sender.as_ref(), duration) {
                                sender.emit(AudioEvent::MetadataLoaded { duration });
                            }
                            if wanted {
                                new_sink.play();
                                playing = true;
                            }
                            sink = Some(new_sink);
                            bytes = Some(data);
                        }
                        Err(e) => {
                            if let Some(sender) = sender.as_ref() {
                                sender.emit(AudioEvent::LoadFailed(e.to_string()));
                            }
                        }
                    }
                    events = sender;
                }
                Ok(AudioCmd::Play) => {
                    wanted = true;
                    // An ended sink is empty; rebuild it from the cached bytes.
                    if sink.as_ref().is_some_and(|s| s.empty()) {
                        if let Some(data) = bytes.as_ref() {
                            match decode(data, volume) {
                                Ok((new_sink, _)) => sink = Some(new_sink),
                                Err(e) => {
                                    if let Some(events) = events.as_ref() {
                                        events.emit(AudioEvent::Error(e.to_string()));
                                    }
                                }
                            }
                        }
                    }
                    if let Some(s) = sink.as_ref() {
                        s.play();
                        playing = true;
                    }
                }
                Ok(AudioCmd::Pause) => {
                    if let Some(s) = sink.as_ref() {
                        s.pause();
                    }
                    wanted = false;
                    playing = false;
                }
                Ok(AudioCmd::Seek(position)) => {
                    if let Some(s) = sink.as_ref() {
                        if let Err(e) = s.try_seek(position) {
                            warn!("Seek failed: {}", e);
                        }
                    }
                }
                Ok(AudioCmd::SetVolume(v)) => {
                    volume = v;
                    if let Some(s) = sink.as_ref() {
                        s.set_volume(v);
                    }
                }
                Ok(AudioCmd::Quit) | Err(RecvTimeoutError::Disconnected) => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if !playing {
                continue;
            }
            let Some(s) = sink.as_ref() else {
                continue;
            };

            let position = s.get_pos().as_secs_f64();
            let duration = match playback.lock() {
                Ok(mut info) => {
                    info.position = position;
                    info.duration
                }
                Err(_) => None,
            };
            if let Some(events) = events.as_ref() {
                if let Some(duration) = duration {
                    events.emit(AudioEvent::TimeUpdate { position, duration });
                }
            }
            if s.empty() {
                playing = false;
                wanted = false;
                if let Some(events) = events.as_ref() {
                    events.emit(AudioEvent::Ended);
                }
            }
        }
    })
}
