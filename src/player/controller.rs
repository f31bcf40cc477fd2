//! The player controller.
//!
//! Owns playback state, the current view and the three track lists, and
//! mediates between the audio sink, the backend and the renderer.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::events::{Event, LikedRequest, RequestTokens};
use super::state::{
    EmptyState, PlayOutcome, PlaybackFailure, PlaybackState, PlayerState, Progress, TrackLists,
    View,
};
use crate::api::BackendClient;
use crate::audio::{AudioEvent, AudioEventSender, AudioSink};
use crate::config::{PlayerConfig, DEFAULT_VOLUME};
use crate::error::{PlayerError, Result};
use crate::keys::{Command, VOLUME_STEP};
use crate::models::{LikedUpdate, Track};
use crate::render::Renderer;

const MISSING_TRACK_INFO: &str = "Unable to play this track. Missing track information.";
const AUDIO_FAILED: &str =
    "Failed to play audio. Make sure the backend server is running and try again.";

/// Playback/view state machine.
///
/// All mutation happens through `&mut self`. Work that has to wait (search
/// debounce, playback retry, backend requests) runs on spawned tasks that
/// report back as [`Event`]s; drain them with [`next_event`](Self::next_event)
/// and [`handle`](Self::handle), or [`settle`](Self::settle) to process until
/// nothing is outstanding.
///
/// # Example
///
/// ```rust,no_run
/// use playdeck::{HttpBackend, PlayerConfig, PlayerController, SilentSink, TerminalRenderer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PlayerConfig::default();
///     let backend = HttpBackend::new(config.clone())?;
///     let renderer = TerminalRenderer::new(std::io::stdout());
///     let mut player = PlayerController::new(backend, SilentSink::new(), renderer, config);
///
///     player.init().await;
///     player.submit_search("miles davis");
///     player.settle().await;
///     player.play(Some((0, player.view()))).await;
///     Ok(())
/// }
/// ```
pub struct PlayerController<B, A, R> {
    backend: Arc<B>,
    sink: A,
    renderer: R,
    config: PlayerConfig,

    state: PlayerState,
    lists: TrackLists,
    view: View,

    events_tx: UnboundedSender<Event>,
    inbox: UnboundedReceiver<Event>,
    in_flight: usize,
    source_generation: Arc<AtomicU64>,

    search_debounce: RequestTokens,
    search_requests: RequestTokens,
    liked_reads: RequestTokens,
    liked_writes: RequestTokens,
    pending_writes: usize,
    play_attempts: RequestTokens,
    /// The current track is already on its stream-URL retry.
    retrying: bool,

    rng: StdRng,
}

impl<B, A, R> PlayerController<B, A, R>
where
    B: BackendClient + 'static,
    A: AudioSink,
    R: Renderer,
{
    /// Create a controller with an empty library.
    pub fn new(backend: B, mut sink: A, renderer: R, config: PlayerConfig) -> Self {
        let (events_tx, inbox) = mpsc::unbounded_channel();
        let source_generation = Arc::new(AtomicU64::new(0));
        sink.attach(AudioEventSender::new(
            events_tx.clone(),
            Arc::clone(&source_generation),
        ));

        let state = PlayerState::with_volume(config.initial_volume);
        sink.set_volume(f32::from(state.volume) / 100.0);

        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            backend: Arc::new(backend),
            sink,
            renderer,
            config,
            state,
            lists: TrackLists::default(),
            view: View::Home,
            events_tx,
            inbox,
            in_flight: 0,
            source_generation,
            search_debounce: RequestTokens::default(),
            search_requests: RequestTokens::default(),
            liked_reads: RequestTokens::default(),
            liked_writes: RequestTokens::default(),
            pending_writes: 0,
            play_attempts: RequestTokens::default(),
            retrying: false,
            rng,
        }
    }

    /// Use `library` as the home list.
    pub fn with_library(mut self, library: Vec<Track>) -> Self {
        self.lists.replace(View::Home, library);
        self
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn lists(&self) -> &TrackLists {
        &self.lists
    }

    /// The list next/previous walk: the one shown in the current view.
    pub fn current_list(&self) -> &[Track] {
        self.lists.get(self.view)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state.current_track.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut A {
        &mut self.sink
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Sender for feeding audio notifications from outside the sink.
    pub fn audio_events(&self) -> AudioEventSender {
        AudioEventSender::new(self.events_tx.clone(), Arc::clone(&self.source_generation))
    }

    /// Number of spawned timers and requests whose events are still pending.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether the liked list holds a track with `track`'s identity key.
    pub fn is_liked(&self, track: &Track) -> bool {
        self.lists.is_liked_key(track.key())
    }

    // ----- event queue -----

    /// Wait for the next queued event.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.inbox.recv().await
    }

    /// Apply one event.
    pub async fn handle(&mut self, event: Event) {
        if event.is_spawned_completion() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match event {
            Event::Audio { source, event } => {
                if source == self.source_generation.load(Ordering::Acquire) {
                    self.handle_audio(event).await;
                } else {
                    debug!("Dropping {:?} from a previous source", event);
                }
            }
            Event::SearchDue { generation, query } => {
                if self.search_debounce.is_current(generation) {
                    self.dispatch_search(query);
                } else {
                    debug!("Search for '{}' superseded during debounce", query);
                }
            }
            Event::SearchFinished {
                token,
                query,
                result,
            } => self.finish_search(token, &query, result),
            Event::LikedFinished { request, result } => self.finish_liked(request, result),
            Event::RetryPlay { attempt } => self.retry_play(attempt).await,
        }
    }

    /// Process events until no spawned timer or request is outstanding.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.inbox.recv().await {
                Some(event) => self.handle(event).await,
                None => break,
            }
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = task.await;
            let _ = tx.send(event);
        });
    }

    fn schedule(&mut self, delay: Duration, event: Event) {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            event
        });
    }

    // ----- lifecycle -----

    /// Fetch the liked list, then load (without playing) the first library
    /// track, or show the empty placeholder.
    pub async fn init(&mut self) {
        self.load_liked();
        self.settle().await;

        if !self.load_track(0, View::Home) {
            self.renderer.show_now_playing(None, false);
        }
        self.set_view(self.view);
        self.renderer.show_status(self.state.status());
    }

    // ----- transport -----

    /// Make `lists[view][index]` the current track and hand its URL to the sink.
    ///
    /// Returns false, changing nothing, if `index` is out of range.
    pub fn load_track(&mut self, index: usize, view: View) -> bool {
        let Some(track) = self.lists.get(view).get(index).cloned() else {
            debug!("Ignoring load of {} index {}", view, index);
            return false;
        };

        // A pending retry belongs to the previous track.
        self.play_attempts.issue();
        self.retrying = false;

        let url = self.config.playable_url(&track);
        debug!("Loading '{}' from {}", track.title, url);
        self.set_sink_source(&url, track.duration);
        if self.state.playback == PlaybackState::Playing {
            self.state.playback = PlaybackState::Paused;
            self.renderer.show_status(self.state.status());
        }

        let liked = self.is_liked(&track);
        self.renderer.show_now_playing(Some(&track), liked);
        self.renderer.highlight(Some(track.key()));
        self.renderer
            .show_progress(Progress::new(0.0, track.duration_secs()));

        self.state.current_index = index;
        self.state.current_view = view;
        self.state.current_track = Some(track);
        true
    }

    /// Play `target` (index in a view's list), or resume the current track.
    ///
    /// A target other than the current track is loaded first. With no target
    /// the loaded track resumes even if its list was replaced meanwhile. A
    /// rejected play schedules one retry through the stream endpoint.
    pub async fn play(&mut self, target: Option<(usize, View)>) -> PlayOutcome {
        let resume = target.is_none() && self.state.current_track.is_some();
        if !resume {
            let (index, view) =
                target.unwrap_or((self.state.current_index, self.state.current_view));
            let is_current = self.state.current_track.as_ref().is_some_and(|current| {
                index == self.state.current_index
                    && view == self.state.current_view
                    && self.lists.get(view).get(index) == Some(current)
            });
            if !is_current && !self.load_track(index, view) {
                return PlayOutcome::Ignored;
            }
        }

        self.start_playback().await
    }

    fn set_sink_source(&mut self, url: &str, duration_hint: Option<f64>) {
        self.source_generation.fetch_add(1, Ordering::AcqRel);
        self.sink.set_source(url, duration_hint);
    }

    async fn start_playback(&mut self) -> PlayOutcome {
        match self.sink.play().await {
            Ok(()) => self.playback_started(),
            Err(e) => self.playback_rejected(&e.to_string()),
        }
    }

    /// The sink refused the current source: retry once via the stream
    /// endpoint, or give up if that already happened.
    fn playback_rejected(&mut self, reason: &str) -> PlayOutcome {
        warn!("Playback rejected: {}", reason);
        if self.retrying {
            self.retrying = false;
            return self.playback_failed(format!(
                "Unable to play this track. It may be unavailable or restricted ({}).",
                reason
            ));
        }

        let stream = self
            .state
            .current_track
            .as_ref()
            .and_then(|t| t.backend_id())
            .map(|id| self.config.stream_url(id));

        match stream {
            Some(url) => {
                if self.state.playback == PlaybackState::Playing {
                    self.state.playback = PlaybackState::Paused;
                    self.renderer.show_status(self.state.status());
                }
                let attempt = self.play_attempts.issue();
                self.schedule(self.config.retry_delay, Event::RetryPlay { attempt });
                let outcome = PlayOutcome::Retrying { url };
                self.renderer.report_playback(&outcome);
                outcome
            }
            None => self.playback_failed(MISSING_TRACK_INFO.to_string()),
        }
    }

    async fn retry_play(&mut self, attempt: u64) {
        if !self.play_attempts.is_current(attempt) {
            debug!("Dropping stale playback retry");
            return;
        }
        let Some(track) = self.state.current_track.clone() else {
            return;
        };
        let Some(id) = track.backend_id() else {
            self.playback_failed(MISSING_TRACK_INFO.to_string());
            return;
        };

        let url = self.config.stream_url(id);
        info!("Retrying '{}' via {}", track.title, url);
        self.retrying = true;
        self.set_sink_source(&url, track.duration);
        self.start_playback().await;
    }

    fn playback_started(&mut self) -> PlayOutcome {
        self.state.playback = PlaybackState::Playing;
        self.renderer.show_status(self.state.status());
        PlayOutcome::Started
    }

    fn playback_failed(&mut self, message: String) -> PlayOutcome {
        self.state.playback = if self.state.current_track.is_some() {
            PlaybackState::Paused
        } else {
            PlaybackState::Stopped
        };
        let outcome = PlayOutcome::Failed(PlaybackFailure::new(message));
        self.renderer.report_playback(&outcome);
        self.renderer.show_status(self.state.status());
        outcome
    }

    pub fn pause(&mut self) {
        // Also cancels a scheduled retry.
        self.play_attempts.issue();
        self.sink.pause();
        self.state.playback = PlaybackState::Paused;
        self.renderer.show_status(self.state.status());
    }

    /// Pause when playing, otherwise play. Returns the play outcome, if any.
    pub async fn toggle(&mut self) -> Option<PlayOutcome> {
        if self.state.is_playing() {
            self.pause();
            None
        } else {
            Some(self.play(None).await)
        }
    }

    /// Advance in the current view's list: random with shuffle, else +1 wrapping.
    pub async fn next(&mut self) -> PlayOutcome {
        let len = self.current_list().len();
        if len == 0 {
            return PlayOutcome::Ignored;
        }
        let current = self.state.current_index;
        let index = if self.state.shuffle {
            self.shuffle_index(current, len)
        } else if current + 1 >= len {
            0
        } else {
            current + 1
        };
        self.play(Some((index, self.view))).await
    }

    /// Step back in the current view's list, wrapping to the end.
    pub async fn previous(&mut self) -> PlayOutcome {
        let len = self.current_list().len();
        if len == 0 {
            return PlayOutcome::Ignored;
        }
        let current = self.state.current_index;
        let index = if current == 0 {
            len - 1
        } else {
            (current - 1).min(len - 1)
        };
        self.play(Some((index, self.view))).await
    }

    /// Uniform pick over `0..len`, excluding `current` when there is a choice.
    fn shuffle_index(&mut self, current: usize, len: usize) -> usize {
        if len == 1 {
            return 0;
        }
        if current >= len {
            return self.rng.gen_range(0..len);
        }
        let pick = self.rng.gen_range(0..len - 1);
        if pick >= current {
            pick + 1
        } else {
            pick
        }
    }

    /// The sink finished the current track. Repeat replays the loaded track
    /// itself, whatever now sits at its old index.
    pub async fn on_track_end(&mut self) -> PlayOutcome {
        if self.state.repeat {
            self.play(None).await
        } else {
            self.next().await
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.shuffle = !self.state.shuffle;
        self.renderer.show_status(self.state.status());
    }

    pub fn toggle_repeat(&mut self) {
        self.state.repeat = !self.state.repeat;
        self.renderer.show_status(self.state.status());
    }

    /// Seek to `percent` (0-100) of the track.
    pub fn seek(&mut self, percent: f64) {
        let Some(duration) = self.known_duration() else {
            return;
        };
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        self.sink.seek(fraction);
        self.renderer
            .show_progress(Progress::new(fraction * duration, duration));
    }

    /// Seek relative to the current position, in percent of the track.
    pub fn seek_by(&mut self, delta_percent: f64) {
        let Some(duration) = self.known_duration() else {
            return;
        };
        let current = Progress::new(self.sink.current_time(), duration).percent();
        self.seek(current + delta_percent);
    }

    fn known_duration(&self) -> Option<f64> {
        self.sink
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| {
                self.state
                    .current_track
                    .as_ref()
                    .map(Track::duration_secs)
                    .filter(|d| *d > 0.0)
            })
    }

    /// Set volume, 0-100.
    pub fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.state.volume = volume;
        if volume > 0 {
            self.state.muted_from = None;
        }
        self.sink.set_volume(f32::from(volume) / 100.0);
        self.renderer.show_status(self.state.status());
    }

    /// Mute, or restore the volume from before muting (70 if unknown).
    pub fn toggle_mute(&mut self) {
        if self.state.volume > 0 {
            let previous = self.state.volume;
            self.set_volume(0);
            self.state.muted_from = Some(previous);
        } else {
            let restore = self
                .state
                .muted_from
                .take()
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_VOLUME);
            self.set_volume(restore);
        }
    }

    // ----- audio notifications -----

    pub async fn handle_audio(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::TimeUpdate { position, duration } => {
                self.on_time_update(position, duration)
            }
            AudioEvent::Ended => {
                self.on_track_end().await;
            }
            AudioEvent::Error(message) => self.on_audio_error(&message),
            AudioEvent::LoadFailed(reason) => {
                self.playback_rejected(&reason);
            }
            AudioEvent::MetadataLoaded { duration } => self.on_metadata_loaded(duration),
        }
    }

    pub fn on_time_update(&mut self, position: f64, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.renderer
                .show_progress(Progress::new(position, duration));
        }
    }

    pub fn on_metadata_loaded(&mut self, duration: f64) {
        let total = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            self.state
                .current_track
                .as_ref()
                .map(Track::duration_secs)
                .unwrap_or(0.0)
        };
        self.renderer
            .show_progress(Progress::new(self.sink.current_time(), total));
    }

    pub fn on_audio_error(&mut self, message: &str) {
        warn!("Audio sink error: {}", message);
        self.play_attempts.issue();
        self.playback_failed(AUDIO_FAILED.to_string());
    }

    // ----- views and search -----

    /// Show `view`. Playback is unaffected; leaving search abandons any
    /// pending or in-flight search.
    pub fn set_view(&mut self, view: View) {
        if view != View::Search {
            self.search_debounce.issue();
            self.search_requests.issue();
        }
        self.view = view;
        self.renderer.show_view(view);

        let tracks = self.lists.get(view);
        if tracks.is_empty() {
            let state = match view {
                View::Home => EmptyState::NothingLoaded,
                View::Search => EmptyState::NoResults,
                View::Liked => EmptyState::NoLikedSongs,
            };
            self.renderer.render_empty(view, state);
        } else {
            self.renderer.render_tracks(view, tracks);
        }
    }

    /// Typed search input. Empty goes home at once; short queries only cancel
    /// the pending search; anything else is searched after the debounce window.
    pub fn on_search_input(&mut self, query: &str) {
        let query = query.trim();
        let generation = self.search_debounce.issue();

        if query.is_empty() {
            self.set_view(View::Home);
            return;
        }
        if query.chars().count() < self.config.min_query_len {
            return;
        }

        self.schedule(
            self.config.search_debounce,
            Event::SearchDue {
                generation,
                query: query.to_string(),
            },
        );
    }

    /// Search immediately (Enter in the search box).
    pub fn submit_search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.search_debounce.issue();
        self.dispatch_search(query.to_string());
    }

    fn dispatch_search(&mut self, query: String) {
        let token = self.search_requests.issue();
        if self.view != View::Search {
            self.view = View::Search;
            self.renderer.show_view(View::Search);
        }

        info!("Searching for '{}'", query);
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = backend.search(&query).await;
            Event::SearchFinished {
                token,
                query,
                result,
            }
        });
    }

    fn finish_search(&mut self, token: u64, query: &str, result: Result<Vec<Track>>) {
        if !self.search_requests.is_current(token) {
            debug!("Discarding stale results for '{}'", query);
            return;
        }

        match result {
            Ok(tracks) => {
                debug!("{} results for '{}'", tracks.len(), query);
                self.lists.replace(View::Search, tracks);
                self.view = View::Search;
                let results = self.lists.get(View::Search);
                if results.is_empty() {
                    self.renderer
                        .render_empty(View::Search, EmptyState::NoResults);
                } else {
                    self.renderer.render_tracks(View::Search, results);
                }
            }
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                let state = match e {
                    PlayerError::Api { .. } | PlayerError::MalformedResponse(_) => {
                        EmptyState::NoResults
                    }
                    _ => EmptyState::SearchUnavailable,
                };
                self.renderer.render_empty(View::Search, state);
            }
        }
    }

    // ----- liked songs -----

    /// Refresh the liked list from the backend. Skipped while a like or
    /// unlike is in flight; its answer replaces the list anyway.
    pub fn load_liked(&mut self) {
        if self.pending_writes > 0 {
            debug!("Liked list refresh skipped, mutation in flight");
            return;
        }
        let request = LikedRequest::Read {
            token: self.liked_reads.issue(),
            writes_seen: self.liked_writes.latest(),
        };
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = backend.liked().await;
            Event::LikedFinished { request, result }
        });
    }

    /// Like `track` if it is not liked, otherwise unlike it. The liked list is
    /// replaced by the backend's answer, not toggled locally.
    pub fn toggle_like(&mut self, track: &Track) {
        let request = LikedRequest::Write {
            token: self.liked_writes.issue(),
        };
        self.pending_writes += 1;
        let backend = Arc::clone(&self.backend);
        let key = track.key().to_string();

        if self.lists.is_liked_key(&key) {
            debug!("Unliking '{}'", key);
            self.spawn(async move {
                let result = backend.remove_liked(&key).await.and_then(confirmed);
                Event::LikedFinished { request, result }
            });
        } else {
            debug!("Liking '{}'", key);
            let track = track.clone();
            self.spawn(async move {
                let result = backend.add_liked(&track).await.and_then(confirmed);
                Event::LikedFinished { request, result }
            });
        }
    }

    /// Toggle like on the now-playing track.
    pub fn toggle_like_current(&mut self) {
        if let Some(track) = self.state.current_track.clone() {
            self.toggle_like(&track);
        }
    }

    fn finish_liked(&mut self, request: LikedRequest, result: Result<Vec<Track>>) {
        let current = match request {
            LikedRequest::Write { token } => {
                self.pending_writes = self.pending_writes.saturating_sub(1);
                self.liked_writes.is_current(token)
            }
            // A read sent before the latest mutation may predate it.
            LikedRequest::Read { token, writes_seen } => {
                self.liked_reads.is_current(token)
                    && self.pending_writes == 0
                    && self.liked_writes.latest() == writes_seen
            }
        };
        if !current {
            debug!("Discarding stale liked list ({:?})", request);
            return;
        }

        match result {
            Ok(liked) => {
                self.lists.replace(View::Liked, liked);
                self.renderer.show_likes(&self.lists.liked);
                if self.view == View::Liked {
                    if self.lists.liked.is_empty() {
                        self.renderer
                            .render_empty(View::Liked, EmptyState::NoLikedSongs);
                    } else {
                        self.renderer.render_tracks(View::Liked, &self.lists.liked);
                    }
                }
            }
            Err(e) => warn!("Liked list unchanged: {}", e),
        }
    }

    // ----- commands -----

    /// Apply a user command.
    pub async fn dispatch(&mut self, command: Command) {
        match command {
            Command::TogglePlay => {
                self.toggle().await;
            }
            Command::Next => {
                self.next().await;
            }
            Command::Previous => {
                self.previous().await;
            }
            Command::ToggleShuffle => self.toggle_shuffle(),
            Command::ToggleRepeat => self.toggle_repeat(),
            Command::ToggleLikeCurrent => self.toggle_like_current(),
            Command::ShowView(view) => {
                if view == View::Liked {
                    self.load_liked();
                }
                self.set_view(view);
            }
            Command::VolumeUp => {
                self.set_volume(self.state.volume.saturating_add(VOLUME_STEP).min(100))
            }
            Command::VolumeDown => self.set_volume(self.state.volume.saturating_sub(VOLUME_STEP)),
            Command::ToggleMute => self.toggle_mute(),
            Command::SeekBy(delta) => self.seek_by(delta),
        }
    }
}

/// Accept a liked-list mutation only if the backend confirmed it.
fn confirmed(update: LikedUpdate) -> Result<Vec<Track>> {
    if update.success {
        Ok(update.liked)
    } else {
        Err(PlayerError::MalformedResponse(
            "backend did not confirm the liked-list change".to_string(),
        ))
    }
}
