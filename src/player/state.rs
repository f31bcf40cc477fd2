//! Player state: views, track lists, transport flags and playback outcomes.

use std::fmt;

use crate::config::DEFAULT_VOLUME;
use crate::models::Track;

/// Which track list is presented, and therefore which one next/previous walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum View {
    /// The library.
    #[default]
    Home,
    /// Search results.
    Search,
    /// The backend's liked songs.
    Liked,
}

impl View {
    pub fn label(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Search => "search",
            View::Liked => "liked",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The playback state of the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// The three named track lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackLists {
    pub library: Vec<Track>,
    pub search_results: Vec<Track>,
    pub liked: Vec<Track>,
}

impl TrackLists {
    /// The list shown in `view`.
    pub fn get(&self, view: View) -> &[Track] {
        match view {
            View::Home => &self.library,
            View::Search => &self.search_results,
            View::Liked => &self.liked,
        }
    }

    /// Replace the list shown in `view` wholesale.
    pub fn replace(&mut self, view: View, tracks: Vec<Track>) {
        match view {
            View::Home => self.library = tracks,
            View::Search => self.search_results = tracks,
            View::Liked => self.liked = tracks,
        }
    }

    /// Whether the liked list holds a track with `key`.
    pub fn is_liked_key(&self, key: &str) -> bool {
        self.liked.iter().any(|t| t.key() == key)
    }
}

/// Transport state owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Index of the current track within `current_view`'s list.
    pub current_index: usize,
    /// Copy of the loaded track; survives replacement of its list.
    pub current_track: Option<Track>,
    /// The list `current_track` was loaded from.
    pub current_view: View,
    pub playback: PlaybackState,
    pub shuffle: bool,
    pub repeat: bool,
    /// 0-100.
    pub volume: u8,
    /// Volume to restore on unmute.
    pub muted_from: Option<u8>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::with_volume(DEFAULT_VOLUME)
    }
}

impl PlayerState {
    pub fn with_volume(volume: u8) -> Self {
        Self {
            current_index: 0,
            current_track: None,
            current_view: View::Home,
            playback: PlaybackState::Stopped,
            shuffle: false,
            repeat: false,
            volume: volume.min(100),
            muted_from: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }

    /// Snapshot for the renderer's transport bar.
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            playback: self.playback,
            shuffle: self.shuffle,
            repeat: self.repeat,
            volume: self.volume,
        }
    }
}

/// What the transport bar shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub playback: PlaybackState,
    pub shuffle: bool,
    pub repeat: bool,
    pub volume: u8,
}

/// Playback position for the progress bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    /// Seconds into the track.
    pub position: f64,
    /// Track length in seconds, 0 when unknown.
    pub duration: f64,
}

impl Progress {
    pub fn new(position: f64, duration: f64) -> Self {
        Self { position, duration }
    }

    /// Played share of the track as a percentage, 0-100.
    pub fn percent(&self) -> f64 {
        if self.duration > 0.0 && self.position.is_finite() {
            (self.position / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Why a track list area is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// The library is empty; the player shows its placeholder.
    NothingLoaded,
    /// Search came back without tracks.
    NoResults,
    /// The search request itself failed.
    SearchUnavailable,
    /// The liked list is empty.
    NoLikedSongs,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyState::NothingLoaded => "Nothing to play yet. Search for something.",
            EmptyState::NoResults => "No results found",
            EmptyState::SearchUnavailable => {
                "Search unavailable. Make sure the backend server is running."
            }
            EmptyState::NoLikedSongs => "No liked songs yet",
        }
    }
}

/// A playback attempt that gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFailure {
    pub message: String,
}

impl PlaybackFailure {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of asking the player to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The sink accepted the source.
    Started,
    /// The first attempt was rejected; a retry with `url` is scheduled.
    Retrying { url: String },
    /// Playback could not start.
    Failed(PlaybackFailure),
    /// Nothing to play (empty list or out-of-range index).
    Ignored,
}

impl PlayOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PlayOutcome::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_by_view() {
        let mut lists = TrackLists::default();
        lists.replace(View::Home, vec![Track::new("a", "A", "x")]);
        lists.replace(View::Liked, vec![Track::new("b", "B", "y")]);
        assert_eq!(lists.get(View::Home)[0].key(), "a");
        assert!(lists.get(View::Search).is_empty());
        assert!(lists.is_liked_key("b"));
        assert!(!lists.is_liked_key("a"));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress::new(30.0, 120.0).percent(), 25.0);
        assert_eq!(Progress::new(30.0, 0.0).percent(), 0.0);
        assert_eq!(Progress::new(500.0, 120.0).percent(), 100.0);
    }

    #[test]
    fn test_volume_is_clamped() {
        assert_eq!(PlayerState::with_volume(250).volume, 100);
        assert_eq!(PlayerState::default().volume, DEFAULT_VOLUME);
    }
}
