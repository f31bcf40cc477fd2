//! Player configuration.
//!
//! Everything has a default matching the stock backend on `localhost:5000`;
//! the CLI overrides fields from flags and environment variables.

use std::time::Duration;

use reqwest::Url;

use crate::error::{PlayerError, Result};
use crate::models::Track;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Quiet period before a typed search query is sent.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Wait before the single playback retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Typed queries shorter than this are not searched.
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Volume used at startup and when unmuting without a remembered level.
pub const DEFAULT_VOLUME: u8 = 70;

/// Substrings of audio URLs that are demo placeholders rather than real sources.
const DEFAULT_PLACEHOLDER_PATTERNS: &[&str] = &["soundhelix"];

/// Configuration for [`crate::PlayerController`] and [`crate::HttpBackend`].
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Backend root; API paths are appended to it.
    pub base_url: Url,
    /// Debounce window for typed search input.
    pub search_debounce: Duration,
    /// Delay before retrying a rejected play with the stream URL.
    pub retry_delay: Duration,
    /// Minimum trimmed length of a typed query before it is searched.
    pub min_query_len: usize,
    /// Initial volume, 0-100.
    pub initial_volume: u8,
    /// Audio URLs containing any of these are replaced by the stream endpoint.
    pub placeholder_patterns: Vec<String>,
    /// Fixed shuffle seed; `None` seeds from OS entropy.
    pub shuffle_seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            retry_delay: DEFAULT_RETRY_DELAY,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            initial_volume: DEFAULT_VOLUME,
            placeholder_patterns: DEFAULT_PLACEHOLDER_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            shuffle_seed: None,
        }
    }
}

impl PlayerConfig {
    /// Default configuration pointed at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if `base_url` does not parse or cannot hold a path.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| PlayerError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(PlayerError::InvalidUrl(format!(
                "{}: not a base URL",
                base_url
            )));
        }
        Ok(Self {
            base_url: url,
            ..Default::default()
        })
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Streaming endpoint for a backend track id.
    pub fn stream_url(&self, id: &str) -> String {
        self.endpoint(&["api", "stream", id]).to_string()
    }

    /// Resolve the URL the audio sink should load for `track`.
    ///
    /// Backend-relative `/api/stream` paths are made absolute. Tracks with an
    /// id but no usable audio URL (empty or a placeholder) use the stream
    /// endpoint. Anything else is used as-is.
    pub fn playable_url(&self, track: &Track) -> String {
        let audio = track.audio.as_str();
        if audio.starts_with("/api/stream") {
            return format!("{}{}", self.base_url.as_str().trim_end_matches('/'), audio);
        }
        if let Some(id) = track.backend_id() {
            if audio.is_empty() || self.is_placeholder(audio) {
                return self.stream_url(id);
            }
        }
        audio.to_string()
    }

    fn is_placeholder(&self, audio: &str) -> bool {
        self.placeholder_patterns
            .iter()
            .any(|pattern| audio.contains(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: Option<&str>, audio: &str) -> Track {
        Track {
            id: id.map(str::to_string),
            title: "T".to_string(),
            audio: audio.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let config = PlayerConfig::default();
        assert_eq!(
            config.endpoint(&["api", "search"]).as_str(),
            "http://localhost:5000/api/search"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_prefix_and_encodes() {
        let config = PlayerConfig::with_base_url("http://host:8080/player/").unwrap();
        assert_eq!(
            config.endpoint(&["api", "liked", "a b/c"]).as_str(),
            "http://host:8080/player/api/liked/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(PlayerConfig::with_base_url("not a url").is_err());
        assert!(PlayerConfig::with_base_url("mailto:me@example.com").is_err());
    }

    #[test]
    fn test_playable_url_relative_stream_path() {
        let config = PlayerConfig::default();
        assert_eq!(
            config.playable_url(&track(Some("x"), "/api/stream/x")),
            "http://localhost:5000/api/stream/x"
        );
    }

    #[test]
    fn test_playable_url_placeholder_uses_stream() {
        let config = PlayerConfig::default();
        let t = track(
            Some("x"),
            "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3",
        );
        assert_eq!(config.playable_url(&t), "http://localhost:5000/api/stream/x");
        assert_eq!(
            config.playable_url(&track(Some("x"), "")),
            "http://localhost:5000/api/stream/x"
        );
    }

    #[test]
    fn test_playable_url_raw() {
        let config = PlayerConfig::default();
        assert_eq!(
            config.playable_url(&track(Some("x"), "https://cdn.example/a.mp3")),
            "https://cdn.example/a.mp3"
        );
        assert_eq!(config.playable_url(&track(None, "")), "");
    }
}
