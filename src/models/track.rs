//! Track model.
//!
//! Mirrors the JSON object the backend returns for search results and the
//! liked list, so tracks can be sent back verbatim when liking them.

use serde::{Deserialize, Serialize};

/// A single playable audio item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Backend identifier (a video id for the stock backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Track title.
    #[serde(default)]
    pub title: String,

    /// Artist or uploader name.
    #[serde(default)]
    pub artist: String,

    /// Artwork URL.
    #[serde(default)]
    pub image: String,

    /// Audio URL; either absolute or a backend-relative `/api/stream/...` path.
    #[serde(default)]
    pub audio: String,

    /// Duration in seconds, if known.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Track {
    /// Create a track with an id, title and artist.
    pub fn new<S1, S2, S3>(id: S1, title: S2, artist: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            id: Some(id.into()),
            title: title.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    /// Identity key used for like state and highlighting.
    ///
    /// The id when present, otherwise the title. Two id-less tracks with the
    /// same title share a key.
    pub fn key(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.title,
        }
    }

    /// The backend id, ignoring empty strings.
    pub fn backend_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Duration in seconds, `0.0` when unknown.
    pub fn duration_secs(&self) -> f64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    }

    /// "Title - Artist" for one-line display.
    pub fn display(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_id() {
        let track = Track::new("dQw4w9WgXcQ", "Never Gonna", "Rick");
        assert_eq!(track.key(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_key_falls_back_to_title() {
        let mut track = Track::new("", "Untitled", "Nobody");
        assert_eq!(track.key(), "Untitled");
        track.id = None;
        assert_eq!(track.key(), "Untitled");
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "id": "abc",
            "title": "Song",
            "artist": "Band",
            "image": "https://img.youtube.com/vi/abc/hqdefault.jpg",
            "audio": "/api/stream/abc",
            "duration": 212
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.backend_id(), Some("abc"));
        assert_eq!(track.audio, "/api/stream/abc");
        assert_eq!(track.duration_secs(), 212.0);
    }

    #[test]
    fn test_deserialize_null_duration_and_missing_id() {
        let json = r#"{"title": "Live", "artist": "X", "duration": null}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.id, None);
        assert_eq!(track.duration_secs(), 0.0);
        assert_eq!(track.key(), "Live");
    }
}
